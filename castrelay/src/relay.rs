//! Continuous playback loop for one channel.
//!
//! The relay is an explicit state machine: `Starting → Playing →
//! Advancing → Playing → … → Stopping`. Each suspension point (track
//! open, chunk read) is raced against the channel's cancellation token,
//! so an external stop takes effect within one fetch latency instead of
//! interrupting a byte copy. Per-track failures never leave the loop;
//! they feed the recovery policy, which decides between skipping ahead
//! and terminating the channel.

use crate::config::RelayConfig;
use crate::icy::{self, IcyInterleaver};
use crate::recovery::{FailureRecoveryPolicy, RecoveryVerdict};
use crate::sink::{SinkMailbox, SinkSet};
use bytes::Bytes;
use castplaylist::{PlaybackScheduler, TrackDescriptor};
use castsource::TrackSource;
use futures::StreamExt;
use rand::rngs::StdRng;
use rand::Rng;
use std::sync::{Arc, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Why a relay loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayEnd {
    /// A cooperative stop request was observed.
    Stopped,
    /// The consecutive-failure threshold was reached.
    Terminated,
}

enum RelayState {
    Starting,
    Playing(TrackDescriptor),
    Advancing(RecoveryVerdict),
    Stopping(RelayEnd),
}

/// Shared read-only view of what a channel is currently playing.
pub type NowPlaying = Arc<RwLock<Option<TrackDescriptor>>>;

/// Drives one channel: pulls bytes from the current track and fans them
/// out to every attached sink, interleaving ICY metadata when enabled.
pub struct StreamRelay<R: Rng = StdRng> {
    label: String,
    scheduler: PlaybackScheduler<R>,
    source: Arc<dyn TrackSource>,
    sinks: SinkSet,
    recovery: FailureRecoveryPolicy,
    interleaver: Option<IcyInterleaver>,
    now_playing: NowPlaying,
    cancel: CancellationToken,
}

impl<R: Rng> StreamRelay<R> {
    pub fn new(
        label: impl Into<String>,
        scheduler: PlaybackScheduler<R>,
        source: Arc<dyn TrackSource>,
        mailbox: SinkMailbox,
        config: RelayConfig,
    ) -> Self {
        let threshold = config
            .failure_threshold
            .unwrap_or_else(|| scheduler.playlist().len());

        Self {
            label: label.into(),
            sinks: SinkSet::new(mailbox, config.write_timeout()),
            recovery: FailureRecoveryPolicy::new(threshold),
            interleaver: config.metaint.map(IcyInterleaver::new),
            now_playing: NowPlaying::default(),
            cancel: CancellationToken::new(),
            scheduler,
            source,
        }
    }

    /// Token that stops the loop at its next suspension point.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Handle for observing the currently streaming track.
    pub fn now_playing(&self) -> NowPlaying {
        self.now_playing.clone()
    }

    /// Runs the playback loop to completion.
    pub async fn run(mut self) -> RelayEnd {
        info!(
            channel = %self.label,
            tracks = self.scheduler.playlist().len(),
            policy = ?self.scheduler.policy(),
            "Stream relay started"
        );

        let mut state = RelayState::Starting;
        loop {
            state = match state {
                RelayState::Starting => RelayState::Playing(self.scheduler.next()),
                RelayState::Playing(track) => self.play(track).await,
                RelayState::Advancing(RecoveryVerdict::Skip) => {
                    RelayState::Playing(self.scheduler.next())
                }
                RelayState::Advancing(RecoveryVerdict::Terminate) => {
                    RelayState::Stopping(RelayEnd::Terminated)
                }
                RelayState::Stopping(end) => {
                    self.shutdown(end);
                    return end;
                }
            };
        }
    }

    /// Streams one track; returns the follow-up state.
    async fn play(&mut self, track: TrackDescriptor) -> RelayState {
        debug!(channel = %self.label, uri = %track.uri, "Opening track");
        self.set_now_playing(Some(track.clone()));

        let mut stream = tokio::select! {
            _ = self.cancel.cancelled() => return RelayState::Stopping(RelayEnd::Stopped),
            opened = self.source.open(&track.uri) => match opened {
                Ok(stream) => stream,
                Err(e) => {
                    warn!(channel = %self.label, uri = %track.uri, "Track open failed: {}", e);
                    return RelayState::Advancing(self.recovery.on_failure());
                }
            },
        };

        // Formatted once per track; the interleaver decides when the
        // block actually goes out.
        let metadata = self
            .interleaver
            .as_ref()
            .map(|_| icy::frame_metadata(&track));

        loop {
            let chunk = tokio::select! {
                _ = self.cancel.cancelled() => return RelayState::Stopping(RelayEnd::Stopped),
                chunk = stream.next() => chunk,
            };

            match chunk {
                None => {
                    debug!(channel = %self.label, uri = %track.uri, "Track complete");
                    self.recovery.on_success();
                    return RelayState::Advancing(RecoveryVerdict::Skip);
                }
                Some(Err(e)) => {
                    warn!(channel = %self.label, uri = %track.uri, "Track stream failed: {}", e);
                    return RelayState::Advancing(self.recovery.on_failure());
                }
                Some(Ok(bytes)) => self.emit(bytes, metadata.as_ref()).await,
            }
        }
    }

    /// Fans one chunk out to all sinks, interleaving metadata if enabled.
    async fn emit(&mut self, chunk: Bytes, metadata: Option<&Bytes>) {
        self.sinks.apply_pending();

        match (self.interleaver.as_mut(), metadata) {
            (Some(interleaver), Some(block)) => {
                for part in interleaver.interleave(chunk, block) {
                    self.sinks.broadcast(&part).await;
                }
            }
            _ => self.sinks.broadcast(&chunk).await,
        }
    }

    fn shutdown(&mut self, end: RelayEnd) {
        self.set_now_playing(None);
        // Drain queued operations so attaches that raced the stop are
        // dropped along with everything else.
        self.sinks.apply_pending();
        self.sinks.clear();

        match end {
            RelayEnd::Stopped => info!(channel = %self.label, "Stream relay stopped"),
            RelayEnd::Terminated => warn!(
                channel = %self.label,
                failures = self.recovery.consecutive_failures(),
                "Stream relay terminated after consecutive track failures"
            ),
        }
    }

    fn set_now_playing(&self, track: Option<TrackDescriptor>) {
        if let Ok(mut guard) = self.now_playing.write() {
            *guard = track;
        }
    }
}
