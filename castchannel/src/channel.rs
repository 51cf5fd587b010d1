//! Channel identity and registry-side bookkeeping.

use castplaylist::{OrderingPolicy, Playlist, TrackDescriptor};
use castrelay::{NowPlaying, RelayConfig, SinkMailbox};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Opaque channel identifier.
///
/// Allocated once at creation (uuid v4) and never reused; a stopped
/// channel's id stays dead forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(Uuid);

impl ChannelId {
    pub(crate) fn allocate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Channel lifecycle state; `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelStatus {
    Active,
    Stopped,
}

/// Registry entry for one live channel.
///
/// The relay task owns playback state (scheduler history, failure count,
/// sink set); this entry only carries what lifecycle operations need.
pub(crate) struct Channel {
    pub(crate) id: ChannelId,
    pub(crate) playlist: Arc<Playlist>,
    pub(crate) policy: OrderingPolicy,
    pub(crate) config: RelayConfig,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) status: ChannelStatus,
    pub(crate) mailbox: SinkMailbox,
    pub(crate) now_playing: NowPlaying,
    pub(crate) cancel: CancellationToken,
}

impl Channel {
    pub(crate) fn now_playing_snapshot(&self) -> Option<TrackDescriptor> {
        self.now_playing.read().ok().and_then(|guard| guard.clone())
    }

    pub(crate) fn info(&self) -> ChannelInfo {
        ChannelInfo {
            id: self.id,
            policy: self.policy,
            metaint: self.config.metaint,
            created_at: self.created_at,
            tracks: self.playlist.len(),
            sinks: self.mailbox.attached(),
            now_playing: self.now_playing_snapshot(),
        }
    }
}

/// Public snapshot of one channel's state.
#[derive(Debug, Clone)]
pub struct ChannelInfo {
    pub id: ChannelId,
    pub policy: OrderingPolicy,
    /// Declared in-band metadata interval; what an HTTP frontend would
    /// announce as `icy-metaint`. `None` when injection is disabled.
    pub metaint: Option<usize>,
    pub created_at: DateTime<Utc>,
    pub tracks: usize,
    pub sinks: usize,
    pub now_playing: Option<TrackDescriptor>,
}
