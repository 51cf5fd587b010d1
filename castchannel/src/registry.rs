//! Multi-channel lifecycle registry.

use crate::channel::{Channel, ChannelId, ChannelInfo, ChannelStatus};
use crate::error::{Error, Result};
use castplaylist::{OrderingPolicy, Playlist, PlaybackScheduler, TrackDescriptor};
use castrelay::{RelayConfig, RelayEnd, Sink, SinkId, SinkMailbox, StreamRelay};
use castsource::TrackSource;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use tracing::{debug, error, info};

#[derive(Default)]
struct RegistryInner {
    channels: Mutex<HashMap<ChannelId, Channel>>,
}

impl Drop for RegistryInner {
    fn drop(&mut self) {
        // Relay tasks only hold a weak reference back here; cancel them
        // so a dropped registry does not leave channels streaming.
        if let Ok(map) = self.channels.lock() {
            for channel in map.values() {
                channel.mailbox.clear();
                channel.cancel.cancel();
            }
        }
    }
}

/// Owns every live channel and mediates all lifecycle operations.
///
/// The channel map is the only state shared between external callers;
/// every operation takes the one registry lock, so a stop racing an
/// attach on the same id resolves deterministically (attach after stop
/// fails with [`Error::ChannelNotFound`]).
#[derive(Clone)]
pub struct ChannelRegistry {
    inner: Arc<RegistryInner>,
    source: Arc<dyn TrackSource>,
    default_config: RelayConfig,
}

impl ChannelRegistry {
    pub fn new(source: Arc<dyn TrackSource>) -> Self {
        Self::with_default_config(source, RelayConfig::default())
    }

    /// Registry whose channels default to `config` unless
    /// [`ChannelRegistry::create_with_config`] overrides it.
    pub fn with_default_config(source: Arc<dyn TrackSource>, config: RelayConfig) -> Self {
        Self {
            inner: Arc::new(RegistryInner::default()),
            source,
            default_config: config,
        }
    }

    /// Creates a channel and starts its relay loop.
    ///
    /// Fails with `EmptyPlaylist` before anything is allocated; on
    /// success the relay runs detached from any particular sink.
    pub fn create(
        &self,
        tracks: Vec<TrackDescriptor>,
        policy: OrderingPolicy,
    ) -> Result<ChannelId> {
        self.create_with_config(tracks, policy, self.default_config.clone())
    }

    pub fn create_with_config(
        &self,
        tracks: Vec<TrackDescriptor>,
        policy: OrderingPolicy,
        config: RelayConfig,
    ) -> Result<ChannelId> {
        let playlist = Arc::new(Playlist::new(tracks)?);
        let id = ChannelId::allocate();

        let scheduler = PlaybackScheduler::new(playlist.clone(), policy);
        let mailbox = SinkMailbox::new();
        let relay = StreamRelay::new(
            id.to_string(),
            scheduler,
            self.source.clone(),
            mailbox.clone(),
            config.clone(),
        );

        let channel = Channel {
            id,
            playlist: playlist.clone(),
            policy,
            config,
            created_at: Utc::now(),
            status: ChannelStatus::Active,
            mailbox,
            now_playing: relay.now_playing(),
            cancel: relay.cancellation_token(),
        };

        // The entry must be visible before the relay can possibly finish,
        // or a fast-failing playlist would leave a zombie entry behind.
        {
            let mut map = self
                .inner
                .channels
                .lock()
                .expect("channel registry mutex poisoned");
            map.insert(id, channel);
        }

        let inner = Arc::downgrade(&self.inner);
        tokio::spawn(run_channel(relay, id, inner));

        info!(channel = %id, tracks = playlist.len(), ?policy, "Channel created");
        Ok(id)
    }

    /// Registers a sink for fan-out.
    ///
    /// The sink receives bytes starting with the channel's next emitted
    /// chunk; already-sent history is never replayed. The returned
    /// [`SinkId`] is the detach token.
    pub fn attach(&self, id: ChannelId, sink: Box<dyn Sink>) -> Result<SinkId> {
        let map = self
            .inner
            .channels
            .lock()
            .expect("channel registry mutex poisoned");
        let channel = map.get(&id).ok_or(Error::ChannelNotFound(id))?;
        if channel.status != ChannelStatus::Active {
            return Err(Error::ChannelNotFound(id));
        }
        Ok(channel.mailbox.attach(sink))
    }

    /// Removes a sink if present. Idempotent; never errors.
    pub fn detach(&self, id: ChannelId, sink: SinkId) {
        if let Ok(map) = self.inner.channels.lock() {
            if let Some(channel) = map.get(&id) {
                channel.mailbox.detach(sink);
            }
        }
    }

    /// Stops a channel: detaches every sink, signals the relay to end at
    /// its next suspension point, and removes the entry. A second call
    /// for the same id fails with [`Error::ChannelNotFound`].
    pub fn stop(&self, id: ChannelId) -> Result<()> {
        let mut channel = {
            let mut map = self
                .inner
                .channels
                .lock()
                .expect("channel registry mutex poisoned");
            map.remove(&id).ok_or(Error::ChannelNotFound(id))?
        };

        channel.status = ChannelStatus::Stopped;
        channel.mailbox.clear();
        channel.cancel.cancel();
        info!(channel = %id, "Channel stopped");
        Ok(())
    }

    /// Snapshot of currently active channel ids; no ordering guarantee.
    pub fn list(&self) -> Vec<ChannelId> {
        let map = self
            .inner
            .channels
            .lock()
            .expect("channel registry mutex poisoned");
        map.values()
            .filter(|channel| channel.status == ChannelStatus::Active)
            .map(|channel| channel.id)
            .collect()
    }

    /// Track currently streaming on `id`, if any.
    pub fn now_playing(&self, id: ChannelId) -> Result<Option<TrackDescriptor>> {
        let map = self
            .inner
            .channels
            .lock()
            .expect("channel registry mutex poisoned");
        let channel = map.get(&id).ok_or(Error::ChannelNotFound(id))?;
        Ok(channel.now_playing_snapshot())
    }

    /// Sink count as last observed by the channel's relay loop.
    pub fn active_sinks(&self, id: ChannelId) -> Result<usize> {
        let map = self
            .inner
            .channels
            .lock()
            .expect("channel registry mutex poisoned");
        let channel = map.get(&id).ok_or(Error::ChannelNotFound(id))?;
        Ok(channel.mailbox.attached())
    }

    /// Full state snapshot for one channel.
    pub fn info(&self, id: ChannelId) -> Result<ChannelInfo> {
        let map = self
            .inner
            .channels
            .lock()
            .expect("channel registry mutex poisoned");
        let channel = map.get(&id).ok_or(Error::ChannelNotFound(id))?;
        Ok(channel.info())
    }

    pub fn len(&self) -> usize {
        self.inner
            .channels
            .lock()
            .expect("channel registry mutex poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Wraps one relay run and removes the registry entry afterwards.
async fn run_channel(
    relay: StreamRelay,
    id: ChannelId,
    inner: Weak<RegistryInner>,
) {
    let end = relay.run().await;

    if let Some(inner) = inner.upgrade() {
        if let Ok(mut map) = inner.channels.lock() {
            if let Some(mut channel) = map.remove(&id) {
                channel.status = ChannelStatus::Stopped;
            }
        }
    }

    match end {
        RelayEnd::Stopped => debug!(channel = %id, "Channel task finished after stop"),
        // The one failure that ends a channel without an explicit stop.
        RelayEnd::Terminated => {
            error!(channel = %id, "Channel terminated: consecutive track failures exhausted the playlist")
        }
    }
}
