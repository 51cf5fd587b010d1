//! # castchannel
//!
//! Channel lifecycle for CastRelay.
//!
//! A [`ChannelRegistry`] owns every live channel: it creates a channel
//! from a playlist and an ordering policy (spawning the relay loop
//! immediately, independent of any listener), attaches and detaches
//! sinks, lists active channels, and stops them. Channels also end on
//! their own when every scheduled track keeps failing; the registry
//! removes them and attached sinks simply observe stream end.
//!
//! ```no_run
//! use std::sync::Arc;
//! use castchannel::ChannelRegistry;
//! use castplaylist::{OrderingPolicy, TrackDescriptor};
//! use castrelay::ChannelSink;
//! use castsource::UriTrackSource;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = ChannelRegistry::new(Arc::new(UriTrackSource::new()));
//! let id = registry.create(
//!     vec![
//!         TrackDescriptor::new("https://example.com/one.mp3"),
//!         TrackDescriptor::new("https://example.com/two.mp3"),
//!     ],
//!     OrderingPolicy::ShuffleNoImmediateRepeat,
//! )?;
//!
//! let (sink, mut rx) = ChannelSink::new(32);
//! registry.attach(id, Box::new(sink))?;
//! while let Some(chunk) = rx.recv().await {
//!     // forward chunk to the listener
//!     let _ = chunk;
//! }
//! # Ok(())
//! # }
//! ```

mod channel;
mod error;
mod registry;

pub use channel::{ChannelId, ChannelInfo, ChannelStatus};
pub use error::{Error, Result};
pub use registry::ChannelRegistry;

// Re-exported so callers rarely need castrelay directly.
pub use castrelay::{RelayConfig, Sink, SinkId};
