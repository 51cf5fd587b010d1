//! # castrelay
//!
//! The CastRelay playback engine.
//!
//! One [`StreamRelay`] drives one channel: it asks the scheduler for
//! tracks, pulls their bytes through a `castsource::TrackSource`, and
//! fans every chunk out to the attached [`Sink`]s, optionally splicing
//! ICY metadata blocks into the flow at a fixed cadence. Broken tracks
//! are skipped under the [`FailureRecoveryPolicy`] until the
//! consecutive-failure threshold ends the channel.
//!
//! Channel lifecycle (create/attach/stop/list) lives one level up in
//! `castchannel`; this crate only knows about a single running loop.

mod config;
pub mod icy;
mod recovery;
mod relay;
mod sink;
mod sinks;

pub use config::RelayConfig;
pub use icy::{IcyInterleaver, DEFAULT_METAINT};
pub use recovery::{FailureRecoveryPolicy, RecoveryVerdict};
pub use relay::{NowPlaying, RelayEnd, StreamRelay};
pub use sink::{Sink, SinkId, SinkMailbox, SinkSet, WriteError};
pub use sinks::{ChannelSink, CollectHandle, CollectSink, FileSink};
