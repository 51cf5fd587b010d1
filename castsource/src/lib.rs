//! # castsource
//!
//! Track byte-stream openers for CastRelay.
//!
//! A [`TrackSource`] turns a track URI into a [`TrackStream`] of raw audio
//! bytes. The relay engine never inspects the bytes; it only moves them.
//! Three openers ship here: [`HttpTrackSource`] for remote tracks,
//! [`FileTrackSource`] for local files, and [`MemoryTrackSource`] as a
//! test and demo double. [`UriTrackSource`] dispatches between HTTP and
//! file access based on the URI scheme.

mod file;
mod http;
mod memory;

pub use file::FileTrackSource;
pub use http::HttpTrackSource;
pub use memory::MemoryTrackSource;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::Stream;
use std::fmt;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use url::Url;

/// Errors raised while opening a track for streaming.
#[derive(Debug, thiserror::Error)]
pub enum OpenError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Remote server answered with a non-success status
    #[error("Unexpected HTTP status {status} for {uri}")]
    Status { uri: String, status: u16 },

    /// Invalid URL
    #[error("Invalid track URI: {0}")]
    InvalidUri(#[from] url::ParseError),

    /// A file:// URI that does not map to a local path
    #[error("Invalid file URI: {0}")]
    InvalidFileUri(String),

    /// URI scheme no opener handles
    #[error("Unsupported URI scheme: {0}")]
    UnsupportedScheme(String),

    /// Track missing at the given location
    #[error("Track not found: {0}")]
    NotFound(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Result type alias for track opening operations
pub type Result<T> = std::result::Result<T, OpenError>;

/// A stream of raw audio bytes for one track.
///
/// Wraps whatever the opener produced (HTTP response body, file reader,
/// in-memory chunks) behind a single `Stream<Item = io::Result<Bytes>>`
/// the relay can consume uniformly.
pub struct TrackStream {
    inner: Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>,
}

impl TrackStream {
    pub fn new(stream: impl Stream<Item = io::Result<Bytes>> + Send + 'static) -> Self {
        Self {
            inner: Box::pin(stream),
        }
    }

    /// Single-chunk stream, mostly useful in tests.
    pub fn once(bytes: Bytes) -> Self {
        Self::new(futures::stream::once(async move { Ok(bytes) }))
    }
}

impl fmt::Debug for TrackStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackStream").finish_non_exhaustive()
    }
}

impl Stream for TrackStream {
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

/// Opens a byte stream for a track URI.
///
/// Implementations must support being called from many channel tasks at
/// once; any per-call state lives in the returned [`TrackStream`].
#[async_trait]
pub trait TrackSource: Send + Sync {
    async fn open(&self, uri: &str) -> Result<TrackStream>;
}

/// Scheme-dispatching opener covering both remote and local tracks.
///
/// `http`/`https` URIs go to [`HttpTrackSource`]; `file` URIs and bare
/// paths go to [`FileTrackSource`].
#[derive(Debug, Default)]
pub struct UriTrackSource {
    http: HttpTrackSource,
    file: FileTrackSource,
}

impl UriTrackSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves bare relative paths against `root`.
    pub fn with_root(root: impl Into<std::path::PathBuf>) -> Self {
        Self {
            http: HttpTrackSource::new(),
            file: FileTrackSource::with_root(root),
        }
    }
}

#[async_trait]
impl TrackSource for UriTrackSource {
    async fn open(&self, uri: &str) -> Result<TrackStream> {
        match Url::parse(uri) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => self.http.open(uri).await,
            Ok(url) if url.scheme() == "file" => self.file.open(uri).await,
            Ok(url) => Err(OpenError::UnsupportedScheme(url.scheme().to_string())),
            // Bare paths ("mp3/one.mp3") are not absolute URLs; treat them
            // as local files.
            Err(url::ParseError::RelativeUrlWithoutBase) => self.file.open(uri).await,
            Err(e) => Err(e.into()),
        }
    }
}
