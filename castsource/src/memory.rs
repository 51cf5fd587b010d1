//! In-memory track opener for tests and demos.

use crate::{OpenError, Result, TrackSource, TrackStream};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;

#[derive(Debug, Clone)]
enum Entry {
    Bytes(Bytes),
    Fail,
}

/// Serves tracks from memory, with optional scripted open failures.
///
/// Built once, then immutable; channels can share it behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct MemoryTrackSource {
    tracks: HashMap<String, Entry>,
    chunk_size: usize,
}

impl MemoryTrackSource {
    pub fn new() -> Self {
        Self {
            tracks: HashMap::new(),
            chunk_size: 1024,
        }
    }

    /// Chunk size for the emitted stream (default 1024 bytes).
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_track(mut self, uri: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        self.tracks.insert(uri.into(), Entry::Bytes(bytes.into()));
        self
    }

    /// Registers a URI whose open always fails.
    pub fn with_failure(mut self, uri: impl Into<String>) -> Self {
        self.tracks.insert(uri.into(), Entry::Fail);
        self
    }
}

#[async_trait]
impl TrackSource for MemoryTrackSource {
    async fn open(&self, uri: &str) -> Result<TrackStream> {
        let bytes = match self.tracks.get(uri) {
            Some(Entry::Bytes(bytes)) => bytes.clone(),
            Some(Entry::Fail) | None => return Err(OpenError::NotFound(uri.to_string())),
        };

        let chunk_size = self.chunk_size.max(1);
        let stream = async_stream::stream! {
            let mut offset = 0;
            while offset < bytes.len() {
                let end = (offset + chunk_size).min(bytes.len());
                yield Ok(bytes.slice(offset..end));
                offset = end;
                // An always-ready source never reaches a suspension point
                // on its own; give the scheduler one between chunks.
                tokio::task::yield_now().await;
            }
        };

        Ok(TrackStream::new(stream))
    }
}
