//! Sink implementations shipped with the relay.

use crate::sink::{Sink, WriteError};
use async_trait::async_trait;
use bytes::Bytes;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

/// Appends the channel's byte stream to a local file.
pub struct FileSink {
    file: File,
}

impl FileSink {
    /// Creates (or truncates) the file at `path`.
    pub async fn create(path: impl AsRef<Path>) -> std::io::Result<Self> {
        Ok(Self {
            file: File::create(path).await?,
        })
    }
}

#[async_trait]
impl Sink for FileSink {
    async fn write(&mut self, chunk: &[u8]) -> Result<(), WriteError> {
        self.file.write_all(chunk).await?;
        Ok(())
    }
}

/// Forwards chunks over an mpsc channel.
///
/// The consuming side is whatever wants the bytes (a response body
/// writer, a test); dropping the receiver closes the sink and the relay
/// detaches it at the next write.
pub struct ChannelSink {
    tx: mpsc::Sender<Bytes>,
}

impl ChannelSink {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Bytes>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

#[async_trait]
impl Sink for ChannelSink {
    async fn write(&mut self, chunk: &[u8]) -> Result<(), WriteError> {
        self.tx
            .send(Bytes::copy_from_slice(chunk))
            .await
            .map_err(|_| WriteError::Closed)
    }

    fn is_alive(&self) -> bool {
        !self.tx.is_closed()
    }
}

#[derive(Default)]
struct CollectShared {
    buf: Mutex<Vec<u8>>,
    dead: AtomicBool,
}

/// Buffers everything it receives into shared memory.
///
/// Test and demo helper; the paired [`CollectHandle`] reads the bytes
/// back and can kill the sink to simulate a vanished listener.
pub struct CollectSink {
    shared: Arc<CollectShared>,
}

/// Reader side of a [`CollectSink`].
#[derive(Clone)]
pub struct CollectHandle {
    shared: Arc<CollectShared>,
}

impl CollectSink {
    pub fn new() -> (Self, CollectHandle) {
        let shared = Arc::new(CollectShared::default());
        (
            Self {
                shared: shared.clone(),
            },
            CollectHandle { shared },
        )
    }
}

#[async_trait]
impl Sink for CollectSink {
    async fn write(&mut self, chunk: &[u8]) -> Result<(), WriteError> {
        if self.shared.dead.load(Ordering::SeqCst) {
            return Err(WriteError::Closed);
        }
        self.shared
            .buf
            .lock()
            .expect("collect sink mutex poisoned")
            .extend_from_slice(chunk);
        Ok(())
    }

    fn is_alive(&self) -> bool {
        !self.shared.dead.load(Ordering::SeqCst)
    }
}

impl CollectHandle {
    /// Snapshot of everything received so far.
    pub fn bytes(&self) -> Vec<u8> {
        self.shared
            .buf
            .lock()
            .expect("collect sink mutex poisoned")
            .clone()
    }

    pub fn len(&self) -> usize {
        self.shared
            .buf
            .lock()
            .expect("collect sink mutex poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Makes the paired sink refuse further writes, as a disconnected
    /// listener would.
    pub fn kill(&self) {
        self.shared.dead.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_sink_closes_with_receiver() {
        let (mut sink, rx) = ChannelSink::new(4);
        assert!(sink.is_alive());

        sink.write(b"abc").await.unwrap();
        drop(rx);

        assert!(!sink.is_alive());
        assert!(matches!(
            sink.write(b"def").await,
            Err(WriteError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_collect_sink_kill() {
        let (mut sink, handle) = CollectSink::new();
        sink.write(b"abc").await.unwrap();
        handle.kill();
        assert!(!sink.is_alive());
        assert!(sink.write(b"def").await.is_err());
        assert_eq!(handle.bytes(), b"abc");
    }
}
