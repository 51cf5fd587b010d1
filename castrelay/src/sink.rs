//! Sink contract and the relay-owned fan-out set.
//!
//! The [`SinkSet`] is owned exclusively by the relay task; external
//! callers (the channel registry) never touch it directly. They queue
//! attach/detach operations on the shared [`SinkMailbox`], and the relay
//! applies the queue at its next chunk boundary. This keeps every
//! mutation of the fan-out set confined to the owning task while the
//! mailbox itself stays cheap and lock-light.

use async_trait::async_trait;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Errors raised by a sink write.
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Sink closed")]
    Closed,
}

/// A byte-writable destination attached to a channel.
///
/// Implementations must fail fast once their receiver is gone; the relay
/// detaches a sink on the first write error, timeout, or dead
/// [`Sink::is_alive`] answer, without disturbing the other sinks.
#[async_trait]
pub trait Sink: Send {
    async fn write(&mut self, chunk: &[u8]) -> Result<(), WriteError>;

    /// Cheap liveness check consulted before each write.
    fn is_alive(&self) -> bool {
        true
    }
}

static NEXT_SINK_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque token identifying one attached sink; the detach handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SinkId(u64);

impl SinkId {
    fn allocate() -> Self {
        Self(NEXT_SINK_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sink-{}", self.0)
    }
}

enum SinkOp {
    Attach(SinkId, Box<dyn Sink>),
    Detach(SinkId),
    Clear,
}

#[derive(Default)]
struct MailboxInner {
    ops: Mutex<Vec<SinkOp>>,
    dirty: AtomicBool,
    attached: AtomicUsize,
}

/// Attach/detach command queue shared between the registry and one relay.
///
/// Operations become visible to listeners at the relay's next emitted
/// chunk: an attached sink starts receiving with that chunk (no replay of
/// history), a detached sink receives nothing after the call.
#[derive(Clone, Default)]
pub struct SinkMailbox {
    inner: Arc<MailboxInner>,
}

impl SinkMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a sink for fan-out and returns its detach token.
    pub fn attach(&self, sink: Box<dyn Sink>) -> SinkId {
        let id = SinkId::allocate();
        self.push(SinkOp::Attach(id, sink));
        id
    }

    /// Queues removal of one sink. Unknown ids are ignored on apply.
    pub fn detach(&self, id: SinkId) {
        self.push(SinkOp::Detach(id));
    }

    /// Drops every attached sink, including not-yet-applied attaches.
    pub fn clear(&self) {
        let mut ops = self.inner.ops.lock().expect("sink mailbox mutex poisoned");
        ops.clear();
        ops.push(SinkOp::Clear);
        drop(ops);
        self.inner.dirty.store(true, Ordering::Release);
    }

    /// Sink count as last observed by the relay loop.
    pub fn attached(&self) -> usize {
        self.inner.attached.load(Ordering::SeqCst)
    }

    fn push(&self, op: SinkOp) {
        let mut ops = self.inner.ops.lock().expect("sink mailbox mutex poisoned");
        ops.push(op);
        drop(ops);
        self.inner.dirty.store(true, Ordering::Release);
    }

    fn take_ops(&self) -> Option<Vec<SinkOp>> {
        if !self.inner.dirty.swap(false, Ordering::AcqRel) {
            return None;
        }
        let mut ops = self.inner.ops.lock().expect("sink mailbox mutex poisoned");
        Some(std::mem::take(&mut *ops))
    }

    fn publish_attached(&self, count: usize) {
        self.inner.attached.store(count, Ordering::SeqCst);
    }
}

struct SinkEntry {
    id: SinkId,
    sink: Box<dyn Sink>,
}

/// Fan-out set driving all attached sinks of one channel.
pub struct SinkSet {
    entries: Vec<SinkEntry>,
    mailbox: SinkMailbox,
    write_timeout: Duration,
}

impl SinkSet {
    pub fn new(mailbox: SinkMailbox, write_timeout: Duration) -> Self {
        Self {
            entries: Vec::new(),
            mailbox,
            write_timeout,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Applies queued attach/detach operations from the mailbox.
    pub fn apply_pending(&mut self) {
        let Some(ops) = self.mailbox.take_ops() else {
            return;
        };
        for op in ops {
            match op {
                SinkOp::Attach(id, sink) => {
                    debug!(sink = %id, "Sink attached");
                    self.entries.push(SinkEntry { id, sink });
                }
                SinkOp::Detach(id) => {
                    self.entries.retain(|entry| entry.id != id);
                }
                SinkOp::Clear => {
                    self.entries.clear();
                }
            }
        }
        self.mailbox.publish_attached(self.entries.len());
    }

    /// Writes one chunk to every attached sink.
    ///
    /// A write failure, a dead liveness check, or a write exceeding the
    /// timeout detaches that sink only; healthy sinks are unaffected.
    pub async fn broadcast(&mut self, chunk: &[u8]) {
        if self.entries.is_empty() {
            return;
        }

        let mut dead: Vec<SinkId> = Vec::new();
        for entry in &mut self.entries {
            if !entry.sink.is_alive() {
                debug!(sink = %entry.id, "Sink no longer alive, detaching");
                dead.push(entry.id);
                continue;
            }
            match timeout(self.write_timeout, entry.sink.write(chunk)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    debug!(sink = %entry.id, "Sink write failed, detaching: {}", e);
                    dead.push(entry.id);
                }
                Err(_) => {
                    warn!(sink = %entry.id, "Sink write timed out, detaching");
                    dead.push(entry.id);
                }
            }
        }

        if !dead.is_empty() {
            self.entries.retain(|entry| !dead.contains(&entry.id));
            self.mailbox.publish_attached(self.entries.len());
        }
    }

    /// Detaches every sink (relay shutdown).
    pub fn clear(&mut self) {
        self.entries.clear();
        self.mailbox.publish_attached(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::CollectSink;

    #[tokio::test]
    async fn test_attach_applies_at_next_boundary() {
        let mailbox = SinkMailbox::new();
        let mut set = SinkSet::new(mailbox.clone(), Duration::from_secs(1));

        let (sink, handle) = CollectSink::new();
        mailbox.attach(Box::new(sink));
        assert_eq!(set.len(), 0);

        set.apply_pending();
        assert_eq!(set.len(), 1);
        assert_eq!(mailbox.attached(), 1);

        set.broadcast(b"abc").await;
        assert_eq!(handle.bytes(), b"abc");
    }

    #[tokio::test]
    async fn test_detach_is_idempotent() {
        let mailbox = SinkMailbox::new();
        let mut set = SinkSet::new(mailbox.clone(), Duration::from_secs(1));

        let (sink, _handle) = CollectSink::new();
        let id = mailbox.attach(Box::new(sink));
        set.apply_pending();

        mailbox.detach(id);
        mailbox.detach(id);
        set.apply_pending();
        assert_eq!(set.len(), 0);
        assert_eq!(mailbox.attached(), 0);
    }

    #[tokio::test]
    async fn test_broadcast_drops_dead_sink_only() {
        let mailbox = SinkMailbox::new();
        let mut set = SinkSet::new(mailbox.clone(), Duration::from_secs(1));

        let (doomed, doomed_handle) = CollectSink::new();
        let (healthy, healthy_handle) = CollectSink::new();
        mailbox.attach(Box::new(doomed));
        mailbox.attach(Box::new(healthy));
        set.apply_pending();

        set.broadcast(b"one").await;
        doomed_handle.kill();
        set.broadcast(b"two").await;
        set.broadcast(b"three").await;

        assert_eq!(set.len(), 1);
        assert_eq!(doomed_handle.bytes(), b"one");
        assert_eq!(healthy_handle.bytes(), b"onetwothree");
    }
}
