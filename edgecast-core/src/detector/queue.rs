//! Bounded ingest buffer in front of the detector.
//!
//! Sports results arrive in bursts at the end of games. Producers must never
//! stall on the detector, so a full buffer drops its oldest unprocessed
//! record and counts the drop.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use crate::encoder::CompactRecord;
use crate::utils::bounded_queue::{BoundedQueue, Overflow, PushResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    Queued,
    /// Queued after dropping the oldest waiting record.
    DisplacedOldest,
    /// The detector has shut down; the record was discarded.
    Closed,
}

/// Cloneable handle to the ingest buffer. Many producers, one consumer
/// (the detector worker).
#[derive(Debug, Clone)]
pub struct IngestQueue {
    inner: Arc<IngestQueueInner>,
}

#[derive(Debug)]
struct IngestQueueInner {
    queue: BoundedQueue<CompactRecord>,
    dropped: AtomicU64,
}

impl IngestQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(IngestQueueInner {
                queue: BoundedQueue::new(capacity),
                dropped: AtomicU64::new(0),
            }),
        }
    }

    /// Hand a record to the detector. Never blocks.
    pub fn push(&self, record: CompactRecord) -> IngestOutcome {
        match self.inner.queue.push(record, Overflow::DropOldest) {
            PushResult::Queued => IngestOutcome::Queued,
            PushResult::Evicted(old) => {
                let total = self.inner.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                debug!(dropped = ?old, total, "Ingest buffer full, dropped oldest record");
                IngestOutcome::DisplacedOldest
            }
            PushResult::Rejected(_) | PushResult::Closed(_) => IngestOutcome::Closed,
        }
    }

    pub async fn pop(&self) -> Option<CompactRecord> {
        self.inner.queue.pop().await
    }

    pub fn drain(&self) -> Vec<CompactRecord> {
        self.inner.queue.drain()
    }

    pub fn close(&self) {
        self.inner.queue.close();
    }

    pub fn len(&self) -> usize {
        self.inner.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.queue.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.queue.capacity()
    }

    /// Records dropped since construction.
    pub fn dropped(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::RECORD_LEN;

    fn record(tag: u8) -> CompactRecord {
        let mut bytes = [0u8; RECORD_LEN];
        bytes[16] = tag;
        CompactRecord::from_bytes(bytes)
    }

    #[test]
    fn test_overflow_drops_oldest() {
        let queue = IngestQueue::new(3);
        for tag in 0..3 {
            assert_eq!(queue.push(record(tag)), IngestOutcome::Queued);
        }
        assert_eq!(queue.push(record(3)), IngestOutcome::DisplacedOldest);
        assert_eq!(queue.push(record(4)), IngestOutcome::DisplacedOldest);
        assert_eq!(queue.dropped(), 2);

        let remaining: Vec<u8> = queue.drain().iter().map(|r| r.home_score()).collect();
        assert_eq!(remaining, vec![2, 3, 4]);
    }

    #[test]
    fn test_closed_queue_discards() {
        let queue = IngestQueue::new(3);
        queue.close();
        assert_eq!(queue.push(record(0)), IngestOutcome::Closed);
        assert_eq!(queue.dropped(), 0);
    }
}
