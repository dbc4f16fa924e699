//! A connected delivery target.

use edgecast_sdk::objects::Priority;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

use super::channel::Channel;
use super::message::Message;
use crate::utils::bounded_queue::{BoundedQueue, Overflow, PushResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for SubscriberId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// What happened to one message offered to one subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Delivery {
    Queued,
    Evicted,
    Dropped,
    Closed,
}

/// One live connection's state inside the hub.
///
/// The hub pushes into the outbound queue; the connection's send loop pops
/// from it with [`Subscriber::recv`].
#[derive(Debug)]
pub struct Subscriber {
    id: SubscriberId,
    queue: BoundedQueue<Message>,
    channels: Mutex<BTreeSet<Channel>>,
    last_seen: Mutex<Instant>,
    dropped: AtomicU64,
    evicted: AtomicU64,
}

impl Subscriber {
    pub(crate) fn new(id: SubscriberId, queue_capacity: usize) -> Self {
        Self {
            id,
            queue: BoundedQueue::new(queue_capacity),
            channels: Mutex::new(BTreeSet::new()),
            last_seen: Mutex::new(Instant::now()),
            dropped: AtomicU64::new(0),
            evicted: AtomicU64::new(0),
        }
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Next outbound message. `None` once the hub disconnected this
    /// subscriber and the queue is empty.
    pub async fn recv(&self) -> Option<Message> {
        self.queue.pop().await
    }

    pub fn try_recv(&self) -> Option<Message> {
        self.queue.try_pop()
    }

    /// Messages waiting to be sent, oldest first.
    pub fn pending(&self) -> Vec<Message> {
        self.queue.snapshot()
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn is_closed(&self) -> bool {
        self.queue.is_closed()
    }

    pub fn channels(&self) -> Vec<Channel> {
        lock(&self.channels).iter().cloned().collect()
    }

    pub fn is_subscribed(&self, channel: &Channel) -> bool {
        lock(&self.channels).contains(channel)
    }

    /// Normal-priority messages dropped because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Queued messages evicted to make room for high-priority ones.
    pub fn evicted(&self) -> u64 {
        self.evicted.load(Ordering::Relaxed)
    }

    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(*lock(&self.last_seen))
    }

    pub(crate) fn touch(&self) {
        *lock(&self.last_seen) = Instant::now();
    }

    pub(crate) fn enqueue(&self, message: Message, priority: Priority) -> Delivery {
        let overflow = match priority {
            Priority::High => Overflow::DropOldest,
            Priority::Normal => Overflow::RejectNew,
        };
        match self.queue.push(message, overflow) {
            PushResult::Queued => Delivery::Queued,
            PushResult::Evicted(_) => {
                self.evicted.fetch_add(1, Ordering::Relaxed);
                Delivery::Evicted
            }
            PushResult::Rejected(_) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                Delivery::Dropped
            }
            PushResult::Closed(_) => Delivery::Closed,
        }
    }

    /// Add `channels`, returning those that were newly joined.
    pub(crate) fn join(&self, channels: &[Channel]) -> Vec<Channel> {
        let mut set = lock(&self.channels);
        channels
            .iter()
            .filter(|c| set.insert((*c).clone()))
            .cloned()
            .collect()
    }

    /// Remove `channels`, returning those that were actually left.
    pub(crate) fn part(&self, channels: &[Channel]) -> Vec<Channel> {
        let mut set = lock(&self.channels);
        channels.iter().filter(|c| set.remove(*c)).cloned().collect()
    }

    pub(crate) fn part_all(&self) -> Vec<Channel> {
        std::mem::take(&mut *lock(&self.channels)).into_iter().collect()
    }

    pub(crate) fn close(&self) {
        self.queue.close();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(n: u64) -> Message {
        Message::new("games", json!(n))
    }

    #[test]
    fn test_high_priority_evicts_oldest() {
        let subscriber = Subscriber::new(SubscriberId::new(), 2);
        assert_eq!(subscriber.enqueue(message(1), Priority::Normal), Delivery::Queued);
        assert_eq!(subscriber.enqueue(message(2), Priority::Normal), Delivery::Queued);
        assert_eq!(subscriber.enqueue(message(3), Priority::High), Delivery::Evicted);
        assert_eq!(subscriber.pending(), vec![message(2), message(3)]);
        assert_eq!(subscriber.evicted(), 1);
    }

    #[test]
    fn test_normal_priority_drops_new() {
        let subscriber = Subscriber::new(SubscriberId::new(), 2);
        subscriber.enqueue(message(1), Priority::Normal);
        subscriber.enqueue(message(2), Priority::Normal);
        assert_eq!(subscriber.enqueue(message(3), Priority::Normal), Delivery::Dropped);
        assert_eq!(subscriber.pending(), vec![message(1), message(2)]);
        assert_eq!(subscriber.dropped(), 1);
    }

    #[test]
    fn test_join_and_part_report_changes() {
        let subscriber = Subscriber::new(SubscriberId::new(), 4);
        let joined = subscriber.join(&[Channel::alerts(), Channel::games(), Channel::alerts()]);
        assert_eq!(joined, vec![Channel::alerts(), Channel::games()]);
        assert_eq!(subscriber.part(&[Channel::metrics(), Channel::games()]), vec![Channel::games()]);
        assert_eq!(subscriber.part_all(), vec![Channel::alerts()]);
        assert!(subscriber.channels().is_empty());
    }
}
