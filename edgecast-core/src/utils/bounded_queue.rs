//! Bounded single-consumer FIFO with a non-blocking push.
//!
//! Producers never wait: when the queue is full the push either evicts the
//! oldest item or rejects the new one, as chosen per call. The consumer
//! awaits [`BoundedQueue::pop`], which is woken through a [`Notify`].

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

/// What a push does when the queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overflow {
    /// Evict the oldest queued item to make room.
    DropOldest,
    /// Keep the queue as is and hand the new item back.
    RejectNew,
}

#[derive(Debug, PartialEq, Eq)]
pub enum PushResult<T> {
    Queued,
    /// Queued after evicting the returned item.
    Evicted(T),
    /// Queue full, item not queued.
    Rejected(T),
    /// Queue closed, item not queued.
    Closed(T),
}

#[derive(Debug)]
pub struct BoundedQueue<T> {
    state: Mutex<State<T>>,
    notify: Notify,
    capacity: usize,
}

#[derive(Debug)]
struct State<T> {
    items: VecDeque<T>,
    closed: bool,
}

impl<T> BoundedQueue<T> {
    /// A queue holding at most `capacity` items (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            state: Mutex::new(State {
                items: VecDeque::with_capacity(capacity.min(1024)),
                closed: false,
            }),
            notify: Notify::new(),
            capacity,
        }
    }

    pub fn push(&self, item: T, overflow: Overflow) -> PushResult<T> {
        let result = {
            let mut state = self.lock();
            if state.closed {
                return PushResult::Closed(item);
            }
            if state.items.len() < self.capacity {
                state.items.push_back(item);
                PushResult::Queued
            } else {
                match overflow {
                    Overflow::RejectNew => return PushResult::Rejected(item),
                    Overflow::DropOldest => {
                        let evicted = state.items.pop_front();
                        state.items.push_back(item);
                        match evicted {
                            Some(old) => PushResult::Evicted(old),
                            None => PushResult::Queued,
                        }
                    }
                }
            }
        };
        self.notify.notify_one();
        result
    }

    /// Wait for the next item. Returns `None` once the queue is closed and
    /// empty.
    pub async fn pop(&self) -> Option<T> {
        loop {
            {
                let mut state = self.lock();
                if let Some(item) = state.items.pop_front() {
                    return Some(item);
                }
                if state.closed {
                    return None;
                }
            }
            self.notify.notified().await;
        }
    }

    pub fn try_pop(&self) -> Option<T> {
        self.lock().items.pop_front()
    }

    /// Remove and return everything currently queued.
    pub fn drain(&self) -> Vec<T> {
        self.lock().items.drain(..).collect()
    }

    /// Refuse further pushes. Items already queued can still be popped.
    pub fn close(&self) {
        self.lock().closed = true;
        self.notify.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Clone> BoundedQueue<T> {
    /// Copy of the queued items, oldest first.
    pub fn snapshot(&self) -> Vec<T> {
        self.lock().items.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_drop_oldest_when_full() {
        let queue = BoundedQueue::new(2);
        assert_eq!(queue.push(1, Overflow::DropOldest), PushResult::Queued);
        assert_eq!(queue.push(2, Overflow::DropOldest), PushResult::Queued);
        assert_eq!(queue.push(3, Overflow::DropOldest), PushResult::Evicted(1));
        assert_eq!(queue.snapshot(), vec![2, 3]);
    }

    #[test]
    fn test_reject_new_when_full() {
        let queue = BoundedQueue::new(2);
        queue.push(1, Overflow::RejectNew);
        queue.push(2, Overflow::RejectNew);
        assert_eq!(queue.push(3, Overflow::RejectNew), PushResult::Rejected(3));
        assert_eq!(queue.snapshot(), vec![1, 2]);
    }

    #[test]
    fn test_closed_queue_refuses_pushes() {
        let queue = BoundedQueue::new(4);
        queue.push("a", Overflow::RejectNew);
        queue.close();
        assert_eq!(queue.push("b", Overflow::DropOldest), PushResult::Closed("b"));
        assert_eq!(queue.try_pop(), Some("a"));
        assert_eq!(queue.try_pop(), None);
    }

    #[tokio::test]
    async fn test_pop_wakes_on_push() {
        let queue = Arc::new(BoundedQueue::new(4));
        let consumer = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.pop().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        queue.push(7, Overflow::RejectNew);
        assert_eq!(consumer.await.unwrap(), Some(7));
    }

    #[tokio::test]
    async fn test_pop_returns_none_after_close() {
        let queue: Arc<BoundedQueue<u8>> = Arc::new(BoundedQueue::new(4));
        let consumer = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.pop().await })
        };
        queue.close();
        assert_eq!(consumer.await.unwrap(), None);
    }
}
