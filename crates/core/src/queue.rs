use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tokio::sync::Notify;

/// A bounded FIFO queue that drops the **oldest** element on overflow
/// instead of rejecting the new one, per spec §5 ("Bounded queues...drop
/// the oldest element on overflow and increment a dropped-message counter
/// for observability"). Used for a child's stdin command queue and for the
/// XBee relay's receive buffer.
pub struct BoundedQueue<T> {
    inner: Mutex<VecDeque<T>>,
    capacity: usize,
    notify: Notify,
    dropped: AtomicU64,
}

impl<T> BoundedQueue<T> {
    pub fn new(capacity: usize) -> Self {
        BoundedQueue {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            notify: Notify::new(),
            dropped: AtomicU64::new(0),
        }
    }

    /// Pushes an item, dropping the oldest queued item if already at
    /// capacity. Returns `true` if something was dropped to make room.
    pub fn push(&self, item: T) -> bool {
        let mut dropped_one = false;
        {
            let mut queue = self.inner.lock().unwrap();
            if queue.len() >= self.capacity {
                queue.pop_front();
                dropped_one = true;
            }
            queue.push_back(item);
        }
        if dropped_one {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        self.notify.notify_one();
        dropped_one
    }

    pub fn try_pop(&self) -> Option<T> {
        self.inner.lock().unwrap().pop_front()
    }

    /// Waits until an item is available and pops it.
    pub async fn pop(&self) -> T {
        loop {
            if let Some(item) = self.try_pop() {
                return item;
            }
            self.notify.notified().await;
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_within_capacity_drops_nothing() {
        let queue: BoundedQueue<i32> = BoundedQueue::new(2);
        assert!(!queue.push(1));
        assert!(!queue.push(2));
        assert_eq!(queue.dropped_count(), 0);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn overflow_drops_oldest_and_counts_exactly_one_per_drop() {
        let queue: BoundedQueue<i32> = BoundedQueue::new(2);
        queue.push(1);
        queue.push(2);
        assert!(queue.push(3));
        assert_eq!(queue.dropped_count(), 1);
        assert_eq!(queue.try_pop(), Some(2));
        assert_eq!(queue.try_pop(), Some(3));
        assert_eq!(queue.try_pop(), None);
    }

    #[tokio::test]
    async fn pop_waits_for_an_item() {
        let queue = std::sync::Arc::new(BoundedQueue::<i32>::new(4));
        let waiter = queue.clone();
        let handle = tokio::spawn(async move { waiter.pop().await });
        tokio::task::yield_now().await;
        queue.push(42);
        assert_eq!(handle.await.unwrap(), 42);
    }
}
