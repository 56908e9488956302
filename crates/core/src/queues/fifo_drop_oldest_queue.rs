use std::{collections::VecDeque, sync::Arc};

use parking_lot::Mutex;
use tokio::sync::Notify;

pub struct FifoDropOldestQueue<T> {
    inner: Arc<FifoDropOldestInner<T>>,
}

struct FifoDropOldestInner<T> {
    buf: Mutex<VecDeque<T>>,
    capacity: usize,
    notify_any: Arc<Notify>,
}

pub struct FifoDropOldestReceiver<T> {
    inner: Arc<FifoDropOldestInner<T>>,
}

impl<T> FifoDropOldestQueue<T> {
    pub fn new(capacity: usize, notify_any: Arc<Notify>) -> Self {
        assert!(capacity > 0);

        Self {
            inner: Arc::new(FifoDropOldestInner {
                buf: Mutex::new(VecDeque::with_capacity(capacity)),
                capacity,
                notify_any,
            }),
        }
    }

    /// Enqueue, returning the item evicted to make room, if any.
    pub fn push_overwrite(&self, value: T) -> Option<T> {
        let evicted = {
            let mut buf = self.inner.buf.lock();
            let evicted = if buf.len() >= self.inner.capacity {
                buf.pop_front()
            } else {
                None
            };
            buf.push_back(value);
            evicted
        };
        self.inner.notify_any.notify_one();
        evicted
    }

    pub fn receiver(&self) -> FifoDropOldestReceiver<T> {
        FifoDropOldestReceiver {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> FifoDropOldestReceiver<T> {
    pub fn try_recv(&self) -> Option<T> {
        self.inner.buf.lock().pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_queue_evicts_oldest() {
        let q = FifoDropOldestQueue::new(2, Arc::new(Notify::new()));
        let rx = q.receiver();

        assert_eq!(q.push_overwrite(1), None);
        assert_eq!(q.push_overwrite(2), None);
        assert_eq!(q.push_overwrite(3), Some(1));

        assert_eq!(rx.try_recv(), Some(2));
        assert_eq!(rx.try_recv(), Some(3));
        assert_eq!(rx.try_recv(), None);
    }

    #[tokio::test]
    async fn push_wakes_the_reader() {
        let notify = Arc::new(Notify::new());
        let q = FifoDropOldestQueue::new(1, Arc::clone(&notify));

        q.push_overwrite("x");

        // The permit is stored, so this resolves immediately.
        notify.notified().await;
        assert_eq!(q.receiver().try_recv(), Some("x"));
    }
}
