use std::collections::VecDeque;

use crate::error::{DiskTestError, Result};

/// Single-producer/single-consumer FIFO buffer used by the Path Planner.
/// Not concurrency-safe by design: the planner is its only owner.
#[derive(Debug, Default)]
pub struct FifoQueue<T> {
    items: VecDeque<T>,
}

impl<T> FifoQueue<T> {
    pub fn new() -> Self {
        Self {
            items: VecDeque::new(),
        }
    }

    /// Enqueue `value`. `Option` stands in for the spec's "value is
    /// absent" failure mode: `None` fails with `InvalidArgument`.
    pub fn enqueue(&mut self, value: Option<T>) -> Result<usize> {
        let value = value.ok_or_else(|| {
            DiskTestError::InvalidArgument("queue value can't be null".to_string())
        })?;
        self.items.push_back(value);
        Ok(self.items.len())
    }

    pub fn dequeue(&mut self) -> Result<T> {
        self.items.pop_front().ok_or(DiskTestError::QueueEmpty)
    }

    pub fn size(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_order_preserved() {
        let mut q: FifoQueue<i32> = FifoQueue::new();
        for i in 0..10 {
            q.enqueue(Some(i)).unwrap();
        }
        assert_eq!(q.size(), 10);
        for i in 0..10 {
            assert_eq!(q.dequeue().unwrap(), i);
        }
        assert_eq!(q.size(), 0);
    }

    #[test]
    fn dequeue_empty_fails() {
        let mut q: FifoQueue<i32> = FifoQueue::new();
        match q.dequeue() {
            Err(DiskTestError::QueueEmpty) => {}
            other => panic!("expected QueueEmpty, got {:?}", other),
        }
    }

    #[test]
    fn enqueue_none_fails() {
        let mut q: FifoQueue<i32> = FifoQueue::new();
        match q.enqueue(None) {
            Err(DiskTestError::InvalidArgument(_)) => {}
            other => panic!("expected InvalidArgument, got {:?}", other),
        }
        assert_eq!(q.size(), 0);
    }

    #[test]
    fn size_tracks_every_step() {
        let mut q: FifoQueue<i32> = FifoQueue::new();
        assert_eq!(q.size(), 0);
        q.enqueue(Some(1)).unwrap();
        assert_eq!(q.size(), 1);
        q.enqueue(Some(2)).unwrap();
        assert_eq!(q.size(), 2);
        q.dequeue().unwrap();
        assert_eq!(q.size(), 1);
        q.dequeue().unwrap();
        assert_eq!(q.size(), 0);
    }
}
