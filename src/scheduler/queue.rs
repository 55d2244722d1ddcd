//! Priority queue with FIFO tie-break.
//!
//! A max-heap keyed on (priority, arrival sequence): higher priority pops
//! first, and within a priority band the earlier arrival wins. Priority is
//! re-evaluated at every pop, so a newly-arrived high-priority entry
//! overtakes older low-priority ones that have not yet been dispatched.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Instant;

use uuid::Uuid;

use crate::scheduler::job::JobOperation;

/// One queued entry awaiting dispatch.
pub struct QueueEntry<T> {
    pub id: Uuid,
    pub priority: i32,
    pub seq: u64,
    pub enqueued_at: Instant,
    pub operation: JobOperation<T>,
}

impl<T> PartialEq for QueueEntry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl<T> Eq for QueueEntry<T> {}

impl<T> PartialOrd for QueueEntry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for QueueEntry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-heap: higher priority first, then lower seq (earlier arrival).
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Priority-ordered dispatch queue.
pub struct PriorityQueue<T> {
    heap: BinaryHeap<QueueEntry<T>>,
}

impl<T> PriorityQueue<T> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
        }
    }

    pub fn push(&mut self, entry: QueueEntry<T>) {
        self.heap.push(entry);
    }

    /// Pop the (highest priority, earliest arrival) entry.
    pub fn pop(&mut self) -> Option<QueueEntry<T>> {
        self.heap.pop()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }

    /// Unordered iteration over queued entries (for status snapshots).
    pub fn iter(&self) -> impl Iterator<Item = &QueueEntry<T>> {
        self.heap.iter()
    }
}

impl<T> Default for PriorityQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(priority: i32, seq: u64) -> QueueEntry<u32> {
        QueueEntry {
            id: Uuid::new_v4(),
            priority,
            seq,
            enqueued_at: Instant::now(),
            operation: Box::new(|| -> crate::scheduler::job::JobFuture<u32> {
                Box::pin(async { Ok(0) })
            }),
        }
    }

    #[test]
    fn test_higher_priority_pops_first() {
        let mut queue = PriorityQueue::new();
        queue.push(entry(1, 0));
        queue.push(entry(5, 1));
        queue.push(entry(3, 2));

        assert_eq!(queue.pop().unwrap().priority, 5);
        assert_eq!(queue.pop().unwrap().priority, 3);
        assert_eq!(queue.pop().unwrap().priority, 1);
        assert!(queue.pop().is_none());
    }

    #[test]
    fn test_fifo_within_priority_band() {
        let mut queue = PriorityQueue::new();
        queue.push(entry(5, 0));
        queue.push(entry(1, 1));
        queue.push(entry(5, 2));

        let first = queue.pop().unwrap();
        let second = queue.pop().unwrap();
        let third = queue.pop().unwrap();

        assert_eq!((first.priority, first.seq), (5, 0));
        assert_eq!((second.priority, second.seq), (5, 2));
        assert_eq!((third.priority, third.seq), (1, 1));
    }
}
