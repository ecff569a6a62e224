//! Pending-trigger queue.
//!
//! Ordered by priority (higher first), then by insertion sequence (earlier
//! first). The sequence counter is monotonic until [`TriggerQueue::clear`].

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::event::TriggerId;

/// A trigger waiting to be processed.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingTrigger {
    pub trigger: TriggerId,
    pub priority: i32,
    /// Insertion sequence number.
    pub seq: u64,
    /// Gate applied when the trigger is popped.
    pub probability: f64,
}

impl Eq for PendingTrigger {}

impl Ord for PendingTrigger {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-heap: higher priority first, then lower seq first
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for PendingTrigger {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Priority queue of pending triggers.
#[derive(Clone, Debug, Default)]
pub struct TriggerQueue {
    heap: BinaryHeap<PendingTrigger>,
    next_seq: u64,
}

impl TriggerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a trigger. Returns its sequence number.
    pub fn push(&mut self, trigger: TriggerId, priority: i32, probability: f64) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(PendingTrigger {
            trigger,
            priority,
            seq,
            probability,
        });
        seq
    }

    /// Pop the highest-priority, earliest-inserted trigger.
    pub fn pop(&mut self) -> Option<PendingTrigger> {
        self.heap.pop()
    }

    #[must_use]
    pub fn peek(&self) -> Option<&PendingTrigger> {
        self.heap.peek()
    }

    /// Drop every pending trigger and restart the sequence counter.
    pub fn clear(&mut self) {
        self.heap.clear();
        self.next_seq = 0;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(queue: &mut TriggerQueue) -> Vec<String> {
        std::iter::from_fn(|| queue.pop())
            .map(|p| p.trigger.0)
            .collect()
    }

    #[test]
    fn test_priority_then_insertion_order() {
        let mut queue = TriggerQueue::new();
        queue.push("A".into(), 100, 1.0);
        queue.push("B".into(), 100, 1.0);
        queue.push("C".into(), 200, 1.0);

        assert_eq!(drain(&mut queue), vec!["C", "A", "B"]);
    }

    #[test]
    fn test_negative_priorities() {
        let mut queue = TriggerQueue::new();
        queue.push("low".into(), -5, 1.0);
        queue.push("zero".into(), 0, 1.0);
        assert_eq!(drain(&mut queue), vec!["zero", "low"]);
    }

    #[test]
    fn test_clear_resets_sequence() {
        let mut queue = TriggerQueue::new();
        queue.push("A".into(), 0, 1.0);
        assert_eq!(queue.push("B".into(), 0, 1.0), 1);

        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(queue.push("C".into(), 0, 1.0), 0);
    }
}
