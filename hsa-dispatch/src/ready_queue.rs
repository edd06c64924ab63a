// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Priority ordered queue of tasks waiting for a dispatch attempt.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::config::TieBreak;
use crate::table::TaskSlot;
use crate::task::DispatchId;

/// A task waiting in the [`ReadyQueue`].
#[derive(Clone, Copy, Debug)]
pub struct ReadyEntry {
    pub dispatch_id: DispatchId,
    pub slot: TaskSlot,
    pub priority: u32,

    /// Larger values are taken first among entries of equal priority.
    order: u64,
}

impl PartialEq for ReadyEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ReadyEntry {}

impl Ord for ReadyEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then(self.order.cmp(&other.order))
    }
}

impl PartialOrd for ReadyEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Highest priority first. Ties are broken by the order in which tasks were
/// submitted, according to the [`TieBreak`] policy.
///
/// An entry that is put back with [`requeue`](ReadyQueue::requeue) keeps its
/// place in the order.
pub struct ReadyQueue {
    heap: BinaryHeap<ReadyEntry>,
    next_seq: u64,
    tie_break: TieBreak,
}

impl ReadyQueue {
    #[must_use]
    pub fn new(tie_break: TieBreak) -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_seq: 0,
            tie_break,
        }
    }

    pub fn push(&mut self, dispatch_id: DispatchId, slot: TaskSlot, priority: u32) {
        let seq = self.next_seq;
        self.next_seq += 1;
        let order = match self.tie_break {
            TieBreak::Fifo => u64::MAX - seq,
            TieBreak::Lifo => seq,
        };
        self.heap.push(ReadyEntry {
            dispatch_id,
            slot,
            priority,
            order,
        });
    }

    pub fn requeue(&mut self, entry: ReadyEntry) {
        self.heap.push(entry);
    }

    pub fn pop(&mut self) -> Option<ReadyEntry> {
        self.heap.pop()
    }

    #[must_use]
    pub fn peek(&self) -> Option<&ReadyEntry> {
        self.heap.peek()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    #[must_use]
    pub fn tie_break(&self) -> TieBreak {
        self.tie_break
    }

    /// Dispatch ids in the order they would be popped.
    #[must_use]
    pub fn in_order(&self) -> Vec<DispatchId> {
        let mut entries = self.heap.clone().into_sorted_vec();
        entries.reverse();
        entries.iter().map(|e| e.dispatch_id).collect()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::TaskTable;
    use crate::task::KernelTask;

    fn fill(queue: &mut ReadyQueue, tasks: &[(u32, u32)]) {
        let mut table = TaskTable::new();
        for &(id, priority) in tasks {
            let slot = table.insert(KernelTask::new(DispatchId(id), "k", 1));
            queue.push(DispatchId(id), slot, priority);
        }
    }

    fn drain(queue: &mut ReadyQueue) -> Vec<u32> {
        std::iter::from_fn(|| queue.pop())
            .map(|e| e.dispatch_id.0)
            .collect()
    }

    #[test]
    fn priority_then_fifo() {
        let mut queue = ReadyQueue::new(TieBreak::Fifo);
        fill(&mut queue, &[(1, 1), (2, 5), (3, 1), (4, 5)]);
        assert_eq!(
            queue.in_order(),
            [2, 4, 1, 3].map(DispatchId).to_vec()
        );
        assert_eq!(drain(&mut queue), vec![2, 4, 1, 3]);
    }

    #[test]
    fn priority_then_lifo() {
        let mut queue = ReadyQueue::new(TieBreak::Lifo);
        fill(&mut queue, &[(1, 1), (2, 5), (3, 1), (4, 5)]);
        assert_eq!(drain(&mut queue), vec![4, 2, 3, 1]);
    }

    #[test]
    fn requeued_entries_keep_their_place() {
        let mut queue = ReadyQueue::new(TieBreak::Fifo);
        fill(&mut queue, &[(1, 0), (2, 0), (3, 0)]);
        let first = queue.pop().unwrap();
        let second = queue.pop().unwrap();
        queue.requeue(second);
        queue.requeue(first);
        assert_eq!(drain(&mut queue), vec![1, 2, 3]);
    }
}
