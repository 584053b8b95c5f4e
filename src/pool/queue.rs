//! The shared pending-task queue.

use super::task::Task;
use std::collections::{BinaryHeap, VecDeque};

/// The pool's pending tasks, always accessed under the pool lock.
///
/// The strategy is fixed at construction: plain FIFO, or a max-heap keyed
/// by priority with FIFO order among tasks of equal priority (the heap is
/// made stable by the per-task sequence number).
#[derive(Debug)]
pub(crate) enum TaskQueue {
    Fifo(VecDeque<Task>),
    Priority(BinaryHeap<Task>),
}

impl TaskQueue {
    pub(crate) fn new(priority_enabled: bool) -> Self {
        if priority_enabled {
            TaskQueue::Priority(BinaryHeap::new())
        } else {
            TaskQueue::Fifo(VecDeque::new())
        }
    }

    pub(crate) fn push(&mut self, task: Task) {
        match self {
            TaskQueue::Fifo(queue) => queue.push_back(task),
            TaskQueue::Priority(heap) => heap.push(task),
        }
    }

    pub(crate) fn pop(&mut self) -> Option<Task> {
        match self {
            TaskQueue::Fifo(queue) => queue.pop_front(),
            TaskQueue::Priority(heap) => heap.pop(),
        }
    }

    /// Discard all pending tasks. Dropping a task drops its closure, which
    /// disconnects any result channel captured inside it.
    pub(crate) fn clear(&mut self) {
        match self {
            TaskQueue::Fifo(queue) => queue.clear(),
            TaskQueue::Priority(heap) => heap.clear(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        match self {
            TaskQueue::Fifo(queue) => queue.len(),
            TaskQueue::Priority(heap) => heap.len(),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
