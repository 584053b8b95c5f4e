//! Task representation.

use std::sync::atomic::{AtomicU64, Ordering};

/// Global task sequence counter, shared by all pools.
static TASK_SEQ_COUNTER: AtomicU64 = AtomicU64::new(1);

/// The priority of a queued task.
///
/// A signed 16-bit value; larger values are dequeued first when priority
/// ordering is enabled. Construct one with [`Priority::new`] or use the
/// predefined levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Priority(i16);

impl Priority {
    /// The highest possible priority.
    pub const HIGHEST: Priority = Priority(i16::MAX);
    /// A high priority.
    pub const HIGH: Priority = Priority(16383);
    /// The default priority.
    pub const NORMAL: Priority = Priority(0);
    /// A low priority.
    pub const LOW: Priority = Priority(-16384);
    /// The lowest possible priority.
    pub const LOWEST: Priority = Priority(i16::MIN);

    /// Create a priority from a raw value.
    pub const fn new(value: i16) -> Self {
        Priority(value)
    }

    /// The raw priority value.
    pub const fn value(self) -> i16 {
        self.0
    }
}

impl From<i16> for Priority {
    fn from(value: i16) -> Self {
        Priority(value)
    }
}

/// A queued unit of work: a type-erased nullary closure, its priority, and
/// a monotonic sequence number used as the FIFO tie-break among tasks of
/// equal priority.
pub(crate) struct Task {
    func: Box<dyn FnOnce() + Send + 'static>,
    priority: Priority,
    seq: u64,
}

impl Task {
    pub(crate) fn new<F>(f: F, priority: Priority) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Task {
            func: Box::new(f),
            priority,
            seq: TASK_SEQ_COUNTER.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Run the task, consuming it.
    pub(crate) fn execute(self) {
        (self.func)();
    }
}

// Heap ordering: higher priority first, then earlier submission first.
impl PartialEq for Task {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl Eq for Task {}

impl PartialOrd for Task {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Task {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("priority", &self.priority)
            .field("seq", &self.seq)
            .finish_non_exhaustive()
    }
}
