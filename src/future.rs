//! Result channels for submitted tasks.
//!
//! Every `submit_*` call pairs the queued task with a single-slot channel.
//! The task sends exactly one outcome (the return value, or the caught
//! panic payload); if the task is discarded unexecuted, the send side is
//! dropped and the future reports [`Error::BrokenPromise`] instead of
//! blocking forever.

use crate::error::{Error, Result, TaskFailed};
use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};
use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// The raw outcome of one task execution.
type Outcome<T> = std::thread::Result<T>;

enum Slot<T> {
    Pending,
    Ready(Outcome<T>),
    Broken,
}

/// The read side of one submitted task's result channel.
///
/// Waiting does not consume the future; the received outcome is cached so
/// [`get`](TaskFuture::get) can be called after any number of waits.
pub struct TaskFuture<T> {
    rx: Receiver<Outcome<T>>,
    slot: Mutex<Slot<T>>,
}

impl<T> TaskFuture<T> {
    pub(crate) fn new(rx: Receiver<Outcome<T>>) -> Self {
        Self {
            rx,
            slot: Mutex::new(Slot::Pending),
        }
    }

    /// Block until the task has finished or been discarded.
    pub fn wait(&self) {
        let mut slot = self.slot.lock();
        if let Slot::Pending = *slot {
            *slot = match self.rx.recv() {
                Ok(outcome) => Slot::Ready(outcome),
                Err(_) => Slot::Broken,
            };
        }
    }

    /// Block until the task settles or the duration expires. Returns `true`
    /// if the task settled.
    pub fn wait_for(&self, timeout: Duration) -> bool {
        let mut slot = self.slot.lock();
        match *slot {
            Slot::Pending => match self.rx.recv_timeout(timeout) {
                Ok(outcome) => {
                    *slot = Slot::Ready(outcome);
                    true
                }
                Err(RecvTimeoutError::Timeout) => false,
                Err(RecvTimeoutError::Disconnected) => {
                    *slot = Slot::Broken;
                    true
                }
            },
            _ => true,
        }
    }

    /// Block until the task settles or the deadline passes. Returns `true`
    /// if the task settled.
    pub fn wait_until(&self, deadline: Instant) -> bool {
        let mut slot = self.slot.lock();
        match *slot {
            Slot::Pending => match self.rx.recv_deadline(deadline) {
                Ok(outcome) => {
                    *slot = Slot::Ready(outcome);
                    true
                }
                Err(RecvTimeoutError::Timeout) => false,
                Err(RecvTimeoutError::Disconnected) => {
                    *slot = Slot::Broken;
                    true
                }
            },
            _ => true,
        }
    }

    /// Whether the task has settled, without blocking.
    pub fn is_ready(&self) -> bool {
        let mut slot = self.slot.lock();
        if let Slot::Pending = *slot {
            match self.rx.try_recv() {
                Ok(outcome) => *slot = Slot::Ready(outcome),
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => *slot = Slot::Broken,
            }
        }
        !matches!(*slot, Slot::Pending)
    }

    /// Block until the task settles and return its result.
    ///
    /// A panicking task surfaces as [`Error::TaskPanic`] carrying the
    /// original payload; a task discarded before execution surfaces as
    /// [`Error::BrokenPromise`].
    pub fn get(self) -> Result<T> {
        self.wait();
        match self.slot.into_inner() {
            Slot::Ready(Ok(value)) => Ok(value),
            Slot::Ready(Err(payload)) => Err(Error::TaskPanic(TaskFailed::from_payload(payload))),
            Slot::Broken | Slot::Pending => Err(Error::BrokenPromise),
        }
    }
}

impl<T> std::fmt::Debug for TaskFuture<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match *self.slot.lock() {
            Slot::Pending => "pending",
            Slot::Ready(_) => "ready",
            Slot::Broken => "broken",
        };
        f.debug_struct("TaskFuture").field("state", &state).finish()
    }
}

/// An ordered group of [`TaskFuture`]s, produced by the `submit_blocks`,
/// `submit_loop`, and `submit_sequence` families.
#[derive(Debug)]
pub struct MultiFuture<T> {
    futures: Vec<TaskFuture<T>>,
}

impl<T> MultiFuture<T> {
    /// Create an empty group.
    pub fn new() -> Self {
        Self {
            futures: Vec::new(),
        }
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            futures: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, future: TaskFuture<T>) {
        self.futures.push(future);
    }

    /// The number of futures in the group.
    pub fn len(&self) -> usize {
        self.futures.len()
    }

    /// Whether the group is empty.
    pub fn is_empty(&self) -> bool {
        self.futures.is_empty()
    }

    /// How many of the futures have settled.
    pub fn ready_count(&self) -> usize {
        self.futures.iter().filter(|f| f.is_ready()).count()
    }

    /// Block until every future has settled.
    pub fn wait(&self) {
        for future in &self.futures {
            future.wait();
        }
    }

    /// Block until every future settles or the shared time budget runs out.
    /// Returns `true` if all futures settled in time.
    pub fn wait_for(&self, timeout: Duration) -> bool {
        self.wait_until(Instant::now() + timeout)
    }

    /// Block until every future settles or the deadline passes. Returns
    /// `true` if all futures settled in time.
    pub fn wait_until(&self, deadline: Instant) -> bool {
        for future in &self.futures {
            if !future.wait_until(deadline) {
                return false;
            }
        }
        true
    }

    /// Block until every future settles and collect the results in
    /// submission order. The first failure wins; remaining results are
    /// discarded.
    pub fn get_all(self) -> Result<Vec<T>> {
        self.futures.into_iter().map(TaskFuture::get).collect()
    }
}

impl<T> Default for MultiFuture<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::ops::Deref for MultiFuture<T> {
    type Target = [TaskFuture<T>];

    fn deref(&self) -> &Self::Target {
        &self.futures
    }
}

impl<T> FromIterator<TaskFuture<T>> for MultiFuture<T> {
    fn from_iter<I: IntoIterator<Item = TaskFuture<T>>>(iter: I) -> Self {
        Self {
            futures: iter.into_iter().collect(),
        }
    }
}

impl<T> IntoIterator for MultiFuture<T> {
    type Item = TaskFuture<T>;
    type IntoIter = std::vec::IntoIter<TaskFuture<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.futures.into_iter()
    }
}
