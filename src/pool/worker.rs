//! The worker thread loop.

use super::{registry, PoolId, Shared};
use crate::config::ThreadCallback;
use crate::error::{Error, Result};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

/// A snapshot of one worker's execution counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// Tasks this worker has finished executing.
    pub tasks_executed: u64,
    /// Of those, tasks that ended in a swallowed panic (detached tasks
    /// only; submitted tasks capture their panic in the future instead).
    pub tasks_panicked: u64,
}

pub(crate) struct WorkerCounters {
    tasks_executed: AtomicU64,
    tasks_panicked: AtomicU64,
}

impl WorkerCounters {
    fn new() -> Self {
        Self {
            tasks_executed: AtomicU64::new(0),
            tasks_panicked: AtomicU64::new(0),
        }
    }

    pub(crate) fn snapshot(&self) -> WorkerStats {
        WorkerStats {
            tasks_executed: self.tasks_executed.load(Ordering::Relaxed),
            tasks_panicked: self.tasks_panicked.load(Ordering::Relaxed),
        }
    }
}

pub(crate) struct WorkerHandle {
    pub(crate) thread: Option<JoinHandle<()>>,
    pub(crate) counters: Arc<WorkerCounters>,
}

pub(crate) fn spawn(
    index: usize,
    pool_id: PoolId,
    shared: Arc<Shared>,
    name_prefix: &str,
    stack_size: Option<usize>,
    init: Option<ThreadCallback>,
) -> Result<WorkerHandle> {
    let counters = Arc::new(WorkerCounters::new());
    let worker_counters = counters.clone();

    let mut builder = thread::Builder::new().name(format!("{name_prefix}-{index}"));
    if let Some(stack_size) = stack_size {
        builder = builder.stack_size(stack_size);
    }

    let thread = builder
        .spawn(move || run(index, pool_id, shared, init, worker_counters))
        .map_err(|e| Error::spawn(format!("worker {index}: {e}")))?;

    Ok(WorkerHandle {
        thread: Some(thread),
        counters,
    })
}

// The dequeue/execute loop. `tasks_running` is decremented at the top of
// every iteration, balancing the per-pool preset to `thread_count` at
// startup and the increment taken before each execution. This keeps the
// wait predicate accurate while a worker sits between two tasks.
fn run(
    index: usize,
    pool_id: PoolId,
    shared: Arc<Shared>,
    init: Option<ThreadCallback>,
    counters: Arc<WorkerCounters>,
) {
    registry::enter(pool_id, index);
    if let Some(init) = init {
        init();
    }

    let mut state = shared.state.lock();
    loop {
        state.tasks_running -= 1;
        if state.waiting && state.done() {
            shared.tasks_done.notify_all();
        }

        let parked_at = Instant::now();
        while state.workers_running && !state.has_ready_task() {
            shared.task_available.wait(&mut state);
        }
        shared
            .idle_ns
            .fetch_add(parked_at.elapsed().as_nanos() as u64, Ordering::Relaxed);

        if !state.workers_running {
            break;
        }

        // The wait condition guarantees a task is available.
        let task = match state.queue.pop() {
            Some(task) => task,
            None => {
                state.tasks_running += 1;
                continue;
            }
        };
        state.tasks_running += 1;
        drop(state);

        if catch_unwind(AssertUnwindSafe(|| task.execute())).is_err() {
            counters.tasks_panicked.fetch_add(1, Ordering::Relaxed);
            eprintln!("[threadwell] worker {index}: task panicked");
        }
        counters.tasks_executed.fetch_add(1, Ordering::Relaxed);

        state = shared.state.lock();
    }

    let cleanup = state.cleanup.clone();
    drop(state);
    if let Some(cleanup) = cleanup {
        cleanup();
    }
    registry::exit();
}
