//! The task pool: worker lifecycle, submission, pausing, and waiting.

pub mod registry;

mod queue;
mod task;
mod worker;

pub use registry::PoolId;
pub use task::Priority;
pub use worker::WorkerStats;

use self::queue::TaskQueue;
use self::task::Task;
use self::worker::WorkerHandle;
use crate::config::{Config, ThreadCallback};
use crate::error::{Error, Result};
use crate::future::{MultiFuture, TaskFuture};
use crate::partition::Blocks;
use parking_lot::{Condvar, Mutex};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::ThreadId;
use std::time::{Duration, Instant};

/// State shared between the pool handle and its workers.
///
/// One mutex guards everything; two condvars carry the two signals: tasks
/// becoming available (or pause/stop changing) for workers, and the
/// termination predicate becoming true for `wait*` callers.
pub(crate) struct Shared {
    pub(crate) state: Mutex<PoolState>,
    pub(crate) task_available: Condvar,
    pub(crate) tasks_done: Condvar,
    pub(crate) idle_ns: AtomicU64,
}

pub(crate) struct PoolState {
    pub(crate) queue: TaskQueue,
    pub(crate) tasks_running: usize,
    pub(crate) paused: bool,
    pub(crate) waiting: bool,
    pub(crate) workers_running: bool,
    pub(crate) cleanup: Option<ThreadCallback>,
}

impl PoolState {
    /// The termination predicate observed by `wait*` callers.
    pub(crate) fn done(&self) -> bool {
        self.tasks_running == 0 && (self.paused || self.queue.is_empty())
    }

    /// Whether a worker may dequeue right now.
    pub(crate) fn has_ready_task(&self) -> bool {
        !self.paused && !self.queue.is_empty()
    }
}

/// A fixed-size (but resizable) pool of worker threads executing queued
/// tasks.
///
/// Tasks are either *detached* (fire-and-forget, synchronize via
/// [`wait`](ThreadPool::wait)) or *submitted* (returning a
/// [`TaskFuture`] for the result). Loops over index ranges can be
/// decomposed into a bounded number of tasks with the `*_blocks`, `*_loop`,
/// and `*_sequence` families.
///
/// # Example
///
/// ```
/// use threadwell::ThreadPool;
///
/// let pool = ThreadPool::with_threads(4).unwrap();
/// let future = pool.submit_task(|| 21 * 2);
/// assert_eq!(future.get().unwrap(), 42);
/// ```
pub struct ThreadPool {
    shared: Arc<Shared>,
    workers: Vec<WorkerHandle>,
    thread_count: usize,
    id: PoolId,
    config: Config,
}

impl ThreadPool {
    /// Create a pool with default configuration: one worker per logical
    /// CPU, priority, pause, and the deadlock check all enabled.
    pub fn new() -> Result<Self> {
        Self::with_config(Config::default())
    }

    /// Create a pool with the given number of workers and otherwise
    /// default configuration. A count of zero resolves to the number of
    /// logical CPUs.
    pub fn with_threads(num_threads: usize) -> Result<Self> {
        let mut config = Config::default();
        if num_threads > 0 {
            config.num_threads = Some(num_threads);
        }
        Self::with_config(config)
    }

    /// Create a pool from a full [`Config`].
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate()?;
        let thread_count = config.worker_threads();

        let shared = Arc::new(Shared {
            state: Mutex::new(PoolState {
                queue: TaskQueue::new(config.enable_priority),
                tasks_running: 0,
                paused: false,
                waiting: false,
                workers_running: false,
                cleanup: None,
            }),
            task_available: Condvar::new(),
            tasks_done: Condvar::new(),
            idle_ns: AtomicU64::new(0),
        });

        let mut pool = Self {
            shared,
            workers: Vec::new(),
            thread_count,
            id: PoolId::next(),
            config,
        };
        pool.create_workers()?;
        Ok(pool)
    }

    // ------------------------------------------------------------------
    // Submission
    // ------------------------------------------------------------------

    /// Enqueue a fire-and-forget task at normal priority. A panic inside
    /// the task is caught and discarded by the executing worker; use
    /// [`wait`](ThreadPool::wait) to synchronize with its completion.
    pub fn detach_task<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.detach_task_with_priority(f, Priority::NORMAL);
    }

    /// Enqueue a fire-and-forget task with an explicit priority. The
    /// priority only affects dequeue order when the pool was configured
    /// with priority enabled.
    pub fn detach_task_with_priority<F>(&self, f: F, priority: Priority)
    where
        F: FnOnce() + Send + 'static,
    {
        self.shared.state.lock().queue.push(Task::new(f, priority));
        self.shared.task_available.notify_one();
    }

    /// Enqueue a task at normal priority and return a future for its
    /// result. A panic inside the task is captured and delivered through
    /// the future.
    pub fn submit_task<F, R>(&self, f: F) -> TaskFuture<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        self.submit_task_with_priority(f, Priority::NORMAL)
    }

    /// Enqueue a task with an explicit priority and return a future for
    /// its result.
    pub fn submit_task_with_priority<F, R>(&self, f: F, priority: Priority) -> TaskFuture<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let (tx, rx) = crossbeam_channel::bounded(1);
        self.detach_task_with_priority(
            move || {
                let outcome = catch_unwind(AssertUnwindSafe(f));
                let _ = tx.send(outcome);
            },
            priority,
        );
        TaskFuture::new(rx)
    }

    // ------------------------------------------------------------------
    // Range decomposition
    // ------------------------------------------------------------------

    /// Split `[first, end)` into at most `num_blocks` contiguous blocks
    /// (zero means the thread count) and detach one task per block, each
    /// calling `block(start, end)` once. An empty range detaches nothing.
    pub fn detach_blocks<F>(&self, first: usize, end: usize, block: F, num_blocks: usize)
    where
        F: Fn(usize, usize) + Send + Sync + 'static,
    {
        self.detach_blocks_with_priority(first, end, block, num_blocks, Priority::NORMAL);
    }

    /// [`detach_blocks`](ThreadPool::detach_blocks) with an explicit
    /// priority for every block task.
    pub fn detach_blocks_with_priority<F>(
        &self,
        first: usize,
        end: usize,
        block: F,
        num_blocks: usize,
        priority: Priority,
    ) where
        F: Fn(usize, usize) + Send + Sync + 'static,
    {
        let block = Arc::new(block);
        for (start, stop) in self.partition(first, end, num_blocks).iter() {
            let block = block.clone();
            self.detach_task_with_priority(move || block(start, stop), priority);
        }
    }

    /// Split `[first, end)` into blocks and submit one task per block,
    /// returning the block results as a [`MultiFuture`] in block order.
    pub fn submit_blocks<F, R>(
        &self,
        first: usize,
        end: usize,
        block: F,
        num_blocks: usize,
    ) -> MultiFuture<R>
    where
        F: Fn(usize, usize) -> R + Send + Sync + 'static,
        R: Send + 'static,
    {
        self.submit_blocks_with_priority(first, end, block, num_blocks, Priority::NORMAL)
    }

    /// [`submit_blocks`](ThreadPool::submit_blocks) with an explicit
    /// priority for every block task.
    pub fn submit_blocks_with_priority<F, R>(
        &self,
        first: usize,
        end: usize,
        block: F,
        num_blocks: usize,
        priority: Priority,
    ) -> MultiFuture<R>
    where
        F: Fn(usize, usize) -> R + Send + Sync + 'static,
        R: Send + 'static,
    {
        let blocks = self.partition(first, end, num_blocks);
        let block = Arc::new(block);
        let mut futures = MultiFuture::with_capacity(blocks.num_blocks());
        for (start, stop) in blocks.iter() {
            let block = block.clone();
            futures.push(self.submit_task_with_priority(move || block(start, stop), priority));
        }
        futures
    }

    /// Split `[first, end)` into blocks and detach one task per block that
    /// calls `loop_fn(i)` once per index in its block. Bounds the number of
    /// queued tasks to the block count while still visiting every index.
    pub fn detach_loop<F>(&self, first: usize, end: usize, loop_fn: F, num_blocks: usize)
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.detach_loop_with_priority(first, end, loop_fn, num_blocks, Priority::NORMAL);
    }

    /// [`detach_loop`](ThreadPool::detach_loop) with an explicit priority
    /// for every block task.
    pub fn detach_loop_with_priority<F>(
        &self,
        first: usize,
        end: usize,
        loop_fn: F,
        num_blocks: usize,
        priority: Priority,
    ) where
        F: Fn(usize) + Send + Sync + 'static,
    {
        let loop_fn = Arc::new(loop_fn);
        for (start, stop) in self.partition(first, end, num_blocks).iter() {
            let loop_fn = loop_fn.clone();
            self.detach_task_with_priority(
                move || {
                    for i in start..stop {
                        loop_fn(i);
                    }
                },
                priority,
            );
        }
    }

    /// Split `[first, end)` into blocks and submit one task per block that
    /// calls `loop_fn(i)` once per index in its block. The returned group
    /// resolves when every block has finished.
    pub fn submit_loop<F>(
        &self,
        first: usize,
        end: usize,
        loop_fn: F,
        num_blocks: usize,
    ) -> MultiFuture<()>
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.submit_loop_with_priority(first, end, loop_fn, num_blocks, Priority::NORMAL)
    }

    /// [`submit_loop`](ThreadPool::submit_loop) with an explicit priority
    /// for every block task.
    pub fn submit_loop_with_priority<F>(
        &self,
        first: usize,
        end: usize,
        loop_fn: F,
        num_blocks: usize,
        priority: Priority,
    ) -> MultiFuture<()>
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        let blocks = self.partition(first, end, num_blocks);
        let loop_fn = Arc::new(loop_fn);
        let mut futures = MultiFuture::with_capacity(blocks.num_blocks());
        for (start, stop) in blocks.iter() {
            let loop_fn = loop_fn.clone();
            futures.push(self.submit_task_with_priority(
                move || {
                    for i in start..stop {
                        loop_fn(i);
                    }
                },
                priority,
            ));
        }
        futures
    }

    /// Detach one task per index in `[first, end)`, with no partitioning.
    pub fn detach_sequence<F>(&self, first: usize, end: usize, sequence: F)
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.detach_sequence_with_priority(first, end, sequence, Priority::NORMAL);
    }

    /// [`detach_sequence`](ThreadPool::detach_sequence) with an explicit
    /// priority for every task.
    pub fn detach_sequence_with_priority<F>(
        &self,
        first: usize,
        end: usize,
        sequence: F,
        priority: Priority,
    ) where
        F: Fn(usize) + Send + Sync + 'static,
    {
        let sequence = Arc::new(sequence);
        for i in first..end {
            let sequence = sequence.clone();
            self.detach_task_with_priority(move || sequence(i), priority);
        }
    }

    /// Submit one task per index in `[first, end)`, with no partitioning,
    /// so each index is individually awaitable through the returned group.
    pub fn submit_sequence<F, R>(&self, first: usize, end: usize, sequence: F) -> MultiFuture<R>
    where
        F: Fn(usize) -> R + Send + Sync + 'static,
        R: Send + 'static,
    {
        self.submit_sequence_with_priority(first, end, sequence, Priority::NORMAL)
    }

    /// [`submit_sequence`](ThreadPool::submit_sequence) with an explicit
    /// priority for every task.
    pub fn submit_sequence_with_priority<F, R>(
        &self,
        first: usize,
        end: usize,
        sequence: F,
        priority: Priority,
    ) -> MultiFuture<R>
    where
        F: Fn(usize) -> R + Send + Sync + 'static,
        R: Send + 'static,
    {
        let sequence = Arc::new(sequence);
        let mut futures = MultiFuture::with_capacity(end.saturating_sub(first));
        for i in first..end {
            let sequence = sequence.clone();
            futures.push(self.submit_task_with_priority(move || sequence(i), priority));
        }
        futures
    }

    fn partition(&self, first: usize, end: usize, num_blocks: usize) -> Blocks {
        let num_blocks = if num_blocks == 0 {
            self.thread_count
        } else {
            num_blocks
        };
        Blocks::new(first, end, num_blocks)
    }

    // ------------------------------------------------------------------
    // Pause
    // ------------------------------------------------------------------

    /// Stop workers from dequeueing new tasks. Tasks already running
    /// continue to completion. A no-op unless pause was enabled in the
    /// configuration.
    pub fn pause(&self) {
        if !self.config.enable_pause {
            return;
        }
        self.shared.state.lock().paused = true;
    }

    /// Resume dequeueing. Wakes all parked workers, since several may be
    /// waiting on the same signal and a single wake could starve the rest.
    pub fn unpause(&self) {
        if !self.config.enable_pause {
            return;
        }
        self.shared.state.lock().paused = false;
        self.shared.task_available.notify_all();
    }

    /// Whether the pool is currently paused.
    pub fn is_paused(&self) -> bool {
        self.shared.state.lock().paused
    }

    // ------------------------------------------------------------------
    // Purge / reset / cleanup
    // ------------------------------------------------------------------

    /// Discard every task still waiting in the queue. Running tasks are
    /// unaffected. Futures for purged tasks observe
    /// [`Error::BrokenPromise`] when queried; they never hang.
    pub fn purge(&self) {
        self.shared.state.lock().queue.clear();
    }

    /// Replace the workers with a new set of `num_threads` threads (zero
    /// resolves to the number of logical CPUs). Blocks until currently
    /// running tasks finish; queued tasks are preserved and picked up by
    /// the new workers. The paused state survives the operation. Any
    /// previously set thread-start callback is cleared.
    pub fn reset(&mut self, num_threads: usize) -> Result<()> {
        self.config.on_thread_start = None;
        self.reset_inner(num_threads)
    }

    /// [`reset`](ThreadPool::reset) with a callback run once in each new
    /// worker thread before it executes any tasks.
    pub fn reset_with_init<F>(&mut self, num_threads: usize, init: F) -> Result<()>
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.config.on_thread_start = Some(Arc::new(init));
        self.reset_inner(num_threads)
    }

    fn reset_inner(&mut self, num_threads: usize) -> Result<()> {
        let was_paused = if self.config.enable_pause {
            let mut state = self.shared.state.lock();
            let was_paused = state.paused;
            state.paused = true;
            was_paused
        } else {
            false
        };

        self.wait()?;
        self.destroy_workers();

        self.config.num_threads = if num_threads == 0 {
            None
        } else {
            Some(num_threads)
        };
        self.thread_count = self.config.worker_threads();
        self.shared.idle_ns.store(0, Ordering::Relaxed);
        self.create_workers()?;

        if self.config.enable_pause {
            self.shared.state.lock().paused = was_paused;
        }
        // Wake the new workers so carried-over queued tasks get picked up.
        self.shared.task_available.notify_all();
        Ok(())
    }

    /// Set a callback each worker runs right before its thread exits,
    /// whether through [`reset`](ThreadPool::reset) or pool drop.
    pub fn set_cleanup_fn<F>(&self, f: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.shared.state.lock().cleanup = Some(Arc::new(f));
    }

    // ------------------------------------------------------------------
    // Waiting
    // ------------------------------------------------------------------

    /// Block until no task is running and the queue is empty. While the
    /// pool is paused, only currently running tasks are waited for, since
    /// queued tasks cannot start.
    ///
    /// With the deadlock check enabled, calling this from one of the
    /// pool's own workers fails immediately with
    /// [`Error::WaitDeadlock`].
    pub fn wait(&self) -> Result<()> {
        self.check_wait_deadlock()?;
        let mut state = self.shared.state.lock();
        state.waiting = true;
        while !state.done() {
            self.shared.tasks_done.wait(&mut state);
        }
        state.waiting = false;
        Ok(())
    }

    /// Like [`wait`](ThreadPool::wait), but give up after `timeout`.
    /// Returns `false` on timeout; outstanding work is not cancelled.
    pub fn wait_for(&self, timeout: Duration) -> Result<bool> {
        self.wait_until(Instant::now() + timeout)
    }

    /// Like [`wait`](ThreadPool::wait), but give up at `deadline`.
    /// Returns `false` on timeout; outstanding work is not cancelled.
    pub fn wait_until(&self, deadline: Instant) -> Result<bool> {
        self.check_wait_deadlock()?;
        let mut state = self.shared.state.lock();
        state.waiting = true;
        let mut completed = true;
        while !state.done() {
            if self
                .shared
                .tasks_done
                .wait_until(&mut state, deadline)
                .timed_out()
            {
                completed = state.done();
                break;
            }
        }
        state.waiting = false;
        Ok(completed)
    }

    fn check_wait_deadlock(&self) -> Result<()> {
        if self.config.deadlock_check && registry::current_pool_id() == Some(self.id) {
            return Err(Error::WaitDeadlock);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    /// The number of worker threads.
    pub fn thread_count(&self) -> usize {
        self.thread_count
    }

    /// This pool's unique id, matching
    /// [`registry::current_pool_id`] inside its workers.
    pub fn id(&self) -> PoolId {
        self.id
    }

    /// The number of tasks waiting in the queue.
    pub fn tasks_queued(&self) -> usize {
        self.shared.state.lock().queue.len()
    }

    /// The number of tasks currently executing.
    pub fn tasks_running(&self) -> usize {
        self.shared.state.lock().tasks_running
    }

    /// The total number of unfinished tasks, queued plus running.
    pub fn tasks_total(&self) -> usize {
        let state = self.shared.state.lock();
        state.tasks_running + state.queue.len()
    }

    /// The OS thread ids of the workers.
    pub fn thread_ids(&self) -> Vec<ThreadId> {
        self.workers
            .iter()
            .filter_map(|w| w.thread.as_ref().map(|t| t.thread().id()))
            .collect()
    }

    /// Total time workers have spent parked since construction or the last
    /// [`reset`](ThreadPool::reset).
    pub fn idle_time(&self) -> Duration {
        Duration::from_nanos(self.shared.idle_ns.load(Ordering::Relaxed))
    }

    /// Per-worker execution counters, indexed by worker.
    pub fn worker_stats(&self) -> Vec<WorkerStats> {
        self.workers.iter().map(|w| w.counters.snapshot()).collect()
    }

    // ------------------------------------------------------------------
    // Worker lifecycle
    // ------------------------------------------------------------------

    fn create_workers(&mut self) -> Result<()> {
        {
            let mut state = self.shared.state.lock();
            state.tasks_running = self.thread_count;
            state.workers_running = true;
        }

        for index in 0..self.thread_count {
            let handle = worker::spawn(
                index,
                self.id,
                self.shared.clone(),
                &self.config.thread_name_prefix,
                self.config.stack_size,
                self.config.on_thread_start.clone(),
            );
            match handle {
                Ok(handle) => self.workers.push(handle),
                Err(e) => {
                    self.destroy_workers();
                    self.shared.state.lock().tasks_running = 0;
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    fn destroy_workers(&mut self) {
        self.shared.state.lock().workers_running = false;
        self.shared.task_available.notify_all();
        for worker in &mut self.workers {
            if let Some(thread) = worker.thread.take() {
                let _ = thread.join();
            }
        }
        self.workers.clear();
    }
}

impl Drop for ThreadPool {
    /// Waits for outstanding tasks, then stops and joins the workers.
    /// Tasks still queued while the pool is paused are dropped unexecuted;
    /// their futures observe [`Error::BrokenPromise`].
    fn drop(&mut self) {
        if self.workers.is_empty() {
            return;
        }
        let _ = self.wait();
        self.destroy_workers();
    }
}

impl std::fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadPool")
            .field("id", &self.id)
            .field("thread_count", &self.thread_count)
            .field("tasks_total", &self.tasks_total())
            .finish()
    }
}
