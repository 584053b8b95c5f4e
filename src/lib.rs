//! threadwell - a task-pool scheduler
//!
//! A fixed (but resizable) set of worker threads executing caller-supplied
//! tasks from a shared queue, with optional task priority, cooperative
//! pausing, and safe bulk-wait semantics.
//!
//! # Quick Start
//!
//! ```
//! use threadwell::ThreadPool;
//!
//! let pool = ThreadPool::new().unwrap();
//!
//! // Fire-and-forget, synchronized by wait():
//! pool.detach_task(|| println!("hello from a worker"));
//! pool.wait().unwrap();
//!
//! // Future-returning submission:
//! let future = pool.submit_task(|| (1..=10).sum::<i32>());
//! assert_eq!(future.get().unwrap(), 55);
//!
//! // Parallelize a loop over [0, 1000) in at most thread_count blocks:
//! let squares = pool.submit_blocks(0, 1000, |start, end| {
//!     (start..end).map(|i| i * i).sum::<usize>()
//! }, 0);
//! let total: usize = squares.get_all().unwrap().into_iter().sum();
//! assert_eq!(total, (0..1000usize).map(|i| i * i).sum());
//! ```
//!
//! # Features
//!
//! - **Priority scheduling**: highest-priority-first dequeueing, FIFO among
//!   equal priorities
//! - **Pausing**: temporarily stop workers from picking up new tasks
//! - **Bulk waits**: block until the pool drains, with timed variants
//! - **Deadlock guard**: `wait*` from a pool's own worker fails fast
//! - **Range decomposition**: block, per-index, and per-task splitting of
//!   index ranges
//!
//! All three optional behaviors are selected per pool through [`Config`].

#![warn(missing_docs, missing_debug_implementations)]

pub mod config;
pub mod error;
pub mod future;
pub mod partition;
pub mod pool;
pub mod prelude;

pub use config::{Config, ConfigBuilder};
pub use error::{Error, Result, TaskFailed};
pub use future::{MultiFuture, TaskFuture};
pub use partition::Blocks;
pub use pool::{Priority, ThreadPool, WorkerStats};
