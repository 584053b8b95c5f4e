//! Convenience re-exports for common usage.
//!
//! ```
//! use threadwell::prelude::*;
//!
//! let pool = ThreadPool::with_threads(2).unwrap();
//! let future = pool.submit_task_with_priority(|| 1 + 1, Priority::HIGH);
//! assert_eq!(future.get().unwrap(), 2);
//! ```

pub use crate::config::{Config, ConfigBuilder};
pub use crate::error::{Error, Result};
pub use crate::future::{MultiFuture, TaskFuture};
pub use crate::pool::{Priority, ThreadPool};
