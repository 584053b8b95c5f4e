//! Error types for the pool.

use std::any::Any;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by pool construction, waiting, and task futures.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid configuration.
    #[error("config error: {0}")]
    Config(String),

    /// A worker thread could not be spawned.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(String),

    /// A `wait*` call was made from a worker thread of the same pool.
    ///
    /// A worker can never legally wait for its own pool to drain, since the
    /// pool cannot finish while that worker is occupied by the waiting task.
    #[error("wait called from a worker thread of the same pool")]
    WaitDeadlock,

    /// The task backing a future was discarded before it could run, either
    /// by [`purge`](crate::ThreadPool::purge) or because the pool was
    /// dropped with the task still queued.
    #[error("task was discarded before it could run")]
    BrokenPromise,

    /// A task submitted via `submit_*` panicked while executing.
    #[error("task panicked: {0}")]
    TaskPanic(TaskFailed),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    pub(crate) fn spawn<S: Into<String>>(msg: S) -> Self {
        Error::Spawn(msg.into())
    }
}

/// The captured outcome of a panicking task.
///
/// Holds the raw panic payload so callers can recover the original value
/// (for example with [`into_panic`](TaskFailed::into_panic) followed by a
/// downcast), plus a best-effort message for display.
pub struct TaskFailed {
    message: String,
    payload: Box<dyn Any + Send + 'static>,
}

impl TaskFailed {
    pub(crate) fn from_payload(payload: Box<dyn Any + Send + 'static>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };

        Self { message, payload }
    }

    /// The panic message, if the payload was a string; a placeholder
    /// otherwise.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Consume this failure and return the original panic payload.
    pub fn into_panic(self) -> Box<dyn Any + Send + 'static> {
        self.payload
    }

    /// Re-raise the original panic on the current thread.
    pub fn resume(self) -> ! {
        std::panic::resume_unwind(self.payload)
    }
}

impl std::fmt::Debug for TaskFailed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskFailed")
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

impl std::fmt::Display for TaskFailed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_message_extraction() {
        let failed = TaskFailed::from_payload(Box::new("boom"));
        assert_eq!(failed.message(), "boom");

        let failed = TaskFailed::from_payload(Box::new(String::from("owned boom")));
        assert_eq!(failed.message(), "owned boom");

        let failed = TaskFailed::from_payload(Box::new(42u32));
        assert_eq!(failed.message(), "unknown panic payload");
    }

    #[test]
    fn test_payload_round_trip() {
        let failed = TaskFailed::from_payload(Box::new(1234u64));
        let payload = failed.into_panic();
        assert_eq!(*payload.downcast::<u64>().unwrap(), 1234);
    }
}
