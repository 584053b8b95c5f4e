//! Pool configuration and its builder.

use crate::error::{Error, Result};
use std::sync::Arc;

/// A callback run inside a worker thread, shared between all workers.
pub type ThreadCallback = Arc<dyn Fn() + Send + Sync + 'static>;

/// Pool configuration.
///
/// The three `enable_*` toggles select the optional behaviors at
/// construction time: priority-ordered dequeueing, cooperative pausing, and
/// the wait-deadlock guard. All are enabled by default.
#[derive(Clone)]
pub struct Config {
    /// Number of worker threads. `None` resolves to the number of logical
    /// CPUs at construction time.
    pub num_threads: Option<usize>,
    /// Order the queue by task priority instead of FIFO.
    pub enable_priority: bool,
    /// Allow `pause()`/`unpause()` to gate dequeueing.
    pub enable_pause: bool,
    /// Fail `wait*` calls made from the pool's own workers instead of
    /// deadlocking.
    pub deadlock_check: bool,
    /// Stack size for worker threads, in bytes.
    pub stack_size: Option<usize>,
    /// Prefix for worker thread names, suffixed with the worker index.
    pub thread_name_prefix: String,
    /// Run once in each worker thread before it executes any tasks.
    pub on_thread_start: Option<ThreadCallback>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            num_threads: None,
            enable_priority: true,
            enable_pause: true,
            deadlock_check: true,
            stack_size: Some(2 * 1024 * 1024),
            thread_name_prefix: "threadwell-worker".to_string(),
            on_thread_start: None,
        }
    }
}

impl Config {
    /// Start building a configuration.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Check this configuration for invalid values.
    pub fn validate(&self) -> Result<()> {
        if let Some(n) = self.num_threads {
            if n == 0 {
                return Err(Error::config("num_threads must be > 0"));
            }
            if n > 1024 {
                return Err(Error::config("num_threads too large (max 1024)"));
            }
        }

        if self.thread_name_prefix.is_empty() {
            return Err(Error::config("thread_name_prefix must not be empty"));
        }

        Ok(())
    }

    /// Resolve the worker thread count, probing hardware concurrency when
    /// no explicit count was given. Always at least 1.
    pub fn worker_threads(&self) -> usize {
        self.num_threads.unwrap_or_else(num_cpus::get).max(1)
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("num_threads", &self.num_threads)
            .field("enable_priority", &self.enable_priority)
            .field("enable_pause", &self.enable_pause)
            .field("deadlock_check", &self.deadlock_check)
            .field("stack_size", &self.stack_size)
            .field("thread_name_prefix", &self.thread_name_prefix)
            .field("on_thread_start", &self.on_thread_start.is_some())
            .finish()
    }
}

/// Builder for [`Config`].
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a builder with default values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Set the number of worker threads.
    pub fn num_threads(mut self, n: usize) -> Self {
        self.config.num_threads = Some(n);
        self
    }

    /// Enable or disable priority-ordered dequeueing.
    pub fn enable_priority(mut self, enable: bool) -> Self {
        self.config.enable_priority = enable;
        self
    }

    /// Enable or disable cooperative pausing.
    pub fn enable_pause(mut self, enable: bool) -> Self {
        self.config.enable_pause = enable;
        self
    }

    /// Enable or disable the wait-deadlock guard.
    pub fn deadlock_check(mut self, enable: bool) -> Self {
        self.config.deadlock_check = enable;
        self
    }

    /// Set the worker thread stack size in bytes.
    pub fn stack_size(mut self, size: usize) -> Self {
        self.config.stack_size = Some(size);
        self
    }

    /// Set the worker thread name prefix.
    pub fn thread_name_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.config.thread_name_prefix = prefix.into();
        self
    }

    /// Set a callback run once in each worker thread before it executes any
    /// tasks. A panic inside the callback is a contract violation and
    /// terminates the worker.
    pub fn on_thread_start<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.config.on_thread_start = Some(Arc::new(f));
        self
    }

    /// Validate and produce the configuration.
    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_zero_threads_rejected() {
        let result = Config::builder().num_threads(0).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_too_many_threads_rejected() {
        let result = Config::builder().num_threads(4096).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_worker_threads_resolution() {
        let config = Config::builder().num_threads(3).build().unwrap();
        assert_eq!(config.worker_threads(), 3);

        let config = Config::default();
        assert!(config.worker_threads() >= 1);
    }
}
