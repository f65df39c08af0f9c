//! Configuration constants and executor settings
//!
//! This module contains tunable parameters that affect runtime behavior,
//! particularly around waiter limits, pool sizing and saturation handling.

use std::time::Duration;

use crate::error::{Error, Result};

/// Maximum number of threads that may block on a single future at once
///
/// A wait that would push the count past this limit fails with
/// [`Error::TooManyWaiters`] instead of blocking.
pub const MAX_WAITERS: usize = i16::MAX as usize;

/// Number of workers kept alive even when idle
pub const DEFAULT_CORE_THREADS: usize = 4;

/// Upper bound on workers, reached only once the queue is full
pub const DEFAULT_MAX_THREADS: usize = 8;

/// Period of the pool occupancy report
///
/// The report is a diagnostic side channel; it reads counters only and never
/// touches a future's state.
pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(1);

/// Prefix for worker thread names; workers are named `<prefix>-<n>`
pub const DEFAULT_THREAD_NAME_PREFIX: &str = "deferred-worker";

/// What `submit` does when both the queue and the pool are at capacity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaturationPolicy {
    /// Fail the submission with [`Error::Rejected`]
    #[default]
    Reject,
    /// Drop the new work; its future completes as cancelled
    Discard,
    /// Drop the oldest queued work (cancelling its future) and retry
    DiscardOldest,
    /// Run the work inline on the submitting thread
    CallerRuns,
}

/// Settings for an [`Executor`](crate::executor::Executor)
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub core_threads: usize,
    pub max_threads: usize,
    /// How long a worker above `core_threads` waits for work before exiting
    pub keep_alive: Duration,
    /// `None` means unbounded
    pub queue_capacity: Option<usize>,
    pub policy: SaturationPolicy,
    /// `None` disables the periodic report
    pub report_interval: Option<Duration>,
    pub thread_name_prefix: String,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            core_threads: DEFAULT_CORE_THREADS,
            max_threads: DEFAULT_MAX_THREADS,
            keep_alive: Duration::ZERO,
            queue_capacity: None,
            policy: SaturationPolicy::default(),
            report_interval: Some(DEFAULT_REPORT_INTERVAL),
            thread_name_prefix: DEFAULT_THREAD_NAME_PREFIX.to_string(),
        }
    }
}

impl ExecutorConfig {
    /// Create the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Size the pool from the number of available CPUs
    pub fn per_cpu() -> Self {
        let cpus = num_cpus::get().max(1);
        Self::default().core_threads(cpus).max_threads(cpus * 2)
    }

    pub fn core_threads(mut self, n: usize) -> Self {
        self.core_threads = n;
        self
    }

    pub fn max_threads(mut self, n: usize) -> Self {
        self.max_threads = n;
        self
    }

    pub fn keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    /// Bound the work queue
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = Some(capacity);
        self
    }

    pub fn unbounded_queue(mut self) -> Self {
        self.queue_capacity = None;
        self
    }

    pub fn policy(mut self, policy: SaturationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn report_interval(mut self, interval: Duration) -> Self {
        self.report_interval = Some(interval);
        self
    }

    /// Turn off the periodic pool report
    pub fn without_report(mut self) -> Self {
        self.report_interval = None;
        self
    }

    pub fn thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Check the settings for consistency
    pub fn validate(&self) -> Result<()> {
        if self.max_threads == 0 {
            return Err(Error::InvalidConfig(
                "max_threads must be at least 1".to_string(),
            ));
        }
        if self.max_threads < self.core_threads {
            return Err(Error::InvalidConfig(format!(
                "max_threads ({}) is below core_threads ({})",
                self.max_threads, self.core_threads
            )));
        }
        if self.report_interval == Some(Duration::ZERO) {
            return Err(Error::InvalidConfig(
                "report_interval must be non-zero".to_string(),
            ));
        }
        if self.thread_name_prefix.is_empty() {
            return Err(Error::InvalidConfig(
                "thread_name_prefix must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
