//! Pool statistics and the periodic occupancy report
//!
//! The counters here are plain atomics updated by the executor; reading them
//! never takes a lock that a future's completion path also takes.

use std::io;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};

/// Live counters maintained by the executor
#[derive(Debug, Default)]
pub(crate) struct PoolCounters {
    pub(crate) pool_size: AtomicUsize,
    pub(crate) largest_pool_size: AtomicUsize,
    pub(crate) active: AtomicUsize,
    pub(crate) completed: AtomicU64,
    pub(crate) submitted: AtomicU64,
}

impl PoolCounters {
    /// Reserve a worker slot if the pool is below `limit`
    pub(crate) fn try_reserve_worker(&self, limit: usize) -> bool {
        let mut current = self.pool_size.load(Ordering::Acquire);
        while current < limit {
            match self.pool_size.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    self.largest_pool_size
                        .fetch_max(current + 1, Ordering::Relaxed);
                    return true;
                }
                Err(actual) => current = actual,
            }
        }
        false
    }

    /// Give up a worker slot, but only while the pool stays above `floor`
    pub(crate) fn try_retire_worker(&self, floor: usize) -> bool {
        let mut current = self.pool_size.load(Ordering::Acquire);
        while current > floor {
            match self.pool_size.compare_exchange_weak(
                current,
                current - 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
        false
    }

    pub(crate) fn release_worker(&self) {
        self.pool_size.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Point-in-time view of an executor's pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolStats {
    pub core_threads: usize,
    pub max_threads: usize,
    pub keep_alive: Duration,
    /// Workers currently alive
    pub pool_size: usize,
    /// Most workers ever alive at once
    pub largest_pool_size: usize,
    /// Workers currently running a task
    pub active: usize,
    /// Tasks waiting in the queue
    pub queued: usize,
    pub completed: u64,
    pub submitted: u64,
    pub is_shutdown: bool,
}

impl PoolStats {
    pub(crate) fn capture(
        counters: &PoolCounters,
        core_threads: usize,
        max_threads: usize,
        keep_alive: Duration,
        queued: usize,
        is_shutdown: bool,
    ) -> Self {
        Self {
            core_threads,
            max_threads,
            keep_alive,
            pool_size: counters.pool_size.load(Ordering::Relaxed),
            largest_pool_size: counters.largest_pool_size.load(Ordering::Relaxed),
            active: counters.active.load(Ordering::Relaxed),
            queued,
            completed: counters.completed.load(Ordering::Relaxed),
            submitted: counters.submitted.load(Ordering::Relaxed),
            is_shutdown,
        }
    }

    fn log(&self) {
        tracing::debug!(
            active = self.active,
            queued = self.queued,
            pool_size = self.pool_size,
            largest_pool_size = self.largest_pool_size,
            core = self.core_threads,
            max = self.max_threads,
            completed = self.completed,
            submitted = self.submitted,
            keep_alive_ms = self.keep_alive.as_millis() as u64,
            "executor pool report"
        );
    }
}

/// Background thread that logs a [`PoolStats`] snapshot every interval
///
/// Owned by one executor and stopped with it.
pub(crate) struct Reporter {
    stop: Sender<()>,
    handle: thread::JoinHandle<()>,
}

impl Reporter {
    pub(crate) fn start<F>(name: String, interval: Duration, snapshot: F) -> io::Result<Self>
    where
        F: Fn() -> PoolStats + Send + 'static,
    {
        let (stop, stopped) = bounded::<()>(1);
        let handle = thread::Builder::new().name(name).spawn(move || {
            tracing::debug!(interval_ms = interval.as_millis() as u64, "pool reporter started");
            loop {
                match stopped.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => snapshot().log(),
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            tracing::debug!("pool reporter stopped");
        })?;

        Ok(Self { stop, handle })
    }

    /// Signal the thread and wait for it to exit
    pub(crate) fn stop(self) {
        let Reporter { stop, handle } = self;
        let _ = stop.try_send(());
        drop(stop);
        if handle.thread().id() != thread::current().id() {
            let _ = handle.join();
        }
    }
}
