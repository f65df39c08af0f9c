//! Future-aware thread pool
//!
//! [`Executor`] accepts closures, wraps each one in a [`PromiseTask`] bound to
//! a fresh promise, and returns the matching [`Future`] without blocking.
//!
//! ## Pool sizing
//!
//! A submission first tries to start a new worker while the pool is below
//! `core_threads`. Past that it is queued. When the queue is full the pool
//! grows up to `max_threads`, and only then does the configured
//! [`SaturationPolicy`] decide what happens. Workers above `core_threads`
//! exit after `keep_alive` without work.
//!
//! ## Panic handling
//!
//! A panicking task completes its future with a
//! [`Panicked`](crate::error::Panicked) cause; the worker that ran it keeps
//! serving the queue.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError, RwLock};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender, TrySendError};

use crate::config::{ExecutorConfig, SaturationPolicy};
use crate::error::{is_cancellation, Error, Result};
use crate::future::{lock, Future};
use crate::interrupt::{self, Interrupter};
use crate::report::{PoolCounters, PoolStats, Reporter};
use crate::task::{PromiseTask, Runnable, TaskId};

type Job = Box<dyn Runnable>;

/// State shared between the executor handle and its workers
struct Shared {
    config: ExecutorConfig,
    queue: Receiver<Job>,
    counters: PoolCounters,
    shutdown: AtomicBool,
    /// Set by `shutdown_now`; workers stop clearing their interrupt flag
    stopping: AtomicBool,
    next_worker: AtomicUsize,
    workers: Mutex<HashMap<usize, Interrupter>>,
    live: Mutex<usize>,
    terminated: Condvar,
}

impl Shared {
    fn stats(&self) -> PoolStats {
        PoolStats::capture(
            &self.counters,
            self.config.core_threads,
            self.config.max_threads,
            self.config.keep_alive,
            self.queue.len(),
            self.shutdown.load(Ordering::Acquire),
        )
    }

    fn run_job(&self, job: Job) {
        if !self.stopping.load(Ordering::Acquire) {
            // An interrupt aimed at the previous task must not leak into this one
            interrupt::interrupted();
        }
        self.counters.active.fetch_add(1, Ordering::Relaxed);
        job.run();
        self.counters.active.fetch_sub(1, Ordering::Relaxed);
        self.counters.completed.fetch_add(1, Ordering::Relaxed);
    }

    fn worker_exited(&self) {
        let mut live = lock(&self.live);
        *live -= 1;
        if *live == 0 {
            self.terminated.notify_all();
        }
    }
}

/// Bookkeeping run when a worker thread leaves its loop
struct WorkerExit {
    shared: Arc<Shared>,
    index: usize,
    holds_slot: bool,
}

impl Drop for WorkerExit {
    fn drop(&mut self) {
        if self.holds_slot {
            self.shared.counters.release_worker();
        }
        lock(&self.shared.workers).remove(&self.index);
        self.shared.worker_exited();
        tracing::debug!(worker = self.index, "worker exiting");
    }
}

fn worker_loop(shared: Arc<Shared>, index: usize, first: Option<Job>) {
    let mut exit = WorkerExit {
        shared: shared.clone(),
        index,
        holds_slot: true,
    };
    lock(&shared.workers).insert(index, Interrupter::current());
    tracing::debug!(worker = index, "worker started");

    if let Some(job) = first {
        shared.run_job(job);
    }

    let config = &shared.config;
    loop {
        let job = if shared.counters.pool_size.load(Ordering::Acquire) > config.core_threads {
            match shared.queue.recv_timeout(config.keep_alive) {
                Ok(job) => job,
                Err(RecvTimeoutError::Timeout) => {
                    if !shared.counters.try_retire_worker(config.core_threads) {
                        continue;
                    }
                    // Work queued while retiring must not be stranded
                    if !shared.queue.is_empty()
                        && shared.counters.try_reserve_worker(config.max_threads)
                    {
                        continue;
                    }
                    exit.holds_slot = false;
                    break;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        } else {
            match shared.queue.recv() {
                Ok(job) => job,
                Err(_) => break,
            }
        };
        shared.run_job(job);
    }
}

/// Thread pool that returns a [`Future`] for every submitted task
pub struct Executor {
    shared: Arc<Shared>,
    /// `None` once shut down; dropping it lets workers drain and exit
    sender: RwLock<Option<Sender<Job>>>,
    reporter: Mutex<Option<Reporter>>,
}

impl Executor {
    /// Create an executor; no worker starts until work is submitted
    pub fn new(config: ExecutorConfig) -> Result<Self> {
        config.validate()?;

        let (sender, queue) = match config.queue_capacity {
            Some(capacity) => bounded(capacity),
            None => unbounded(),
        };

        let shared = Arc::new(Shared {
            config,
            queue,
            counters: PoolCounters::default(),
            shutdown: AtomicBool::new(false),
            stopping: AtomicBool::new(false),
            next_worker: AtomicUsize::new(0),
            workers: Mutex::new(HashMap::new()),
            live: Mutex::new(0),
            terminated: Condvar::new(),
        });

        let reporter = match shared.config.report_interval {
            Some(interval) => {
                let source = shared.clone();
                Some(Reporter::start(
                    format!("{}-reporter", shared.config.thread_name_prefix),
                    interval,
                    move || source.stats(),
                )?)
            }
            None => None,
        };

        tracing::info!(
            core = shared.config.core_threads,
            max = shared.config.max_threads,
            queue_capacity = ?shared.config.queue_capacity,
            policy = ?shared.config.policy,
            "executor created"
        );

        Ok(Self {
            shared,
            sender: RwLock::new(Some(sender)),
            reporter: Mutex::new(reporter),
        })
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.shared.config
    }

    /// Submit fallible work; an `Err` or a panic fails the returned future
    pub fn submit<F, T, E>(&self, work: F) -> Result<Future<T>>
    where
        F: FnOnce() -> std::result::Result<T, E> + Send + 'static,
        T: Send + Sync + 'static,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        self.submit_task(PromiseTask::new(work))
    }

    /// Submit work that produces no value
    pub fn submit_runnable<F>(&self, work: F) -> Result<Future<()>>
    where
        F: FnOnce() + Send + 'static,
    {
        self.submit_task(PromiseTask::from_runnable(work, ()))
    }

    /// Submit work whose future succeeds with `value` once it has run
    pub fn submit_with_value<F, T>(&self, work: F, value: T) -> Result<Future<T>>
    where
        F: FnOnce() + Send + 'static,
        T: Send + Sync + 'static,
    {
        self.submit_task(PromiseTask::from_runnable(work, value))
    }

    /// Submit a prepared task
    pub fn submit_task<T: Send + Sync + 'static>(&self, task: PromiseTask<T>) -> Result<Future<T>> {
        let future = task.future();
        self.dispatch(Box::new(task))?;
        Ok(future)
    }

    /// Run work without handing back a future; failures are logged
    pub fn execute<F>(&self, work: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let task = PromiseTask::from_runnable(work, ());
        let id = task.id();
        task.future().add_failure_listener(move |cause| {
            if !is_cancellation(cause) {
                tracing::warn!(task = %id, error = %cause, "executed task failed");
            }
        });
        self.dispatch(Box::new(task))
    }

    fn dispatch(&self, job: Job) -> Result<()> {
        let sender = match self
            .sender
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            Some(sender) => sender.clone(),
            None => return self.reject_after_shutdown(job),
        };
        // A concurrent shutdown may have flipped the flag before taking the sender
        if self.shared.shutdown.load(Ordering::Acquire) {
            return self.reject_after_shutdown(job);
        }

        let counters = &self.shared.counters;
        let config = &self.shared.config;
        counters.submitted.fetch_add(1, Ordering::Relaxed);

        if counters.try_reserve_worker(config.core_threads) {
            return self.spawn_worker(Some(job));
        }

        match sender.try_send(job) {
            Ok(()) => {
                // With zero core threads, queued work still needs a worker
                if counters.pool_size.load(Ordering::Acquire) == 0
                    && counters.try_reserve_worker(1)
                {
                    self.spawn_worker(None)?;
                }
                Ok(())
            }
            Err(TrySendError::Full(job)) => {
                if counters.try_reserve_worker(config.max_threads) {
                    return self.spawn_worker(Some(job));
                }
                self.saturated(sender, job)
            }
            Err(TrySendError::Disconnected(job)) => self.reject_after_shutdown(job),
        }
    }

    /// Start a worker in a slot already reserved by the caller
    fn spawn_worker(&self, first: Option<Job>) -> Result<()> {
        let index = self.shared.next_worker.fetch_add(1, Ordering::Relaxed);
        *lock(&self.shared.live) += 1;

        let shared = self.shared.clone();
        let spawned = thread::Builder::new()
            .name(format!("{}-{}", self.shared.config.thread_name_prefix, index))
            .spawn(move || worker_loop(shared, index, first));

        if let Err(err) = spawned {
            self.shared.counters.release_worker();
            self.shared.worker_exited();
            tracing::error!(error = %err, "failed to spawn worker thread");
            return Err(Error::Spawn(err));
        }
        Ok(())
    }

    fn saturated(&self, sender: Sender<Job>, job: Job) -> Result<()> {
        match self.shared.config.policy {
            SaturationPolicy::Reject => {
                tracing::warn!(task = %job.id(), "rejecting task: queue and pool are saturated");
                Err(Error::Rejected("queue and pool are saturated"))
            }
            SaturationPolicy::Discard => {
                job.abandon();
                Ok(())
            }
            SaturationPolicy::DiscardOldest => {
                let mut job = job;
                loop {
                    match self.shared.queue.try_recv() {
                        Ok(oldest) => oldest.abandon(),
                        // Nothing to evict (e.g. a zero-capacity queue)
                        Err(_) => {
                            job.abandon();
                            return Ok(());
                        }
                    }
                    match sender.try_send(job) {
                        Ok(()) => return Ok(()),
                        Err(TrySendError::Full(back)) | Err(TrySendError::Disconnected(back)) => {
                            job = back
                        }
                    }
                }
            }
            SaturationPolicy::CallerRuns => {
                tracing::debug!(task = %job.id(), "pool saturated, running task on caller thread");
                // Workers must still see the channel close if shutdown happens meanwhile
                drop(sender);
                job.run();
                Ok(())
            }
        }
    }

    fn reject_after_shutdown(&self, job: Job) -> Result<()> {
        match self.shared.config.policy {
            SaturationPolicy::Reject => {
                tracing::warn!(task = %job.id(), "rejecting task: executor is shut down");
                Err(Error::Rejected("executor is shut down"))
            }
            _ => {
                job.abandon();
                Ok(())
            }
        }
    }

    /// Stop accepting work; queued tasks still run
    pub fn shutdown(&self) {
        if self.shared.shutdown.swap(true, Ordering::AcqRel) {
            return;
        }
        tracing::info!("executor shutting down");

        self.sender
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(reporter) = lock(&self.reporter).take() {
            reporter.stop();
        }

        if *lock(&self.shared.live) == 0 {
            self.shared.terminated.notify_all();
        }
    }

    /// Stop accepting work, cancel everything still queued and interrupt
    /// running workers
    ///
    /// Returns the ids of the cancelled tasks.
    pub fn shutdown_now(&self) -> Vec<TaskId> {
        self.shared.stopping.store(true, Ordering::Release);
        self.shutdown();

        let cancelled: Vec<TaskId> = self
            .shared
            .queue
            .try_iter()
            .map(|job| {
                let id = job.id();
                job.abandon();
                id
            })
            .collect();

        let workers: Vec<Interrupter> = lock(&self.shared.workers).values().cloned().collect();
        for worker in workers {
            worker.interrupt();
        }

        tracing::info!(cancelled = cancelled.len(), "executor stopped");
        cancelled
    }

    pub fn is_shutdown(&self) -> bool {
        self.shared.shutdown.load(Ordering::Acquire)
    }

    /// Shut down and every worker has exited
    pub fn is_terminated(&self) -> bool {
        self.is_shutdown() && *lock(&self.shared.live) == 0
    }

    /// Block until terminated or `timeout` elapses; returns whether terminated
    pub fn await_termination(&self, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let mut live = lock(&self.shared.live);
        loop {
            if self.is_shutdown() && *live == 0 {
                return true;
            }
            live = match deadline {
                None => self
                    .shared
                    .terminated
                    .wait(live)
                    .unwrap_or_else(PoisonError::into_inner),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return false;
                    }
                    self.shared
                        .terminated
                        .wait_timeout(live, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
            };
        }
    }

    /// Wait for every future, logging waits that were interrupted
    pub fn sync_all<'a, T, I>(&self, futures: I)
    where
        T: Send + Sync + 'static,
        I: IntoIterator<Item = &'a Future<T>>,
    {
        for future in futures {
            if let Err(err) = future.wait() {
                tracing::warn!(error = %err, "stopped waiting for future");
            }
        }
    }

    /// Snapshot of pool occupancy; never blocks on task execution
    pub fn stats(&self) -> PoolStats {
        self.shared.stats()
    }
}

impl fmt::Debug for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executor")
            .field("config", &self.shared.config)
            .field("stats", &self.stats())
            .finish()
    }
}

impl Drop for Executor {
    fn drop(&mut self) {
        if !self.is_shutdown() {
            tracing::warn!("executor dropped without explicit shutdown");
            self.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::sync::mpsc;

    fn config() -> ExecutorConfig {
        ExecutorConfig::new().without_report()
    }

    /// One worker busy on a gated task and one task queued behind it
    fn saturate(
        executor: &Executor,
    ) -> (Future<()>, Future<u32>, mpsc::Sender<()>) {
        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();

        let blocker = executor
            .submit_runnable(move || {
                started_tx.send(()).unwrap();
                let _ = release_rx.recv();
            })
            .unwrap();
        started_rx.recv_timeout(Duration::from_secs(1)).unwrap();

        let queued = executor.submit(|| Ok::<_, Error>(2)).unwrap();
        (blocker, queued, release_tx)
    }

    #[test]
    fn test_executor_creation() {
        let executor = Executor::new(config()).unwrap();
        let stats = executor.stats();
        assert_eq!(stats.pool_size, 0);
        assert_eq!(stats.core_threads, 4);
        assert!(!stats.is_shutdown);
        executor.shutdown();
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = Executor::new(config().core_threads(3).max_threads(1));
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_submit_returns_value() {
        let executor = Executor::new(config().core_threads(2)).unwrap();

        let future = executor.submit(|| Ok::<_, Error>(21 * 2)).unwrap();
        assert_eq!(future.get().unwrap(), 42);

        let runnable = executor.submit_runnable(|| {}).unwrap();
        assert!(runnable.get().is_ok());

        let with_value = executor.submit_with_value(|| {}, "fixed").unwrap();
        assert_eq!(with_value.get().unwrap(), "fixed");

        executor.shutdown();
        assert!(executor.await_termination(Duration::from_secs(1)));
    }

    #[test]
    fn test_multiple_tasks() {
        let executor = Executor::new(config().core_threads(3)).unwrap();
        let counter = Arc::new(AtomicU32::new(0));

        let futures: Vec<_> = (0..20)
            .map(|i| {
                let counter = counter.clone();
                executor
                    .submit(move || {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Ok::<_, Error>(i)
                    })
                    .unwrap()
            })
            .collect();

        executor.sync_all(&futures);
        let sum: u32 = futures.iter().map(|f| f.get_now().unwrap()).sum();
        assert_eq!(sum, (0..20).sum());
        assert_eq!(counter.load(Ordering::SeqCst), 20);

        executor.shutdown();
        assert!(executor.await_termination(Duration::from_secs(1)));
        assert_eq!(executor.stats().completed, 20);
    }

    #[test]
    fn test_task_panic_isolated() {
        let executor = Executor::new(config().core_threads(1).max_threads(1)).unwrap();

        let panicked = executor
            .submit(|| -> std::result::Result<u32, Error> { panic!("boom") })
            .unwrap();
        let healthy = executor.submit(|| Ok::<_, Error>(1)).unwrap();

        assert!(matches!(panicked.get(), Err(Error::Execution(_))));
        assert_eq!(healthy.get().unwrap(), 1);
        assert_eq!(executor.stats().pool_size, 1);
        executor.shutdown();
    }

    #[test]
    fn test_worker_thread_names() {
        let executor = Executor::new(config().thread_name_prefix("named")).unwrap();
        let name = executor
            .submit(|| Ok::<_, Error>(thread::current().name().map(str::to_string)))
            .unwrap()
            .get()
            .unwrap();
        assert!(name.unwrap().starts_with("named-"));
        executor.shutdown();
    }

    #[test]
    fn test_reject_policy_saturation() {
        let executor = Executor::new(
            config()
                .core_threads(1)
                .max_threads(1)
                .queue_capacity(1)
                .policy(SaturationPolicy::Reject),
        )
        .unwrap();
        let (blocker, queued, release) = saturate(&executor);

        let overflow = executor.submit(|| Ok::<_, Error>(3));
        assert!(matches!(overflow, Err(Error::Rejected(_))));

        release.send(()).unwrap();
        blocker.get().unwrap();
        assert_eq!(queued.get().unwrap(), 2);
        executor.shutdown();
    }

    #[test]
    fn test_caller_runs_policy() {
        let executor = Executor::new(
            config()
                .core_threads(1)
                .max_threads(1)
                .queue_capacity(1)
                .policy(SaturationPolicy::CallerRuns),
        )
        .unwrap();
        let (_blocker, _queued, release) = saturate(&executor);

        let caller = thread::current().id();
        let inline = executor
            .submit(|| Ok::<_, Error>(thread::current().id()))
            .unwrap();
        // Already complete: it ran inside submit
        assert_eq!(inline.get_now(), Some(caller));

        release.send(()).unwrap();
        executor.shutdown();
        assert!(executor.await_termination(Duration::from_secs(1)));
    }

    #[test]
    fn test_discard_policy_cancels_new_work() {
        let executor = Executor::new(
            config()
                .core_threads(1)
                .max_threads(1)
                .queue_capacity(1)
                .policy(SaturationPolicy::Discard),
        )
        .unwrap();
        let (_blocker, queued, release) = saturate(&executor);

        let dropped = executor.submit(|| Ok::<_, Error>(3)).unwrap();
        assert!(dropped.is_cancelled());

        release.send(()).unwrap();
        assert_eq!(queued.get().unwrap(), 2);
        executor.shutdown();
    }

    #[test]
    fn test_discard_oldest_policy() {
        let executor = Executor::new(
            config()
                .core_threads(1)
                .max_threads(1)
                .queue_capacity(1)
                .policy(SaturationPolicy::DiscardOldest),
        )
        .unwrap();
        let (_blocker, oldest, release) = saturate(&executor);

        let newest = executor.submit(|| Ok::<_, Error>(3)).unwrap();
        assert!(oldest.is_cancelled());

        release.send(()).unwrap();
        assert_eq!(newest.get().unwrap(), 3);
        executor.shutdown();
    }

    #[test]
    fn test_pool_grows_past_core_when_queue_full() {
        let executor = Executor::new(
            config()
                .core_threads(1)
                .max_threads(2)
                .queue_capacity(1)
                .keep_alive(Duration::from_millis(20)),
        )
        .unwrap();
        let (blocker, queued, release) = saturate(&executor);

        let extra = executor.submit(|| Ok::<_, Error>(3)).unwrap();
        assert_eq!(extra.get_timeout(Duration::from_secs(1)).unwrap(), 3);
        assert_eq!(executor.stats().largest_pool_size, 2);

        release.send(()).unwrap();
        blocker.get().unwrap();
        queued.get().unwrap();

        // The worker above core retires after keep_alive
        let deadline = Instant::now() + Duration::from_secs(2);
        while executor.stats().pool_size > 1 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(executor.stats().pool_size, 1);
        executor.shutdown();
    }

    #[test]
    fn test_zero_core_threads_still_runs_queued_work() {
        let executor = Executor::new(config().core_threads(0).max_threads(1)).unwrap();
        let future = executor.submit(|| Ok::<_, Error>(5)).unwrap();
        assert_eq!(future.get_timeout(Duration::from_secs(1)).unwrap(), 5);
        executor.shutdown();
    }

    #[test]
    fn test_shutdown_drains_queue() {
        let executor = Executor::new(config().core_threads(1).max_threads(1)).unwrap();
        let (blocker, queued, release) = saturate(&executor);

        executor.shutdown();
        assert!(executor.is_shutdown());
        assert!(!executor.is_terminated());

        release.send(()).unwrap();
        assert!(executor.await_termination(Duration::from_secs(1)));
        assert!(blocker.is_success());
        assert_eq!(queued.get_now(), Some(2));
    }

    #[test]
    fn test_submit_after_shutdown_rejected() {
        let executor = Executor::new(config()).unwrap();
        executor.shutdown();
        assert!(matches!(
            executor.submit(|| Ok::<_, Error>(1)),
            Err(Error::Rejected(_))
        ));
        assert!(executor.is_terminated());
    }

    #[test]
    fn test_submit_during_shutdown_window_rejected() {
        let executor = Executor::new(config().core_threads(1)).unwrap();
        // Flag set while the sender is still in place, as mid-shutdown
        executor.shared.shutdown.store(true, Ordering::Release);

        assert!(matches!(
            executor.submit(|| Ok::<_, Error>(1)),
            Err(Error::Rejected(_))
        ));
        assert_eq!(executor.stats().pool_size, 0);
        assert_eq!(executor.stats().submitted, 0);

        let discarding = Executor::new(config().policy(SaturationPolicy::Discard)).unwrap();
        discarding.shared.shutdown.store(true, Ordering::Release);
        let future = discarding.submit(|| Ok::<_, Error>(1)).unwrap();
        assert!(future.is_cancelled());
        assert_eq!(discarding.stats().pool_size, 0);

        // Release the senders so the executors can wind down
        executor.sender.write().unwrap().take();
        discarding.sender.write().unwrap().take();
    }

    #[test]
    fn test_shutdown_now_cancels_queue_and_interrupts() {
        let executor = Executor::new(config().core_threads(1).max_threads(1)).unwrap();
        let never = crate::future::Promise::<u32>::new();
        let gate = never.future();
        let (started_tx, started_rx) = mpsc::channel();

        let waiting = executor
            .submit(move || {
                started_tx.send(()).unwrap();
                gate.get()
            })
            .unwrap();
        started_rx.recv_timeout(Duration::from_secs(1)).unwrap();
        let queued = executor.submit(|| Ok::<_, Error>(1)).unwrap();

        let cancelled = executor.shutdown_now();
        assert_eq!(cancelled.len(), 1);
        assert!(queued.is_cancelled());

        assert!(executor.await_termination(Duration::from_secs(1)));
        let cause = waiting.cause().unwrap();
        assert!(matches!(
            cause.as_ref().downcast_ref::<Error>(),
            Some(Error::Interrupted)
        ));
        assert!(!never.is_done());
    }

    #[test]
    fn test_execute_fire_and_forget() {
        let executor = Executor::new(config().core_threads(1)).unwrap();
        let (tx, rx) = mpsc::channel();
        executor.execute(move || tx.send(7).unwrap()).unwrap();
        assert_eq!(rx.recv_timeout(Duration::from_secs(1)).unwrap(), 7);

        // A panicking fire-and-forget task is logged, not propagated
        executor.execute(|| panic!("ignored")).unwrap();
        executor.shutdown();
        assert!(executor.await_termination(Duration::from_secs(1)));
    }

    #[test]
    fn test_reporter_runs_with_executor() {
        let executor =
            Executor::new(ExecutorConfig::new().report_interval(Duration::from_millis(5))).unwrap();
        thread::sleep(Duration::from_millis(20));
        executor.shutdown();
        assert!(executor.is_terminated());
    }

    #[test]
    fn test_drop_without_shutdown() {
        let executor = Executor::new(config().core_threads(1)).unwrap();
        let future = executor.submit(|| Ok::<_, Error>(1)).unwrap();
        drop(executor);
        assert_eq!(future.get_timeout(Duration::from_secs(1)).unwrap(), 1);
    }
}
