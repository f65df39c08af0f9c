//! Blocking Future/Promise implementation
//!
//! This module provides the core Future and Promise types. Both are cheap
//! handles onto one shared completion core:
//!
//! - [`Promise`] is the producer side. Exactly one of `set_success`,
//!   `set_failure` or `cancel` wins; later setters fail with
//!   [`Error::AlreadyCompleted`].
//! - [`Future`] is the consumer side. It can be polled with `get_now`, waited
//!   on with `wait`/`get` (optionally bounded), or observed through listeners.
//!
//! Waiting threads block on a per-future condition variable; a completion
//! wakes all of them at once. Nothing here is shared between futures, so
//! contention stays isolated to a single result.

use std::fmt;
use std::future::IntoFuture;
use std::pin::Pin;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use futures::task::AtomicWaker;

use crate::cell::{Outcome, ResultCell};
use crate::config::MAX_WAITERS;
use crate::error::{Cause, Error, Result};
use crate::interrupt;
use crate::listener::{notify_listeners, Dispatch, FnListener, Listener, ListenerResult, Listeners};

/// Lock a mutex, recovering the data if a previous holder panicked
///
/// Listener callbacks never run under these locks, so a poisoned guard can
/// only come from a panic inside this crate's own short critical sections.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Wait/notify monitor: the waiter count and the condition it guards
pub(crate) struct Monitor {
    waiters: Mutex<usize>,
    cond: Condvar,
    /// Waiters allowed at once; one more fails with `TooManyWaiters`
    max_waiters: usize,
}

impl Monitor {
    fn new(max_waiters: usize) -> Self {
        Self {
            waiters: Mutex::new(0),
            cond: Condvar::new(),
            max_waiters,
        }
    }

    /// Broadcast only when someone is actually blocked
    fn notify_waiters(&self) {
        let waiters = lock(&self.waiters);
        if *waiters > 0 {
            self.cond.notify_all();
        }
    }

    /// Unconditional broadcast, used to deliver interrupts
    pub(crate) fn wake_all(&self) {
        let _waiters = lock(&self.waiters);
        self.cond.notify_all();
    }

    fn waiters(&self) -> usize {
        *lock(&self.waiters)
    }
}

/// State shared by every handle onto one asynchronous result
struct Core<T> {
    cell: ResultCell<T>,
    monitor: Arc<Monitor>,
    dispatch: Mutex<Dispatch<T>>,
}

/// Read-only handle to an asynchronous result
pub struct Future<T> {
    core: Arc<Core<T>>,
}

/// Write-once handle used by the producer of an asynchronous result
///
/// A promise dereferences to its [`Future`], so the producer can also wait on
/// or observe the result it is responsible for.
pub struct Promise<T> {
    future: Future<T>,
}

impl<T> Clone for Future<T> {
    fn clone(&self) -> Self {
        Self {
            core: self.core.clone(),
        }
    }
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Self {
            future: self.future.clone(),
        }
    }
}

impl<T: Send + Sync + 'static> Future<T> {
    /// Create a new Future/Promise pair
    pub fn new() -> (Future<T>, Promise<T>) {
        let promise = Promise::new();
        (promise.future(), promise)
    }

    /// Whether two handles refer to the same result
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        Arc::ptr_eq(&this.core, &other.core)
    }

    pub fn is_done(&self) -> bool {
        self.core.cell.is_done()
    }

    pub fn is_success(&self) -> bool {
        self.core.cell.is_success()
    }

    pub fn is_cancelled(&self) -> bool {
        self.core.cell.is_cancelled()
    }

    /// True only while pending and not marked uncancellable
    pub fn is_cancellable(&self) -> bool {
        self.core.cell.is_cancellable()
    }

    /// The failure or cancellation cause, if the future did not succeed
    pub fn cause(&self) -> Option<Cause> {
        self.core.cell.cause()
    }

    /// Borrow the success value without blocking
    pub fn peek(&self) -> Option<&T> {
        self.core.cell.value()
    }

    pub fn outcome(&self) -> Option<&Outcome<T>> {
        self.core.cell.outcome()
    }

    /// Number of threads currently blocked on this future
    pub fn waiters(&self) -> usize {
        self.core.monitor.waiters()
    }

    /// Cancel the computation if it is still pending
    ///
    /// Returns `false` when the future already completed (or is
    /// uncancellable); that is a reported no-op, not an error.
    pub fn cancel(&self) -> bool {
        let won = self.core.cell.try_cancel();
        if won {
            self.complete();
        }
        won
    }

    /// Wake waiters and run listeners after a winning transition
    fn complete(&self) {
        self.core.monitor.notify_waiters();
        notify_listeners(self, &self.core.dispatch);
    }

    /// Block until the future completes
    pub fn wait(&self) -> Result<&Self> {
        self.wait_until(None, true)?;
        Ok(self)
    }

    /// Block until the future completes or `timeout` elapses
    ///
    /// Returns `Ok(false)` on timeout. The computation itself is left alone.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<bool> {
        self.wait_for(timeout, true)
    }

    /// Like [`wait`](Self::wait), but interrupts do not end the wait
    ///
    /// The thread's interrupt flag is left set for the next interruptible wait.
    pub fn wait_uninterruptibly(&self) -> Result<&Self> {
        self.wait_until(None, false)?;
        Ok(self)
    }

    pub fn wait_timeout_uninterruptibly(&self, timeout: Duration) -> Result<bool> {
        self.wait_for(timeout, false)
    }

    fn wait_for(&self, timeout: Duration, interruptible: bool) -> Result<bool> {
        if self.is_done() {
            return Ok(true);
        }
        if timeout.is_zero() {
            return Ok(self.is_done());
        }
        // A deadline too far out to represent is the same as no deadline
        let deadline = Instant::now().checked_add(timeout);
        match self.wait_until(deadline, interruptible) {
            Ok(()) => Ok(true),
            Err(Error::Timeout) => Ok(self.is_done()),
            Err(other) => Err(other),
        }
    }

    /// Monitor loop shared by every blocking wait
    ///
    /// Every wake-up, spurious or not, re-checks completion, then the
    /// interrupt flag, then the deadline. Expiry reports [`Error::Timeout`].
    fn wait_until(&self, deadline: Option<Instant>, interruptible: bool) -> Result<()> {
        if self.is_done() {
            return Ok(());
        }

        let monitor = &self.core.monitor;
        let _parked = interruptible.then(|| interrupt::park_on(monitor));
        let mut waiters = lock(&monitor.waiters);

        loop {
            if self.is_done() {
                return Ok(());
            }
            if interruptible && interrupt::interrupted() {
                return Err(Error::Interrupted);
            }
            let remaining = match deadline {
                None => None,
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(Error::Timeout);
                    }
                    Some(deadline - now)
                }
            };
            if *waiters >= monitor.max_waiters {
                return Err(Error::TooManyWaiters);
            }

            *waiters += 1;
            waiters = match remaining {
                None => monitor
                    .cond
                    .wait(waiters)
                    .unwrap_or_else(PoisonError::into_inner),
                Some(remaining) => {
                    monitor
                        .cond
                        .wait_timeout(waiters, remaining)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
            };
            *waiters -= 1;
        }
    }

    /// Wait, then surface a failure or cancellation as an error
    pub fn sync(&self) -> Result<&Self> {
        self.wait()?;
        match self.cause() {
            None => Ok(self),
            Some(cause) => Err(Error::from_cause(&cause)),
        }
    }

    /// Register a listener
    ///
    /// If the future is already complete the listener runs before this call
    /// returns, unless another thread is mid-dispatch, in which case that
    /// thread runs it.
    pub fn add_listener<L: Listener<T>>(&self, listener: L) -> &Self {
        lock(&self.core.dispatch)
            .registry_mut()
            .push(Box::new(listener));
        if self.is_done() {
            notify_listeners(self, &self.core.dispatch);
        }
        self
    }

    /// Register an ordered batch of listeners in one call
    pub fn add_listeners(&self, listeners: Listeners<T>) -> &Self {
        if listeners.is_empty() {
            return self;
        }
        lock(&self.core.dispatch)
            .registry_mut()
            .extend(listeners.into_boxed());
        if self.is_done() {
            notify_listeners(self, &self.core.dispatch);
        }
        self
    }

    pub fn add_success_listener<F>(&self, success: F) -> &Self
    where
        F: FnOnce(&T) + Send + 'static,
    {
        self.add_listener(FnListener::success(success))
    }

    pub fn add_failure_listener<F>(&self, failure: F) -> &Self
    where
        F: FnOnce(&Cause) + Send + 'static,
    {
        self.add_listener(FnListener::failure(failure))
    }

    /// Adapt into a [`std::future::Future`] for use from async code
    pub fn into_async(self) -> AsyncFuture<T> {
        AsyncFuture {
            future: self,
            waker: Arc::new(AtomicWaker::new()),
            registered: false,
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Future<T> {
    /// The success value, or `None` if pending, failed or cancelled
    ///
    /// Never blocks.
    pub fn get_now(&self) -> Option<T> {
        self.peek().cloned()
    }

    /// Block until complete and return the value
    pub fn get(&self) -> Result<T> {
        self.wait()?;
        self.result()
    }

    /// Bounded [`get`](Self::get); fails with [`Error::Timeout`] on expiry
    pub fn get_timeout(&self, timeout: Duration) -> Result<T> {
        if self.wait_timeout(timeout)? {
            self.result()
        } else {
            Err(Error::Timeout)
        }
    }

    fn result(&self) -> Result<T> {
        match self.outcome() {
            Some(Outcome::Success(value)) => Ok(value.clone()),
            Some(Outcome::Failure(cause)) => Err(Error::from_cause(cause)),
            None => Err(Error::Timeout),
        }
    }
}

impl<T> fmt::Debug for Future<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Future")
            .field("cell", &self.core.cell)
            .field("waiters", &self.core.monitor.waiters())
            .field("listeners", &lock(&self.core.dispatch).pending())
            .finish()
    }
}

impl<T: Send + Sync + 'static> Promise<T> {
    /// Create a pending promise
    pub fn new() -> Self {
        Self::with_waiter_cap(MAX_WAITERS)
    }

    /// Pending promise admitting at most `max_waiters` blocked threads
    pub(crate) fn with_waiter_cap(max_waiters: usize) -> Self {
        Self {
            future: Future {
                core: Arc::new(Core {
                    cell: ResultCell::new(),
                    monitor: Arc::new(Monitor::new(max_waiters)),
                    dispatch: Mutex::new(Dispatch::new()),
                }),
            },
        }
    }

    /// A read-only handle onto this promise's result
    pub fn future(&self) -> Future<T> {
        self.future.clone()
    }

    /// Complete with a value; fails if already completed
    pub fn set_success(&self, value: T) -> Result<()> {
        if self.try_success(value) {
            Ok(())
        } else {
            Err(Error::AlreadyCompleted)
        }
    }

    /// Complete with a failure; fails if already completed
    pub fn set_failure<E>(&self, cause: E) -> Result<()>
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        if self.try_failure(cause) {
            Ok(())
        } else {
            Err(Error::AlreadyCompleted)
        }
    }

    /// Non-raising [`set_success`](Self::set_success); returns whether this call won
    pub fn try_success(&self, value: T) -> bool {
        let won = self.future.core.cell.try_succeed(value);
        if won {
            self.future.complete();
        }
        won
    }

    pub fn try_failure<E>(&self, cause: E) -> bool
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let boxed: Box<dyn std::error::Error + Send + Sync> = cause.into();
        self.try_failure_cause(Arc::from(boxed))
    }

    /// Fail with an already shared cause, keeping its identity
    pub fn try_failure_cause(&self, cause: Cause) -> bool {
        let won = self.future.core.cell.try_fail(cause);
        if won {
            self.future.complete();
        }
        won
    }

    /// Make later `cancel` calls lose while leaving the setters usable
    ///
    /// Returns `true` if the promise is now uncancellable or already completed
    /// without being cancelled.
    pub fn set_uncancellable(&self) -> bool {
        self.future.core.cell.set_uncancellable()
    }
}

impl<T: Send + Sync + 'static> Default for Promise<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::ops::Deref for Promise<T> {
    type Target = Future<T>;

    fn deref(&self) -> &Future<T> {
        &self.future
    }
}

impl<T> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Promise").field(&self.future).finish()
    }
}

/// Wakes an async task when the future completes
struct WakeOnComplete(Arc<AtomicWaker>);

impl<T> Listener<T> for WakeOnComplete {
    fn on_success(self: Box<Self>, _future: &Future<T>) -> ListenerResult {
        self.0.wake();
        Ok(())
    }

    fn on_failure(self: Box<Self>, _cause: &Cause) -> ListenerResult {
        self.0.wake();
        Ok(())
    }
}

/// A [`Future`] adapted to `std::future::Future`, yielding `Result<T>`
pub struct AsyncFuture<T> {
    future: Future<T>,
    waker: Arc<AtomicWaker>,
    registered: bool,
}

impl<T: Clone + Send + Sync + 'static> std::future::Future for AsyncFuture<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.future.is_done() {
            return Poll::Ready(self.future.result());
        }

        self.waker.register(cx.waker());
        if !self.registered {
            self.registered = true;
            let waker = self.waker.clone();
            self.future.add_listener(WakeOnComplete(waker));
        }

        // Re-check after registering so a completion in between is not lost
        if self.future.is_done() {
            Poll::Ready(self.future.result())
        } else {
            Poll::Pending
        }
    }
}

impl<T: Clone + Send + Sync + 'static> IntoFuture for Future<T> {
    type Output = Result<T>;
    type IntoFuture = AsyncFuture<T>;

    fn into_future(self) -> AsyncFuture<T> {
        self.into_async()
    }
}

impl<T> fmt::Debug for AsyncFuture<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncFuture")
            .field("future", &self.future)
            .field("registered", &self.registered)
            .finish()
    }
}
