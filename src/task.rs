//! Task abstraction
//!
//! This module provides [`PromiseTask`], which binds a unit of work to the
//! [`Promise`] that reports its outcome, and the [`Runnable`] trait the
//! executor queues. Running a task is the only place a pool-submitted promise
//! gets completed.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{panic_message, Cause, Panicked};
use crate::future::{Future, Promise};

/// A task ID that uniquely identifies a submitted task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub(crate) u64);

impl TaskId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// Global task ID generator
static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

fn next_task_id() -> TaskId {
    TaskId(NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed))
}

/// Type-erased unit of work held in an executor queue
pub trait Runnable: Send + 'static {
    fn id(&self) -> TaskId;

    /// Execute the work and complete its promise
    fn run(self: Box<Self>);

    /// Called instead of [`run`](Self::run) when the work is discarded
    fn abandon(self: Box<Self>);
}

type Work<T> = Box<dyn FnOnce() -> std::result::Result<T, Cause> + Send>;

/// A unit of work bound to the promise that reports its outcome
pub struct PromiseTask<T> {
    id: TaskId,
    promise: Promise<T>,
    work: Work<T>,
}

impl<T: Send + Sync + 'static> PromiseTask<T> {
    /// Wrap fallible work; an `Err` completes the promise as failed
    pub fn new<F, E>(work: F) -> Self
    where
        F: FnOnce() -> std::result::Result<T, E> + Send + 'static,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self {
            id: next_task_id(),
            promise: Promise::new(),
            work: Box::new(move || {
                work().map_err(|err| {
                    let boxed: Box<dyn std::error::Error + Send + Sync> = err.into();
                    Cause::from(boxed)
                })
            }),
        }
    }

    /// Wrap work that produces no value of its own; `value` is the result
    pub fn from_runnable<F>(work: F, value: T) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            id: next_task_id(),
            promise: Promise::new(),
            work: Box::new(move || {
                work();
                Ok(value)
            }),
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Handle onto the result this task will produce
    pub fn future(&self) -> Future<T> {
        self.promise.future()
    }

    /// Run the work unless the promise was already cancelled
    ///
    /// Panics are caught and stored as a [`Panicked`] cause.
    pub fn run(self) {
        let PromiseTask { id, promise, work } = self;

        if promise.is_cancelled() {
            tracing::trace!(task = %id, "skipping cancelled task");
            return;
        }

        let completed = match panic::catch_unwind(AssertUnwindSafe(work)) {
            Ok(Ok(value)) => promise.try_success(value),
            Ok(Err(cause)) => promise.try_failure_cause(cause),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::warn!(task = %id, panic = %message, "task panicked");
                promise.try_failure_cause(Arc::new(Panicked(message)))
            }
        };

        if !completed {
            // Cancelled while running; the late result has nowhere to go
            tracing::debug!(task = %id, "dropping result of task completed elsewhere");
        }
    }
}

impl<T: Send + Sync + 'static> Runnable for PromiseTask<T> {
    fn id(&self) -> TaskId {
        self.id
    }

    fn run(self: Box<Self>) {
        PromiseTask::run(*self)
    }

    fn abandon(self: Box<Self>) {
        tracing::debug!(task = %self.id, "discarding task");
        self.promise.cancel();
    }
}

impl<T> fmt::Debug for PromiseTask<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PromiseTask")
            .field("id", &self.id)
            .field("promise", &self.promise)
            .finish()
    }
}
