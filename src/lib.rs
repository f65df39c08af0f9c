//! rust-deferred: thread-based deferred results
//!
//! This crate provides a blocking Future/Promise pair for code that runs on
//! plain OS threads:
//! - A write-once result cell completed by exactly one winning setter
//! - Blocking waits with timeout and interruption support
//! - Completion listeners dispatched exactly once, in registration order
//! - A thread pool that hands back a [`Future`] for every submitted task
//!
//! # Manually driven results
//!
//! ```rust
//! use rust_deferred::Promise;
//! use std::thread;
//!
//! let promise = Promise::<u32>::new();
//! let future = promise.future();
//!
//! future.add_success_listener(|value| println!("got {}", value));
//!
//! let producer = thread::spawn(move || {
//!     promise.set_success(42).unwrap();
//! });
//!
//! assert_eq!(future.get().unwrap(), 42);
//! producer.join().unwrap();
//! ```
//!
//! # Submitting work to a pool
//!
//! ```rust
//! use rust_deferred::{Executor, ExecutorConfig};
//!
//! let executor = Executor::new(ExecutorConfig::new().core_threads(2).without_report()).unwrap();
//!
//! let future = executor
//!     .submit(|| "42".parse::<u32>())
//!     .unwrap();
//!
//! assert_eq!(future.get().unwrap(), 42);
//! executor.shutdown();
//! ```
//!
//! # Errors
//!
//! Blocking reads distinguish the ways a wait can end without a value:
//! [`Error::Cancelled`](error::Error::Cancelled) when the task itself was
//! cancelled, [`Error::Execution`](error::Error::Execution) when it failed,
//! [`Error::Timeout`](error::Error::Timeout) when a bounded wait elapsed and
//! [`Error::Interrupted`](error::Error::Interrupted) when the waiting thread
//! was interrupted through an [`Interrupter`].

pub mod cell;
pub mod config;
pub mod executor;
pub mod future;
pub mod interrupt;
pub mod listener;
pub mod report;
pub mod task;

// Re-export core types
pub use cell::{Outcome, ResultCell};
pub use config::{ExecutorConfig, SaturationPolicy};
pub use error::{Cancelled, Cause, Error, Panicked, Result};
pub use executor::Executor;
pub use future::{AsyncFuture, Future, Promise};
pub use interrupt::Interrupter;
pub use listener::{FnListener, Listener, ListenerResult, Listeners};
pub use report::PoolStats;
pub use task::{PromiseTask, Runnable, TaskId};

/// Error types for futures, promises and the executor
pub mod error {
    use once_cell::sync::Lazy;
    use std::sync::Arc;
    use thiserror::Error;

    /// Shareable failure payload stored in a completed promise
    pub type Cause = Arc<dyn std::error::Error + Send + Sync + 'static>;

    #[derive(Error, Debug)]
    pub enum Error {
        #[error("promise already completed")]
        AlreadyCompleted,

        #[error("task was cancelled")]
        Cancelled,

        #[error("task failed: {0}")]
        Execution(#[source] Cause),

        #[error("timed out waiting for completion")]
        Timeout,

        #[error("wait was interrupted")]
        Interrupted,

        #[error("too many threads waiting on one future")]
        TooManyWaiters,

        #[error("task rejected: {0}")]
        Rejected(&'static str),

        #[error("failed to spawn thread: {0}")]
        Spawn(#[from] std::io::Error),

        #[error("invalid executor configuration: {0}")]
        InvalidConfig(String),
    }

    impl Error {
        /// Map a stored failure cause onto the error a blocking reader sees
        pub fn from_cause(cause: &Cause) -> Self {
            if is_cancellation(cause) {
                Error::Cancelled
            } else {
                Error::Execution(cause.clone())
            }
        }
    }

    pub type Result<T> = std::result::Result<T, Error>;

    /// Cause stored in every cancelled promise
    #[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Default)]
    #[error("cancelled")]
    pub struct Cancelled;

    /// Cause stored when a task panics instead of returning
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    #[error("task panicked: {0}")]
    pub struct Panicked(pub String);

    static CANCELLATION_CAUSE: Lazy<Cause> = Lazy::new(|| Arc::new(Cancelled));

    pub(crate) fn cancellation_cause() -> Cause {
        CANCELLATION_CAUSE.clone()
    }

    /// True if `cause` is the cancellation marker
    pub fn is_cancellation(cause: &Cause) -> bool {
        cause.as_ref().downcast_ref::<Cancelled>().is_some()
    }

    pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
        if let Some(msg) = payload.downcast_ref::<&str>() {
            (*msg).to_string()
        } else if let Some(msg) = payload.downcast_ref::<String>() {
            msg.clone()
        } else {
            "unknown panic payload".to_string()
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_cancellation_cause_is_shared() {
            let a = cancellation_cause();
            let b = cancellation_cause();
            assert!(Arc::ptr_eq(&a, &b));
            assert!(is_cancellation(&a));
        }

        #[test]
        fn test_from_cause_distinguishes_cancellation() {
            assert!(matches!(
                Error::from_cause(&cancellation_cause()),
                Error::Cancelled
            ));

            let failure: Cause = Arc::new(Panicked("boom".to_string()));
            match Error::from_cause(&failure) {
                Error::Execution(cause) => assert!(Arc::ptr_eq(&cause, &failure)),
                other => panic!("unexpected error: {:?}", other),
            }
        }

        #[test]
        fn test_execution_error_exposes_source() {
            use std::error::Error as _;

            let failure: Cause = Arc::new(Panicked("boom".to_string()));
            let err = Error::Execution(failure);
            assert_eq!(err.to_string(), "task failed: task panicked: boom");
            assert!(err.source().is_some());
        }
    }
}
