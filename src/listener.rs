//! Completion listeners and their dispatch
//!
//! Listeners registered on a [`Future`] are stored in a small registry that
//! avoids allocating a list for the common single-listener case. When the
//! future completes, one thread at a time drains the registry and invokes the
//! captured listeners in registration order, outside of any lock. Listeners
//! that arrive while a pass is running are picked up by a further sub-pass of
//! the same dispatcher, so each listener runs exactly once.
//!
//! A listener that returns an error or panics is logged and skipped; it never
//! reaches the producer and never stops the remaining listeners.

use std::fmt;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Mutex;

use crate::error::{panic_message, Cause};
use crate::future::{lock, Future};

/// Result returned by listener callbacks
pub type ListenerResult = std::result::Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Callback invoked once when a future completes
pub trait Listener<T>: Send + 'static {
    /// The future completed with a value
    fn on_success(self: Box<Self>, future: &Future<T>) -> ListenerResult;

    /// The future failed or was cancelled
    fn on_failure(self: Box<Self>, cause: &Cause) -> ListenerResult;
}

type SuccessFn<T> = Box<dyn FnOnce(&T) + Send>;
type FailureFn = Box<dyn FnOnce(&Cause) + Send>;

/// Listener built from closures; either branch may be absent
pub struct FnListener<T> {
    success: Option<SuccessFn<T>>,
    failure: Option<FailureFn>,
}

impl<T> FnListener<T> {
    pub fn new<S, F>(success: S, failure: F) -> Self
    where
        S: FnOnce(&T) + Send + 'static,
        F: FnOnce(&Cause) + Send + 'static,
    {
        Self {
            success: Some(Box::new(success)),
            failure: Some(Box::new(failure)),
        }
    }

    /// Listener that only observes the success value
    pub fn success<S>(success: S) -> Self
    where
        S: FnOnce(&T) + Send + 'static,
    {
        Self {
            success: Some(Box::new(success)),
            failure: None,
        }
    }

    /// Listener that only observes the failure cause
    pub fn failure<F>(failure: F) -> Self
    where
        F: FnOnce(&Cause) + Send + 'static,
    {
        Self {
            success: None,
            failure: Some(Box::new(failure)),
        }
    }
}

impl<T: Send + Sync + 'static> Listener<T> for FnListener<T> {
    fn on_success(self: Box<Self>, future: &Future<T>) -> ListenerResult {
        if let (Some(success), Some(value)) = (self.success, future.peek()) {
            success(value);
        }
        Ok(())
    }

    fn on_failure(self: Box<Self>, cause: &Cause) -> ListenerResult {
        if let Some(failure) = self.failure {
            failure(cause);
        }
        Ok(())
    }
}

impl<T> fmt::Debug for FnListener<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnListener")
            .field("success", &self.success.is_some())
            .field("failure", &self.failure.is_some())
            .finish()
    }
}

/// An ordered batch of listeners registered in one call
pub struct Listeners<T> {
    listeners: Vec<Box<dyn Listener<T>>>,
}

impl<T> Listeners<T> {
    pub fn new() -> Self {
        Self {
            listeners: Vec::with_capacity(4),
        }
    }

    /// Append a listener, keeping registration order
    pub fn push<L: Listener<T>>(&mut self, listener: L) -> &mut Self {
        self.listeners.push(Box::new(listener));
        self
    }

    /// Builder form of [`push`](Self::push)
    pub fn with<L: Listener<T>>(mut self, listener: L) -> Self {
        self.push(listener);
        self
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub(crate) fn into_boxed(self) -> Vec<Box<dyn Listener<T>>> {
        self.listeners
    }
}

impl<T> Default for Listeners<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Listeners<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("len", &self.listeners.len())
            .finish()
    }
}

/// Registered listeners, without a list allocation for the single case
pub(crate) enum Registry<T> {
    Empty,
    Single(Box<dyn Listener<T>>),
    Many(Vec<Box<dyn Listener<T>>>),
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Registry::Empty
    }
}

impl<T> Registry<T> {
    pub(crate) fn push(&mut self, listener: Box<dyn Listener<T>>) {
        *self = match mem::take(self) {
            Registry::Empty => Registry::Single(listener),
            Registry::Single(first) => Registry::Many(vec![first, listener]),
            Registry::Many(mut all) => {
                all.push(listener);
                Registry::Many(all)
            }
        };
    }

    pub(crate) fn extend(&mut self, listeners: Vec<Box<dyn Listener<T>>>) {
        for listener in listeners {
            self.push(listener);
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        match self {
            Registry::Empty => true,
            Registry::Single(_) => false,
            Registry::Many(all) => all.is_empty(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        match self {
            Registry::Empty => 0,
            Registry::Single(_) => 1,
            Registry::Many(all) => all.len(),
        }
    }

    fn into_vec(self) -> Vec<Box<dyn Listener<T>>> {
        match self {
            Registry::Empty => Vec::new(),
            Registry::Single(only) => vec![only],
            Registry::Many(all) => all,
        }
    }
}

/// Registry plus the "a pass is running" flag, guarded together
pub(crate) struct Dispatch<T> {
    registry: Registry<T>,
    notifying: bool,
}

impl<T> Dispatch<T> {
    pub(crate) fn new() -> Self {
        Self {
            registry: Registry::Empty,
            notifying: false,
        }
    }

    pub(crate) fn registry_mut(&mut self) -> &mut Registry<T> {
        &mut self.registry
    }

    pub(crate) fn pending(&self) -> usize {
        self.registry.len()
    }
}

/// Run every registered listener of a completed future
///
/// Returns immediately if another thread is already dispatching for this
/// future or nothing is registered; that pass (or the next registration)
/// delivers whatever is added later.
pub(crate) fn notify_listeners<T: Send + Sync + 'static>(
    future: &Future<T>,
    dispatch: &Mutex<Dispatch<T>>,
) {
    let mut batch = {
        let mut guard = lock(dispatch);
        if guard.notifying || guard.registry.is_empty() {
            return;
        }
        guard.notifying = true;
        mem::take(&mut guard.registry)
    };

    loop {
        for listener in batch.into_vec() {
            notify_one(future, listener);
        }

        let mut guard = lock(dispatch);
        if guard.registry.is_empty() {
            guard.notifying = false;
            return;
        }
        batch = mem::take(&mut guard.registry);
    }
}

fn notify_one<T: Send + Sync + 'static>(future: &Future<T>, listener: Box<dyn Listener<T>>) {
    let (branch, result) = match future.cause() {
        None => (
            "success",
            panic::catch_unwind(AssertUnwindSafe(|| listener.on_success(future))),
        ),
        Some(cause) => (
            "failure",
            panic::catch_unwind(AssertUnwindSafe(|| listener.on_failure(&cause))),
        ),
    };

    match result {
        Ok(Ok(())) => {}
        Ok(Err(error)) => {
            tracing::warn!(
                future = ?future,
                branch,
                error = %error,
                "future listener returned an error"
            );
        }
        Err(payload) => {
            tracing::warn!(
                future = ?future,
                branch,
                panic = %panic_message(payload.as_ref()),
                "future listener panicked"
            );
        }
    }
}
