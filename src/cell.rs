//! Write-once result cell
//!
//! A [`ResultCell`] holds the terminal state of one asynchronous computation.
//! Completion is a two-step protocol: a compare-and-swap on a small state tag
//! picks the single winning writer, and the winner then publishes the
//! [`Outcome`] through a once-initialised slot. Readers only ever look at the
//! slot, so there is no moment where the cell reports "done" while the value
//! or cause is still invisible.

use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use crate::error::{cancellation_cause, is_cancellation, Cause};

const PENDING: u8 = 0;
/// Pending, but `try_cancel` will no longer win
const UNCANCELLABLE: u8 = 1;
/// Claimed by a success or failure setter
const COMPLETING: u8 = 2;
/// Claimed by `try_cancel`
const CANCELLING: u8 = 3;

/// Terminal state of a computation
#[derive(Debug, Clone)]
pub enum Outcome<T> {
    Success(T),
    /// Failed or cancelled; cancellation carries the [`Cancelled`](crate::Cancelled) cause
    Failure(Cause),
}

/// Atomically guarded terminal-state holder
pub struct ResultCell<T> {
    state: AtomicU8,
    outcome: OnceCell<Outcome<T>>,
}

impl<T> ResultCell<T> {
    /// Create an unset cell
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(PENDING),
            outcome: OnceCell::new(),
        }
    }

    fn claim(&self, from: u8, to: u8) -> bool {
        self.state
            .compare_exchange(from, to, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn publish(&self, outcome: Outcome<T>) {
        // Only the claiming thread reaches this, so the slot is always empty
        let _ = self.outcome.set(outcome);
    }

    /// Store a success value; returns whether this call won the race
    pub fn try_succeed(&self, value: T) -> bool {
        if self.claim(PENDING, COMPLETING) || self.claim(UNCANCELLABLE, COMPLETING) {
            self.publish(Outcome::Success(value));
            true
        } else {
            false
        }
    }

    /// Store a failure cause; returns whether this call won the race
    pub fn try_fail(&self, cause: Cause) -> bool {
        if self.claim(PENDING, COMPLETING) || self.claim(UNCANCELLABLE, COMPLETING) {
            self.publish(Outcome::Failure(cause));
            true
        } else {
            false
        }
    }

    /// Store the cancellation cause; only wins while pending and cancellable
    pub fn try_cancel(&self) -> bool {
        if self.claim(PENDING, CANCELLING) {
            self.publish(Outcome::Failure(cancellation_cause()));
            true
        } else {
            false
        }
    }

    /// Stop future cancellation attempts from winning
    ///
    /// Returns `true` if the cell is now uncancellable or was completed by
    /// something other than cancellation.
    pub fn set_uncancellable(&self) -> bool {
        match self.state.compare_exchange(
            PENDING,
            UNCANCELLABLE,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => true,
            Err(current) => current != CANCELLING,
        }
    }

    pub fn is_cancellable(&self) -> bool {
        self.state.load(Ordering::Acquire) == PENDING
    }

    pub fn is_done(&self) -> bool {
        self.outcome.get().is_some()
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome.get(), Some(Outcome::Success(_)))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.outcome.get(), Some(Outcome::Failure(cause)) if is_cancellation(cause))
    }

    /// The failure or cancellation cause, if any
    pub fn cause(&self) -> Option<Cause> {
        match self.outcome.get() {
            Some(Outcome::Failure(cause)) => Some(cause.clone()),
            _ => None,
        }
    }

    /// The success value, if the cell succeeded
    pub fn value(&self) -> Option<&T> {
        match self.outcome.get() {
            Some(Outcome::Success(value)) => Some(value),
            _ => None,
        }
    }

    pub fn outcome(&self) -> Option<&Outcome<T>> {
        self.outcome.get()
    }
}

impl<T> Default for ResultCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for ResultCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.outcome.get() {
            None => "pending",
            Some(Outcome::Success(_)) => "success",
            Some(Outcome::Failure(cause)) if is_cancellation(cause) => "cancelled",
            Some(Outcome::Failure(_)) => "failure",
        };
        f.debug_struct("ResultCell").field("state", &state).finish()
    }
}
