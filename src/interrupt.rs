//! Thread interruption for blocking waits
//!
//! OS threads have no built-in interrupt, so every thread carries a flag
//! here. An [`Interrupter`] obtained on a thread can be handed to any other
//! thread; calling [`Interrupter::interrupt`] sets the flag and wakes the
//! monitor the target is parked on, if any. Interruptible waits consume the
//! flag and fail with [`Error::Interrupted`](crate::Error::Interrupted).

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};

use crate::future::{lock, Monitor};

struct InterruptState {
    thread: ThreadId,
    flag: AtomicBool,
    parked_on: Mutex<Option<Arc<Monitor>>>,
}

thread_local! {
    static CURRENT: Arc<InterruptState> = Arc::new(InterruptState {
        thread: thread::current().id(),
        flag: AtomicBool::new(false),
        parked_on: Mutex::new(None),
    });
}

/// Handle used to interrupt one particular thread's blocking waits
#[derive(Clone)]
pub struct Interrupter {
    state: Arc<InterruptState>,
}

impl Interrupter {
    /// Handle for the calling thread
    pub fn current() -> Self {
        Self {
            state: CURRENT.with(|state| state.clone()),
        }
    }

    /// Set the target's interrupt flag and wake it if it is waiting
    pub fn interrupt(&self) {
        self.state.flag.store(true, Ordering::SeqCst);
        let monitor = lock(&self.state.parked_on).clone();
        if let Some(monitor) = monitor {
            monitor.wake_all();
        }
    }

    pub fn is_interrupted(&self) -> bool {
        self.state.flag.load(Ordering::SeqCst)
    }

    /// The thread this handle interrupts
    pub fn thread_id(&self) -> ThreadId {
        self.state.thread
    }
}

impl fmt::Debug for Interrupter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interrupter")
            .field("thread", &self.state.thread)
            .field("interrupted", &self.is_interrupted())
            .finish()
    }
}

/// Clear the calling thread's interrupt flag, returning its previous value
pub fn interrupted() -> bool {
    CURRENT.with(|state| state.flag.swap(false, Ordering::SeqCst))
}

/// Whether the calling thread's interrupt flag is set, without clearing it
pub fn is_interrupted() -> bool {
    CURRENT.with(|state| state.flag.load(Ordering::SeqCst))
}

/// Records which monitor the current thread is parked on for its lifetime
pub(crate) struct ParkGuard {
    state: Arc<InterruptState>,
}

impl Drop for ParkGuard {
    fn drop(&mut self) {
        lock(&self.state.parked_on).take();
    }
}

/// Must be called before the caller checks the flag under the monitor lock,
/// otherwise an interrupt landing between the check and the wait is lost.
pub(crate) fn park_on(monitor: &Arc<Monitor>) -> ParkGuard {
    let state = CURRENT.with(|state| state.clone());
    *lock(&state.parked_on) = Some(monitor.clone());
    ParkGuard { state }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interrupt_sets_and_clears_flag() {
        let interrupter = Interrupter::current();
        assert!(!is_interrupted());

        interrupter.interrupt();
        assert!(interrupter.is_interrupted());
        assert!(is_interrupted());

        assert!(interrupted());
        assert!(!interrupted());
        assert!(!interrupter.is_interrupted());
    }

    #[test]
    fn test_handle_targets_its_own_thread() {
        let interrupter = Interrupter::current();
        let other = thread::spawn(move || {
            interrupter.interrupt();
            is_interrupted()
        })
        .join()
        .unwrap();

        // Only the thread that created the handle is flagged
        assert!(!other);
        assert!(interrupted());
    }

    #[test]
    fn test_thread_id_matches_creator() {
        let interrupter = Interrupter::current();
        assert_eq!(interrupter.thread_id(), thread::current().id());
    }
}
