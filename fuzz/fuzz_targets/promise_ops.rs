#![no_main]
use libfuzzer_sys::fuzz_target;
use rust_deferred::Promise;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fuzz_target!(|ops: Vec<u8>| {
    let promise = Promise::<u8>::new();
    let notified = Arc::new(AtomicUsize::new(0));
    let mut registered = 0usize;
    let mut first_completion: Option<u8> = None;

    // Apply a sequence of completion, cancellation and registration operations
    for op in ops.iter().take(256) {
        let won = match op % 6 {
            0 => promise.try_success(*op),
            1 => promise.try_failure("fuzz"),
            2 => promise.cancel(),
            3 => {
                let _ = promise.set_uncancellable();
                false
            }
            4 => {
                let counter = notified.clone();
                promise.add_success_listener(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                });
                let counter = notified.clone();
                promise.add_failure_listener(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                });
                registered += 1;
                false
            }
            _ => {
                let _ = promise.wait_timeout(Duration::ZERO);
                false
            }
        };
        if won {
            assert!(first_completion.is_none());
            first_completion = Some(*op);
        }
    }

    assert_eq!(promise.is_done(), first_completion.is_some());
    if promise.is_done() {
        // Each registration pair fires exactly one of its two callbacks
        assert_eq!(notified.load(Ordering::SeqCst), registered);
    } else {
        assert_eq!(notified.load(Ordering::SeqCst), 0);
    }
});
