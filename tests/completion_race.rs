//! Property tests: exactly one completion wins regardless of contention

use proptest::prelude::*;
use rust_deferred::{Cause, FnListener, Promise};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

#[derive(Debug, Clone, Copy)]
enum Attempt {
    Succeed,
    Fail,
    Cancel,
}

fn attempt() -> impl Strategy<Value = Attempt> {
    prop_oneof![
        Just(Attempt::Succeed),
        Just(Attempt::Fail),
        Just(Attempt::Cancel),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_single_winner(attempts in prop::collection::vec(attempt(), 1..8)) {
        let promise = Promise::<usize>::new();
        let barrier = Arc::new(Barrier::new(attempts.len()));
        let notified = Arc::new(AtomicUsize::new(0));

        let counter = notified.clone();
        promise.add_listener(FnListener::new(
            {
                let counter = counter.clone();
                move |_: &usize| { counter.fetch_add(1, Ordering::SeqCst); }
            },
            move |_: &Cause| { counter.fetch_add(1, Ordering::SeqCst); },
        ));

        let handles: Vec<_> = attempts
            .iter()
            .copied()
            .enumerate()
            .map(|(index, attempt)| {
                let promise = promise.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    let won = match attempt {
                        Attempt::Succeed => promise.try_success(index),
                        Attempt::Fail => promise.try_failure("lost"),
                        Attempt::Cancel => promise.cancel(),
                    };
                    (won, attempt, index)
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let winners: Vec<_> = results.iter().filter(|(won, _, _)| *won).collect();

        prop_assert_eq!(winners.len(), 1);
        prop_assert!(promise.is_done());
        prop_assert_eq!(notified.load(Ordering::SeqCst), 1);

        let (_, attempt, index) = *winners[0];
        match attempt {
            Attempt::Succeed => prop_assert_eq!(promise.get_now(), Some(index)),
            Attempt::Fail => prop_assert!(!promise.is_success() && !promise.is_cancelled()),
            Attempt::Cancel => prop_assert!(promise.is_cancelled()),
        }
    }
}
