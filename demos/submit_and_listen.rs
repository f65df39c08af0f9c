//! Submit work to a pool, react to completion with listeners and block on
//! results.
//!
//! Run with `RUST_LOG=debug cargo run --example submit_and_listen` to see the
//! periodic pool report.

use rust_deferred::{Error, Executor, ExecutorConfig, Promise, SaturationPolicy};
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn main() -> rust_deferred::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let executor = Executor::new(
        ExecutorConfig::new()
            .core_threads(2)
            .max_threads(4)
            .queue_capacity(16)
            .policy(SaturationPolicy::CallerRuns)
            .report_interval(Duration::from_millis(100)),
    )?;

    let futures: Vec<_> = (1..=8u64)
        .map(|n| {
            executor.submit(move || {
                thread::sleep(Duration::from_millis(20 * n));
                if n == 5 {
                    return Err(Error::Rejected("five is not welcome"));
                }
                Ok(n * n)
            })
        })
        .collect::<rust_deferred::Result<_>>()?;

    for future in &futures {
        future.add_listener(rust_deferred::FnListener::new(
            |square: &u64| println!("listener saw {}", square),
            |cause: &rust_deferred::Cause| println!("listener saw failure: {}", cause),
        ));
    }

    executor.sync_all(&futures);
    let total: u64 = futures.iter().filter_map(|f| f.get_now()).sum();
    println!("sum of successful squares: {}", total);

    // A manually completed promise next to pooled work
    let promise = Promise::<&'static str>::new();
    let reader = promise.future();
    executor.execute(move || {
        thread::sleep(Duration::from_millis(10));
        let _ = promise.set_success("handed over");
    })?;
    println!("manual promise: {}", reader.get_timeout(Duration::from_secs(1))?);

    println!("{:#?}", executor.stats());
    executor.shutdown();
    executor.await_termination(Duration::from_secs(1));
    Ok(())
}
