use crate::runtime::Scheduler;
use crate::task::SchedulerError;

// Exports
pub(crate) mod clock;
pub(crate) use clock::FakeClock;

pub(crate) mod promise;
pub(crate) use promise::CompletablePromise;

/// Install a subscriber so `RUST_LOG=trace cargo test -- --nocapture` shows
/// what the scheduler is doing.
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Alternate between draining the scheduler and firing the next timer until
/// both are idle.
pub(crate) fn drain<T: 'static>(
    scheduler: &Scheduler<T>,
    clock: &FakeClock,
) -> Result<(), SchedulerError> {
    loop {
        scheduler.run()?;
        if !clock.fire_next() {
            return Ok(());
        }
    }
}
