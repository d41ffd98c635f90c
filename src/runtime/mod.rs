// Public API
mod scheduler;
pub use scheduler::Scheduler;

mod driver;
pub use driver::Context;

mod bridge;
pub use bridge::Awaitable;

mod join;

mod throttle;
pub(crate) use throttle::ThrottleGroup;
