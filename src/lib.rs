pub mod coroutine;
pub use coroutine::{BoxCoroutine, Coroutine, Directive, Resume, Step, StepResult, from_fn};

pub mod runtime;
pub use runtime::{Awaitable, Context, Scheduler};

pub mod task;
pub use task::{
    ErrorFirstToken, Failure, Handle, Id, OnError, OnSuccess, ResumeToken, SchedulerError,
    UncheckedToken,
};

mod utils;

#[cfg(test)]
mod test_utils;
