use std::panic::Location;

/// An error thrown or propagated out of a coroutine body.
///
/// Recovered locally when an error callback was registered at start time,
/// otherwise re-raised to the enclosing execution context as
/// [`SchedulerError::Fatal`].
pub type Failure = anyhow::Error;

/// A centralized error type for all scheduler control-flow violations.
#[derive(thiserror::Error, Debug)]
pub enum SchedulerError {
    /// A resume token fired after a newer token was minted for the same
    /// coroutine. Indicates a caller-side logic bug (usually a one-shot
    /// callback invoked twice through different paths); the scheduler never
    /// recovers from it on its own.
    #[error(
        "broken control flow: resume token minted at {stale} was superseded by the token minted at {current}"
    )]
    StaleToken {
        stale: &'static Location<'static>,
        current: &'static Location<'static>,
    },

    /// A resume token fired a second time. The first invocation consumed it.
    #[error("broken control flow: resume token minted at {stale} has already fired")]
    SpentToken { stale: &'static Location<'static> },

    /// A resume token fired after its coroutine had fully completed.
    #[error("broken control flow: resume token minted at {stale} fired after its coroutine completed")]
    FinishedHandle { stale: &'static Location<'static> },

    /// A coroutine failed and no error callback was registered for it, so the
    /// failure is fatal for the context that drove the step.
    #[error("coroutine failure with no error callback registered: {0}")]
    Fatal(#[from] Failure),
}

impl SchedulerError {
    /// True for every stale-token flavor; these are programming errors at the
    /// token call site, not coroutine failures.
    pub fn is_broken_control_flow(&self) -> bool {
        matches!(
            self,
            SchedulerError::StaleToken { .. }
                | SchedulerError::SpentToken { .. }
                | SchedulerError::FinishedHandle { .. }
        )
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, SchedulerError::Fatal(_))
    }
}
