use crate::coroutine::Resume;
use crate::runtime::Scheduler;
use crate::task::{Failure, Handle, SchedulerError, TokenSlot};
use std::panic::Location;

/// A single-use capability that resumes one coroutine at its current
/// suspension point.
///
/// At most one token per handle is valid at any time: minting a new one
/// (of any flavor except [`UncheckedToken`]) immediately invalidates the
/// previous one, and firing consumes the token. Firing anything but the
/// current token is a broken-control-flow error carrying the mint sites of
/// both the stale token and whatever superseded it.
pub struct ResumeToken<T> {
    core: TokenCore<T>,
}

impl<T: 'static> ResumeToken<T> {
    pub(crate) fn mint(
        scheduler: &Scheduler<T>,
        handle: &Handle<T>,
        site: &'static Location<'static>,
    ) -> Self {
        ResumeToken {
            core: TokenCore::mint(scheduler, handle, site),
        }
    }

    /// Resume the coroutine with positional arguments; they become the
    /// result of the yield it is suspended on.
    pub fn fire(&self, args: Vec<T>) -> Result<(), SchedulerError> {
        self.core.fire_next(args)
    }
}

impl<T> Clone for ResumeToken<T> {
    fn clone(&self) -> Self {
        ResumeToken {
            core: self.core.clone(),
        }
    }
}

/// A resume token following the error-first callback convention.
///
/// An `Err` outcome is delivered into the coroutine through the throw path,
/// annotated with this token's mint site; an `Ok` carries resume arguments
/// like [`ResumeToken::fire`].
pub struct ErrorFirstToken<T> {
    core: TokenCore<T>,
}

impl<T: 'static> ErrorFirstToken<T> {
    pub(crate) fn mint(
        scheduler: &Scheduler<T>,
        handle: &Handle<T>,
        site: &'static Location<'static>,
    ) -> Self {
        ErrorFirstToken {
            core: TokenCore::mint(scheduler, handle, site),
        }
    }

    pub fn fire(&self, outcome: Result<Vec<T>, Failure>) -> Result<(), SchedulerError> {
        match outcome {
            Ok(args) => self.core.fire_next(args),
            Err(err) => {
                let site = self.core.site;
                self.core
                    .fire_throw(err.context(format!("delivered through error-first token minted at {site}")))
            }
        }
    }
}

impl<T> Clone for ErrorFirstToken<T> {
    fn clone(&self) -> Self {
        ErrorFirstToken {
            core: self.core.clone(),
        }
    }
}

/// A resume capability with no freshness discipline.
///
/// It never invalidates and is never invalidated, so a stale invocation is
/// not detectable; firing after the coroutine completed is a no-op. For
/// callback sources known to fire exactly once.
pub struct UncheckedToken<T> {
    scheduler: Scheduler<T>,
    handle: Handle<T>,
}

impl<T: 'static> UncheckedToken<T> {
    pub(crate) fn new(scheduler: &Scheduler<T>, handle: &Handle<T>) -> Self {
        UncheckedToken {
            scheduler: scheduler.clone(),
            handle: handle.clone(),
        }
    }

    pub fn fire(&self, args: Vec<T>) -> Result<(), SchedulerError> {
        if self.handle.is_done() {
            return Ok(());
        }
        self.scheduler.advance(&self.handle, Resume::Next(args))
    }
}

impl<T> Clone for UncheckedToken<T> {
    fn clone(&self) -> Self {
        UncheckedToken {
            scheduler: self.scheduler.clone(),
            handle: self.handle.clone(),
        }
    }
}

struct TokenCore<T> {
    scheduler: Scheduler<T>,
    handle: Handle<T>,
    seq: u64,
    site: &'static Location<'static>,
}

impl<T: 'static> TokenCore<T> {
    fn mint(
        scheduler: &Scheduler<T>,
        handle: &Handle<T>,
        site: &'static Location<'static>,
    ) -> Self {
        let inner = &handle.inner;

        let seq = inner.next_seq.get();
        inner.next_seq.set(seq + 1);
        inner.token.set(TokenSlot::Current { seq, site });
        inner.minted_this_step.set(true);

        TokenCore {
            scheduler: scheduler.clone(),
            handle: handle.clone(),
            seq,
            site,
        }
    }

    /// Consume the token iff it is still the handle's current one.
    fn claim(&self) -> Result<(), SchedulerError> {
        let inner = &self.handle.inner;

        if inner.done.get() {
            return Err(SchedulerError::FinishedHandle { stale: self.site });
        }

        match inner.token.get() {
            TokenSlot::Current { seq, .. } if seq == self.seq => {
                inner.token.set(TokenSlot::Vacant);
                Ok(())
            }
            TokenSlot::Current { site, .. } => Err(SchedulerError::StaleToken {
                stale: self.site,
                current: site,
            }),
            TokenSlot::Vacant => Err(SchedulerError::SpentToken { stale: self.site }),
        }
    }

    fn fire_next(&self, args: Vec<T>) -> Result<(), SchedulerError> {
        self.claim()?;
        self.scheduler.advance(&self.handle, Resume::Next(args))
    }

    fn fire_throw(&self, err: Failure) -> Result<(), SchedulerError> {
        self.claim()?;
        self.scheduler.advance(&self.handle, Resume::Throw(err))
    }
}

impl<T> Clone for TokenCore<T> {
    fn clone(&self) -> Self {
        TokenCore {
            scheduler: self.scheduler.clone(),
            handle: self.handle.clone(),
            seq: self.seq,
            site: self.site,
        }
    }
}
