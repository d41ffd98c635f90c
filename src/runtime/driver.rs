use crate::coroutine::{Directive, Resume, Step};
use crate::runtime::Scheduler;
use crate::task::{
    ErrorFirstToken, Failure, Handle, ResumeToken, SchedulerError, TokenSlot, UncheckedToken,
};
use crate::utils::ScopeGuard;
use crate::utils::tracker::{Call, Method};
use std::panic::Location;
use tracing::{debug, trace};

/// Ambient reference to the currently executing coroutine.
///
/// A context exists only for the duration of one resume call, which is what
/// scopes token minting: a token can only be requested by the coroutine that
/// is about to suspend on it. There is no process-wide "current coroutine"
/// state anywhere.
pub struct Context<'a, T> {
    pub(crate) scheduler: &'a Scheduler<T>,
    pub(crate) handle: &'a Handle<T>,
}

impl<'a, T: 'static> Context<'a, T> {
    /// Mint a fresh resume token for this coroutine, invalidating any
    /// previously minted one.
    #[track_caller]
    pub fn token(&self) -> ResumeToken<T> {
        ResumeToken::mint(self.scheduler, self.handle, Location::caller())
    }

    /// Mint a resume token following the error-first callback convention.
    #[track_caller]
    pub fn error_first_token(&self) -> ErrorFirstToken<T> {
        ErrorFirstToken::mint(self.scheduler, self.handle, Location::caller())
    }

    /// Mint a resume capability with no freshness discipline. See
    /// [`UncheckedToken`] for the tradeoff.
    pub fn unchecked_token(&self) -> UncheckedToken<T> {
        self.handle.inner.minted_this_step.set(true);
        UncheckedToken::new(self.scheduler, self.handle)
    }

    pub fn scheduler(&self) -> Scheduler<T> {
        self.scheduler.clone()
    }

    pub fn handle(&self) -> Handle<T> {
        self.handle.clone()
    }
}

impl<T: 'static> Scheduler<T> {
    /// Advance a coroutine by feeding `input` into its current suspension
    /// point and interpreting whatever it does next.
    pub(crate) fn advance(
        &self,
        handle: &Handle<T>,
        input: Resume<T>,
    ) -> Result<(), SchedulerError> {
        let inner = &handle.inner;

        if inner.done.get() {
            return Ok(());
        }

        if inner.advancing.get() {
            // A resume fired while an advance for this handle is already on
            // the call stack; the in-progress loop picks it up instead of
            // recursing.
            *inner.reentry.borrow_mut() = Some(input);
            return Ok(());
        }

        self.track(Method::Advance, Call::Advance { id: inner.id });

        inner.advancing.set(true);
        let _guard = ScopeGuard::new(|| inner.advancing.set(false));

        let mut input = input;
        loop {
            let Some(mut top) = inner.stack.borrow_mut().pop() else {
                return Ok(());
            };

            inner.minted_this_step.set(false);
            trace!(id = %inner.id, depth = inner.stack.borrow().len() + 1, "resuming");

            let step = top.resume(
                &mut Context {
                    scheduler: self,
                    handle,
                },
                input,
            );

            if let Some(queued) = inner.reentry.borrow_mut().take() {
                // The step result is superseded by the resume that fired
                // synchronously during it.
                inner.stack.borrow_mut().push(top);
                input = queued;
                continue;
            }

            match step {
                Err(err) => return self.finish_error(handle, err),
                Ok(Step::Complete(value)) => {
                    if inner.stack.borrow().is_empty() {
                        return self.finish_success(handle, value);
                    }
                    // A nested coroutine finished; its value resumes the
                    // coroutine that pushed it.
                    input = Resume::Next(vec![value]);
                }
                Ok(Step::Yielded(directive)) => {
                    inner.stack.borrow_mut().push(top);
                    match directive {
                        Directive::Park => return Ok(()),
                        Directive::Nested(child) => {
                            inner.stack.borrow_mut().push(child);
                            input = Resume::empty();
                        }
                        Directive::Await { target, site } => {
                            if inner.minted_this_step.get() {
                                // An explicitly minted token owns this
                                // suspension; the awaitable is not subscribed.
                                return Ok(());
                            }
                            self.bridge(handle, target, site);
                            return Ok(());
                        }
                        Directive::Throttle(request) => {
                            self.admit(handle, request);
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    fn finish_success(&self, handle: &Handle<T>, value: T) -> Result<(), SchedulerError> {
        let inner = &handle.inner;
        inner.done.set(true);
        inner.token.set(TokenSlot::Vacant);

        debug!(id = %inner.id, "coroutine complete");
        self.schedule_group_maintenance(handle);

        if let Some(on_success) = inner.on_success.borrow_mut().take() {
            on_success(value);
        }
        Ok(())
    }

    fn finish_error(&self, handle: &Handle<T>, err: Failure) -> Result<(), SchedulerError> {
        let inner = &handle.inner;
        inner.done.set(true);
        inner.token.set(TokenSlot::Vacant);
        inner.stack.borrow_mut().clear();

        debug!(id = %inner.id, error = %err, "coroutine failed");
        self.schedule_group_maintenance(handle);

        match inner.on_error.borrow_mut().take() {
            Some(on_error) => {
                on_error(err);
                Ok(())
            }
            None => Err(SchedulerError::Fatal(err)),
        }
    }

    /// Completed handles occupy their throttle groups until the next sweep;
    /// run one on the next tick so pending members get promoted.
    fn schedule_group_maintenance(&self, handle: &Handle<T>) {
        for group in handle.inner.groups.borrow().iter() {
            let scheduler = self.clone();
            let group = group.clone();
            self.defer_fallible(move || {
                scheduler.sweep_and_promote(&group);
                Ok(())
            });
        }
    }
}
