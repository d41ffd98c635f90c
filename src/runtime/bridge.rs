use crate::coroutine::Resume;
use crate::runtime::Scheduler;
use crate::task::{Failure, Handle};
use std::panic::Location;
use tracing::trace;

/// The promise interop surface.
///
/// Any value that can deliver exactly one fulfillment or rejection to a pair
/// of one-shot callbacks can be awaited by yielding it. The scheduler
/// subscribes a single fulfillment/rejection pair on suspension and resumes
/// the coroutine on settlement; nothing else about the promise is assumed.
pub trait Awaitable<T> {
    fn then(
        self: Box<Self>,
        on_fulfilled: Box<dyn FnOnce(T)>,
        on_rejected: Box<dyn FnOnce(Failure)>,
    );
}

impl<T: 'static> Scheduler<T> {
    /// Subscribe the coroutine's continuation to an awaitable it yielded.
    ///
    /// Both continuations defer to the next tick before resuming, so an
    /// error raised by the resumed coroutine cannot be intercepted by the
    /// promise implementation's own settlement machinery. A rejection is
    /// annotated with the suspension site before it reaches the coroutine's
    /// throw path, so a bare error still names the yield that awaited it.
    pub(crate) fn bridge(
        &self,
        handle: &Handle<T>,
        target: Box<dyn Awaitable<T>>,
        site: &'static Location<'static>,
    ) {
        trace!(id = %handle.id(), %site, "awaiting");

        let on_fulfilled = {
            let scheduler = self.clone();
            let handle = handle.clone();
            Box::new(move |value: T| {
                let inner = scheduler.clone();
                scheduler
                    .defer_fallible(move || inner.advance(&handle, Resume::Next(vec![value])));
            })
        };

        let on_rejected = {
            let scheduler = self.clone();
            let handle = handle.clone();
            Box::new(move |err: Failure| {
                let err = err.context(format!("rejection delivered to the await at {site}"));
                let inner = scheduler.clone();
                scheduler.defer_fallible(move || inner.advance(&handle, Resume::Throw(err)));
            })
        };

        target.then(on_fulfilled, on_rejected);
    }
}
