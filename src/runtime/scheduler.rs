use crate::coroutine::{BoxCoroutine, Resume};
use crate::runtime::ThrottleGroup;
use crate::task::{Handle, OnError, OnSuccess, SchedulerError};
#[allow(unused)]
use crate::utils::tracker::{Call, Method, Tracker};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::rc::Rc;
use tracing::debug;

type Deferred = Box<dyn FnOnce() -> Result<(), SchedulerError>>;

/// The single-threaded cooperative scheduler.
///
/// Owns the deferred "next tick" queue and the throttle-group registry.
/// Cloning is cheap (a reference-count bump) and every clone drives the same
/// queue; the type is deliberately `!Send` and `!Sync`.
///
/// Only one coroutine body ever executes at a time. Control returns here at
/// yield points, and external resumptions that could otherwise re-enter the
/// driver synchronously are pushed through [`defer`] so they run after the
/// current call stack unwinds, in FIFO order.
///
/// [`defer`]: Scheduler::defer
pub struct Scheduler<T> {
    pub(crate) core: Rc<Core<T>>,
}

pub(crate) struct Core<T> {
    pub(crate) deferred: RefCell<VecDeque<Deferred>>,

    /// Explicit group-key registry; throttle state lives here, not on the
    /// coroutines.
    pub(crate) groups: RefCell<HashMap<String, ThrottleGroup<T>>>,

    #[cfg(test)]
    pub(crate) tracker: Tracker,
}

impl<T: 'static> Scheduler<T> {
    pub fn new() -> Self {
        Scheduler {
            core: Rc::new(Core {
                deferred: RefCell::new(VecDeque::new()),
                groups: RefCell::new(HashMap::new()),

                #[cfg(test)]
                tracker: Tracker::new(),
            }),
        }
    }

    /// Begin a coroutine.
    ///
    /// The factory receives the new handle and the initial argument and
    /// returns the root coroutine; one resumption step with no input runs
    /// before `start` returns. Omitting `on_error` makes a coroutine failure
    /// fatal: it surfaces as [`SchedulerError::Fatal`] from whatever call
    /// drove the failing step — this one, a token fire, or [`run`].
    ///
    /// [`run`]: Scheduler::run
    pub fn start<F>(
        &self,
        factory: F,
        arg: Option<T>,
        on_success: Option<OnSuccess<T>>,
        on_error: Option<OnError>,
    ) -> Result<Handle<T>, SchedulerError>
    where
        F: FnOnce(Handle<T>, Option<T>) -> BoxCoroutine<T>,
    {
        let handle = Handle::new(on_success, on_error);
        self.track(Method::Start, Call::Start { id: handle.id() });

        let root = factory(handle.clone(), arg);
        handle.inner.stack.borrow_mut().push(root);

        debug!(id = %handle.id(), "starting coroutine");
        self.advance(&handle, Resume::empty())?;

        Ok(handle)
    }

    /// Schedule `f` to run after the current synchronous call stack unwinds.
    ///
    /// Deferred callbacks run in FIFO order relative to each other when
    /// [`run`] drains the queue.
    ///
    /// [`run`]: Scheduler::run
    pub fn defer(&self, f: impl FnOnce() + 'static) {
        self.defer_fallible(move || {
            f();
            Ok(())
        });
    }

    pub(crate) fn defer_fallible(
        &self,
        f: impl FnOnce() -> Result<(), SchedulerError> + 'static,
    ) {
        self.track(Method::Defer, Call::Defer);
        self.core.deferred.borrow_mut().push_back(Box::new(f));
    }

    /// Drain the deferred queue until it is empty.
    ///
    /// This is the enclosing execution context for every deferred resumption:
    /// an unhandled coroutine failure or a broken-control-flow violation in a
    /// deferred callback stops the drain and surfaces here. The queue is left
    /// as-is on error; the scheduler never retries a failed step.
    pub fn run(&self) -> Result<(), SchedulerError> {
        loop {
            let next = self.core.deferred.borrow_mut().pop_front();
            match next {
                Some(f) => f()?,
                None => return Ok(()),
            }
        }
    }

    // Gives tests visibility into every scheduler call. Compiles to nothing
    // in release builds.
    #[allow(unused)]
    #[inline(always)]
    pub(crate) fn track(&self, method: Method, call: Call) {
        #[cfg(test)]
        self.core.tracker.record(method, call);
    }

    #[cfg(test)]
    pub(crate) fn tracked_ids(&self, method: Method) -> Vec<crate::task::Id> {
        self.core.tracker.ids(method)
    }
}

impl<T: 'static> Default for Scheduler<T> {
    fn default() -> Self {
        Scheduler::new()
    }
}

impl<T> Clone for Scheduler<T> {
    fn clone(&self) -> Self {
        Scheduler {
            core: Rc::clone(&self.core),
        }
    }
}

impl<T> fmt::Debug for Scheduler<T> {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("Scheduler")
            .field("deferred", &self.core.deferred.borrow().len())
            .field("groups", &self.core.groups.borrow().len())
            .finish()
    }
}
