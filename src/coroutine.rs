use crate::runtime::{Awaitable, Context};
use crate::task::Failure;
use std::panic::Location;

/// A suspendable computation driven by the scheduler.
///
/// This is the whole contract between a workflow body and the driver loop:
/// each call to [`resume`] runs the body until its next suspension point and
/// reports what happened as a [`Step`]. The scheduler never inspects the body
/// beyond this trait, so a coroutine can be a hand-rolled state machine, a
/// [`from_fn`] closure, or anything else that keeps its own position between
/// calls.
///
/// `T` is the value domain shared by resume arguments, completion values and
/// nested-coroutine results.
///
/// [`resume`]: Coroutine::resume
pub trait Coroutine<T> {
    /// Advance the computation with `input` until it suspends or finishes.
    ///
    /// `Resume::Throw` delivers an error into the body at its current
    /// suspension point; a body that does not handle it should propagate it
    /// with `input.args()?`.
    fn resume(&mut self, cx: &mut Context<'_, T>, input: Resume<T>) -> StepResult<T>;
}

pub type BoxCoroutine<T> = Box<dyn Coroutine<T>>;

/// Outcome of one resumption: suspended on a directive, or finished.
pub type StepResult<T> = Result<Step<T>, Failure>;

/// What the driver feeds into a coroutine at a resumption.
#[derive(Debug)]
pub enum Resume<T> {
    /// Positional arguments supplied by whatever external event fired the
    /// resume token (or the completion value of a nested coroutine).
    Next(Vec<T>),

    /// An error delivered into the suspension point.
    Throw(Failure),
}

impl<T> Resume<T> {
    pub(crate) fn empty() -> Self {
        Resume::Next(Vec::new())
    }

    /// Unwrap the resume arguments, propagating a delivered error.
    ///
    /// This is the "I don't catch here" arm for coroutine bodies:
    /// `let args = input.args()?;`.
    pub fn args(self) -> Result<Vec<T>, Failure> {
        match self {
            Resume::Next(args) => Ok(args),
            Resume::Throw(err) => Err(err),
        }
    }
}

pub enum Step<T> {
    /// Suspended; the directive tells the driver what the coroutine is
    /// waiting for.
    Yielded(Directive<T>),

    /// Finished with a completion value.
    Complete(T),
}

/// Tagged suspension directives.
///
/// The driver dispatches on the tag alone; there is no runtime sniffing of
/// yielded values.
pub enum Directive<T> {
    /// Plain suspension. Nothing happens until a currently valid resume
    /// token for this coroutine fires.
    Park,

    /// Run an inline sub-workflow; the parent resumes with its completion
    /// value once it finishes.
    Nested(BoxCoroutine<T>),

    /// Await a promise-like value through the bridge.
    Await {
        target: Box<dyn Awaitable<T>>,
        site: &'static Location<'static>,
    },

    /// Ask for admission into a named throttle group.
    Throttle(ThrottleRequest),
}

/// Admission request carried by [`Directive::Throttle`].
pub struct ThrottleRequest {
    pub group: String,
    pub limit: usize,
    pub(crate) site: &'static Location<'static>,
}

impl<T> Step<T> {
    pub fn park() -> Self {
        Step::Yielded(Directive::Park)
    }

    /// Run an inline sub-workflow before continuing.
    pub fn nested(coroutine: BoxCoroutine<T>) -> Self {
        Step::Yielded(Directive::Nested(coroutine))
    }

    /// Suspend on a promise-like value. The construction site is recorded so
    /// a bare rejection can still name the yield that awaited it.
    #[track_caller]
    pub fn await_on(target: impl Awaitable<T> + 'static) -> Self {
        Step::Yielded(Directive::Await {
            target: Box::new(target),
            site: Location::caller(),
        })
    }

    /// Suspend until the named group has room for this coroutine.
    #[track_caller]
    pub fn throttle(group: impl Into<String>, limit: usize) -> Self {
        Step::Yielded(Directive::Throttle(ThrottleRequest {
            group: group.into(),
            limit,
            site: Location::caller(),
        }))
    }
}

/// Adapt a closure-based state machine into a boxed coroutine.
///
/// The closure owns whatever position tracking it needs (typically a step
/// counter captured by the closure) and is called once per resumption.
pub fn from_fn<T, F>(f: F) -> BoxCoroutine<T>
where
    T: 'static,
    F: FnMut(&mut Context<'_, T>, Resume<T>) -> StepResult<T> + 'static,
{
    Box::new(FnCoroutine(f))
}

struct FnCoroutine<F>(F);

impl<T, F> Coroutine<T> for FnCoroutine<F>
where
    F: FnMut(&mut Context<'_, T>, Resume<T>) -> StepResult<T>,
{
    fn resume(&mut self, cx: &mut Context<'_, T>, input: Resume<T>) -> StepResult<T> {
        (self.0)(cx, input)
    }
}
