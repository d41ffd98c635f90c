use crate::coroutine::{BoxCoroutine, Resume};
use crate::task::{Failure, Id};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::panic::Location;
use std::rc::Rc;

pub type OnSuccess<T> = Box<dyn FnOnce(T)>;
pub type OnError = Box<dyn FnOnce(Failure)>;

/// The scheduler-owned record tracking one top-level coroutine invocation.
///
/// A handle wraps the root coroutine plus a stack of nested coroutines (an
/// inline sub-workflow pushes onto the stack and pops back to its caller on
/// completion), the freshness state of the currently valid resume token, and
/// the completion callbacks supplied at start.
///
/// Handles are reference counted and deliberately `!Send`: every mutation
/// happens on the one logical thread that drives the scheduler.
pub struct Handle<T> {
    pub(crate) inner: Rc<HandleInner<T>>,
}

impl<T> Handle<T> {
    pub(crate) fn new(on_success: Option<OnSuccess<T>>, on_error: Option<OnError>) -> Self {
        Handle {
            inner: Rc::new(HandleInner {
                id: Id::next(),
                stack: RefCell::new(Vec::new()),
                done: Cell::new(false),
                advancing: Cell::new(false),
                reentry: RefCell::new(None),
                token: Cell::new(TokenSlot::Vacant),
                next_seq: Cell::new(1),
                minted_this_step: Cell::new(false),
                on_success: RefCell::new(on_success),
                on_error: RefCell::new(on_error),
                groups: RefCell::new(Vec::new()),
            }),
        }
    }

    pub fn id(&self) -> Id {
        self.inner.id
    }

    /// Whether the coroutine has completed (successfully or with an error).
    pub fn is_done(&self) -> bool {
        self.inner.done.get()
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        Handle {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("Handle")
            .field("id", &self.id())
            .field("done", &self.is_done())
            .finish()
    }
}

pub(crate) struct HandleInner<T> {
    pub(crate) id: Id,

    /// Root coroutine at the bottom, innermost nested coroutine on top.
    pub(crate) stack: RefCell<Vec<BoxCoroutine<T>>>,

    pub(crate) done: Cell<bool>,

    /// True while an advance for this handle is on the call stack. A resume
    /// that fires during that window is parked in `reentry` instead of
    /// recursing.
    pub(crate) advancing: Cell<bool>,
    pub(crate) reentry: RefCell<Option<Resume<T>>>,

    /// Freshness state of the currently valid resume token, if any. Minting
    /// replaces it; firing vacates it. This one cell substitutes for any
    /// locking: a resumption that does not match is stale and reportable.
    pub(crate) token: Cell<TokenSlot>,
    pub(crate) next_seq: Cell<u64>,

    /// Set by every mint during the current driver step; an awaitable yielded
    /// in a step that also minted a token is not auto-subscribed.
    pub(crate) minted_this_step: Cell<bool>,

    pub(crate) on_success: RefCell<Option<OnSuccess<T>>>,
    pub(crate) on_error: RefCell<Option<OnError>>,

    /// Throttle groups this handle ever joined; swept when it completes.
    pub(crate) groups: RefCell<Vec<String>>,
}

#[derive(Clone, Copy, Debug)]
pub(crate) enum TokenSlot {
    /// No token is currently valid (none minted yet, or the last one fired).
    Vacant,

    Current {
        seq: u64,
        site: &'static Location<'static>,
    },
}
