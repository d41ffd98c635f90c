use crate::runtime::Awaitable;
use crate::task::Failure;
use std::cell::RefCell;
use std::rc::Rc;

type Subscriber<T> = (Box<dyn FnOnce(T)>, Box<dyn FnOnce(Failure)>);

enum PromiseState<T> {
    Pending(Option<Subscriber<T>>),
    Settled(Option<Result<T, Failure>>),
}

/// A minimal externally-completable promise for bridge tests.
///
/// Settles at most once and delivers to at most one subscriber, whichever
/// side arrives second.
pub(crate) struct CompletablePromise<T> {
    state: Rc<RefCell<PromiseState<T>>>,
}

impl<T> CompletablePromise<T> {
    pub(crate) fn new() -> Self {
        CompletablePromise {
            state: Rc::new(RefCell::new(PromiseState::Pending(None))),
        }
    }

    pub(crate) fn fulfill(&self, value: T) {
        self.settle(Ok(value));
    }

    pub(crate) fn reject(&self, err: Failure) {
        self.settle(Err(err));
    }

    fn settle(&self, outcome: Result<T, Failure>) {
        let delivery = {
            let mut state = self.state.borrow_mut();
            match &mut *state {
                PromiseState::Pending(subscriber) => match subscriber.take() {
                    Some(subscriber) => {
                        *state = PromiseState::Settled(None);
                        Some((subscriber, outcome))
                    }
                    None => {
                        *state = PromiseState::Settled(Some(outcome));
                        None
                    }
                },
                PromiseState::Settled(_) => panic!("promise settled twice"),
            }
        };

        if let Some(((on_fulfilled, on_rejected), outcome)) = delivery {
            match outcome {
                Ok(value) => on_fulfilled(value),
                Err(err) => on_rejected(err),
            }
        }
    }
}

impl<T> Clone for CompletablePromise<T> {
    fn clone(&self) -> Self {
        CompletablePromise {
            state: Rc::clone(&self.state),
        }
    }
}

impl<T> Awaitable<T> for CompletablePromise<T> {
    fn then(
        self: Box<Self>,
        on_fulfilled: Box<dyn FnOnce(T)>,
        on_rejected: Box<dyn FnOnce(Failure)>,
    ) {
        let mut state = self.state.borrow_mut();
        match &mut *state {
            PromiseState::Pending(subscriber) => {
                *subscriber = Some((on_fulfilled, on_rejected));
            }
            PromiseState::Settled(outcome) => {
                let outcome = outcome.take().expect("settlement already delivered");
                drop(state);
                match outcome {
                    Ok(value) => on_fulfilled(value),
                    Err(err) => on_rejected(err),
                }
            }
        }
    }
}
