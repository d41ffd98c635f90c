use crate::coroutine::BoxCoroutine;
use crate::runtime::Scheduler;
use crate::task::{Failure, Handle, SchedulerError};
use std::cell::RefCell;
use std::mem;
use std::rc::Rc;
use tracing::debug;

type OnDone<T> = Box<dyn FnOnce(Vec<Option<T>>, Vec<Option<Failure>>)>;

type Finished<T> = (OnDone<T>, Vec<Option<T>>, Vec<Option<Failure>>);

/// Positional slots for one fan-out/join.
struct JoinState<T> {
    results: Vec<Option<T>>,
    errors: Vec<Option<Failure>>,
    settled: usize,
    on_done: Option<OnDone<T>>,
}

impl<T> JoinState<T> {
    fn new(count: usize, on_done: OnDone<T>) -> Self {
        JoinState {
            results: (0..count).map(|_| None).collect(),
            errors: (0..count).map(|_| None).collect(),
            settled: 0,
            on_done: Some(on_done),
        }
    }

    /// Write slot `index` if it is unset; a duplicate settlement is a no-op.
    /// Hands back the completion callback and the collected slots once every
    /// index has settled.
    fn settle(&mut self, index: usize, outcome: Result<T, Failure>) -> Option<Finished<T>> {
        if self.results[index].is_some() || self.errors[index].is_some() {
            return None;
        }

        match outcome {
            Ok(value) => self.results[index] = Some(value),
            Err(err) => self.errors[index] = Some(err),
        }
        self.settled += 1;

        if self.settled < self.results.len() {
            return None;
        }
        self.on_done
            .take()
            .map(|on_done| (on_done, mem::take(&mut self.results), mem::take(&mut self.errors)))
    }
}

impl<T: 'static> Scheduler<T> {
    /// Fan out one coroutine per factory and join on positional outcomes.
    ///
    /// `on_done` fires exactly once, when every index has settled, with
    /// index-aligned result and error slots: an index that failed has an
    /// empty result and vice versa. Completion order does not affect slot
    /// order. An empty factory list settles immediately.
    pub fn join_all<F>(
        &self,
        factories: Vec<F>,
        on_done: impl FnOnce(Vec<Option<T>>, Vec<Option<Failure>>) + 'static,
    ) -> Result<(), SchedulerError>
    where
        F: FnOnce(Handle<T>, Option<T>) -> BoxCoroutine<T>,
    {
        let count = factories.len();
        if count == 0 {
            on_done(Vec::new(), Vec::new());
            return Ok(());
        }

        debug!(count, "fanning out");
        let state = Rc::new(RefCell::new(JoinState::new(count, Box::new(on_done))));

        for (index, factory) in factories.into_iter().enumerate() {
            let on_success = {
                let state = state.clone();
                Box::new(move |value: T| finish(&state, index, Ok(value)))
            };
            let on_error = {
                let state = state.clone();
                Box::new(move |err: Failure| finish(&state, index, Err(err)))
            };
            self.start(factory, None, Some(on_success), Some(on_error))?;
        }

        Ok(())
    }
}

/// Settle under the borrow, invoke the completion callback outside it: the
/// callback is arbitrary user code and may start new coroutines.
fn finish<T>(state: &Rc<RefCell<JoinState<T>>>, index: usize, outcome: Result<T, Failure>) {
    let finished = state.borrow_mut().settle(index, outcome);
    if let Some((on_done, results, errors)) = finished {
        on_done(results, errors);
    }
}
