#![allow(unused)]

use crate::task::Id;
use std::cell::RefCell;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Method {
    Start,
    Advance,
    Defer,
    Admit,
    Promote,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Start { id: Id },
    Advance { id: Id },
    Defer,
    Admit { id: Id, queued: bool },
    Promote { id: Id },
}

impl Call {
    fn id(&self) -> Option<Id> {
        match self {
            Call::Start { id }
            | Call::Advance { id }
            | Call::Promote { id }
            | Call::Admit { id, .. } => Some(*id),
            Call::Defer => None,
        }
    }
}

/// Records every scheduler call during tests so expectations can be written
/// against what actually happened. See `Scheduler::track`.
#[derive(Debug, Default)]
pub(crate) struct Tracker {
    calls: RefCell<HashMap<Method, Vec<Call>>>,
}

impl Tracker {
    pub(crate) fn new() -> Self {
        Tracker::default()
    }

    pub(crate) fn record(&self, method: Method, call: Call) {
        self.calls.borrow_mut().entry(method).or_default().push(call);
    }

    pub(crate) fn get_calls(&self, method: Method) -> Vec<Call> {
        self.calls
            .borrow()
            .get(&method)
            .cloned()
            .unwrap_or_default()
    }

    pub(crate) fn num_calls(&self, method: Method) -> usize {
        self.calls.borrow().get(&method).map_or(0, |calls| calls.len())
    }

    pub(crate) fn ids(&self, method: Method) -> Vec<Id> {
        self.get_calls(method).iter().filter_map(Call::id).collect()
    }
}
