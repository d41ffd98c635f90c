use crate::coroutine::ThrottleRequest;
use crate::runtime::Scheduler;
use crate::task::{Handle, ResumeToken};
use crate::utils::tracker::{Call, Method};
use std::collections::VecDeque;
use tracing::debug;

/// Bounded admission queue for coroutines sharing a group key.
pub(crate) struct ThrottleGroup<T> {
    /// Handles currently counted against the limit. The bound is enforced at
    /// admission time only; a later request with a smaller limit does not
    /// evict already-active members.
    active: Vec<Handle<T>>,

    /// Waiting requests, promoted strictly FIFO: the head moves only when
    /// its own limit admits it, and nothing behind it moves before it.
    pending: VecDeque<PendingEntry<T>>,
}

struct PendingEntry<T> {
    handle: Handle<T>,
    token: ResumeToken<T>,
    limit: usize,
}

impl<T> ThrottleGroup<T> {
    fn new() -> Self {
        ThrottleGroup {
            active: Vec::new(),
            pending: VecDeque::new(),
        }
    }

    /// Drop completed handles from the active set.
    fn sweep(&mut self) {
        self.active.retain(|handle| !handle.is_done());
    }
}

impl<T: 'static> Scheduler<T> {
    /// Admission half of a throttle directive: either the handle joins the
    /// active set and resumes on the next tick, or it queues.
    pub(crate) fn admit(&self, handle: &Handle<T>, request: ThrottleRequest) {
        let ThrottleRequest { group, limit, site } = request;

        {
            let mut joined = handle.inner.groups.borrow_mut();
            if !joined.contains(&group) {
                joined.push(group.clone());
            }
        }

        let token = ResumeToken::mint(self, handle, site);

        let admitted = {
            let mut groups = self.core.groups.borrow_mut();
            let state = groups.entry(group.clone()).or_insert_with(ThrottleGroup::new);
            state.sweep();

            if state.active.len() < limit {
                state.active.push(handle.clone());
                Some(token)
            } else {
                state.pending.push_back(PendingEntry {
                    handle: handle.clone(),
                    token,
                    limit,
                });
                None
            }
        };

        match admitted {
            Some(token) => {
                debug!(id = %handle.id(), group = %group, limit, "admitted");
                self.track(
                    Method::Admit,
                    Call::Admit {
                        id: handle.id(),
                        queued: false,
                    },
                );
                self.defer_fire(token);
            }
            None => {
                debug!(id = %handle.id(), group = %group, limit, "throttled");
                self.track(
                    Method::Admit,
                    Call::Admit {
                        id: handle.id(),
                        queued: true,
                    },
                );
            }
        }
    }

    /// Maintenance half, run after any member of the group completes: sweep
    /// out finished handles, then promote pending entries in FIFO order
    /// while the head's own limit admits it.
    pub(crate) fn sweep_and_promote(&self, group: &str) {
        let mut promoted = Vec::new();
        {
            let mut groups = self.core.groups.borrow_mut();
            let Some(state) = groups.get_mut(group) else {
                return;
            };
            state.sweep();

            while let Some(head) = state.pending.front() {
                if state.active.len() >= head.limit {
                    break;
                }
                let entry = state.pending.pop_front().expect("head just observed");
                debug!(id = %entry.handle.id(), group = %group, limit = entry.limit, "promoted");
                self.track(Method::Promote, Call::Promote { id: entry.handle.id() });
                state.active.push(entry.handle);
                promoted.push(entry.token);
            }
        }

        for token in promoted {
            self.defer_fire(token);
        }
    }

    fn defer_fire(&self, token: ResumeToken<T>) {
        self.defer_fallible(move || token.fire(Vec::new()));
    }

    #[cfg(test)]
    pub(crate) fn active_count(&self, group: &str) -> usize {
        self.core
            .groups
            .borrow()
            .get(group)
            .map_or(0, |state| state.active.len())
    }

    #[cfg(test)]
    pub(crate) fn pending_count(&self, group: &str) -> usize {
        self.core
            .groups
            .borrow()
            .get(group)
            .map_or(0, |state| state.pending.len())
    }
}
