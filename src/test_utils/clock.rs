use std::cell::{Cell, RefCell};

struct Timer {
    deadline: u64,
    seq: u64,
    callback: Box<dyn FnOnce()>,
}

/// Deterministic stand-in for timer-based external events.
///
/// Tests register callbacks at virtual deadlines and fire them in deadline
/// order (registration order breaks ties); no real time is involved.
#[derive(Default)]
pub(crate) struct FakeClock {
    now: Cell<u64>,
    next_seq: Cell<u64>,
    timers: RefCell<Vec<Timer>>,
}

impl FakeClock {
    pub(crate) fn new() -> Self {
        FakeClock::default()
    }

    pub(crate) fn now(&self) -> u64 {
        self.now.get()
    }

    /// Register `callback` to fire `delay` virtual milliseconds from now.
    pub(crate) fn schedule(&self, delay: u64, callback: impl FnOnce() + 'static) {
        let seq = self.next_seq.get();
        self.next_seq.set(seq + 1);
        self.timers.borrow_mut().push(Timer {
            deadline: self.now.get() + delay,
            seq,
            callback: Box::new(callback),
        });
    }

    /// Fire the earliest registered timer, advancing the clock to its
    /// deadline. Returns false when no timer is left.
    pub(crate) fn fire_next(&self) -> bool {
        let next = {
            let mut timers = self.timers.borrow_mut();
            let Some(pos) = timers
                .iter()
                .enumerate()
                .min_by_key(|(_, timer)| (timer.deadline, timer.seq))
                .map(|(pos, _)| pos)
            else {
                return false;
            };
            timers.swap_remove(pos)
        };

        self.now.set(next.deadline.max(self.now.get()));
        (next.callback)();
        true
    }

    pub(crate) fn pending(&self) -> usize {
        self.timers.borrow().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn test_timers_fire_in_deadline_order_with_registration_tiebreak() {
        let clock = FakeClock::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        for (delay, label) in [(500, "slow"), (100, "fast-a"), (100, "fast-b")] {
            let order = order.clone();
            clock.schedule(delay, move || order.borrow_mut().push(label));
        }

        while clock.fire_next() {}

        assert_eq!(*order.borrow(), vec!["fast-a", "fast-b", "slow"]);
        assert_eq!(clock.now(), 500);
        assert_eq!(clock.pending(), 0);
    }
}
