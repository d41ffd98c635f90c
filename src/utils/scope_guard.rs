/// Runs a closure when it goes out of scope, whether the scope exits
/// normally, through an early return, or by panic.
pub(crate) struct ScopeGuard<F: FnOnce()> {
    // Wrapped in an `Option` so the closure can be taken out exactly once
    // on drop.
    closure: Option<F>,
}

impl<F: FnOnce()> ScopeGuard<F> {
    pub(crate) fn new(closure: F) -> Self {
        ScopeGuard {
            closure: Some(closure),
        }
    }
}

impl<F: FnOnce()> Drop for ScopeGuard<F> {
    fn drop(&mut self) {
        if let Some(closure) = self.closure.take() {
            closure();
        }
    }
}
