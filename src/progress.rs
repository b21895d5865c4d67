//! Shared progress counters for one install operation.

use std::sync::Arc;

use parking_lot::Mutex;

/// Point-in-time copy of the counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Counters {
    /// Dependencies discovered so far.
    pub todo: usize,
    /// Calls that actually reached the content store.
    pub fetch_calls: usize,
    /// Packages that ended up freshly written to disk.
    pub fetched: usize,
    pub failed: usize,
    pub hooks_run: usize,
    /// Hooks skipped because the completion marker was already present.
    pub hooks_skipped: usize,
}

/// Mutex-guarded counters, cheap to clone into worker closures.
#[derive(Clone, Debug, Default)]
pub struct Progress {
    inner: Arc<Mutex<Counters>>,
}

impl Progress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_todos(&self, n: usize) {
        self.inner.lock().todo += n;
    }

    pub fn record_fetch_call(&self) {
        self.inner.lock().fetch_calls += 1;
    }

    pub fn record_fetched(&self) {
        self.inner.lock().fetched += 1;
    }

    pub fn record_failed(&self) {
        self.inner.lock().failed += 1;
    }

    pub fn record_hook(&self) {
        self.inner.lock().hooks_run += 1;
    }

    pub fn record_hook_skipped(&self) {
        self.inner.lock().hooks_skipped += 1;
    }

    pub fn snapshot(&self) -> Counters {
        *self.inner.lock()
    }
}
