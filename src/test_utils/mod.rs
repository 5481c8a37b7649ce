use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A string sink tasks append to, for asserting exact step interleavings.
#[derive(Clone, Default)]
pub(crate) struct SharedLog(Arc<Mutex<String>>);

impl SharedLog {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&self, entry: &str) {
        self.0.lock().push_str(entry);
    }

    pub(crate) fn contents(&self) -> String {
        self.0.lock().clone()
    }
}

/// Polls `pred` (yielding between attempts) until it holds or `timeout`
/// elapses. Returns the final verdict, so tests can bound wall-clock time
/// without sleeping for it.
pub(crate) fn eventually(timeout: Duration, mut pred: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if pred() {
            return true;
        }
        std::thread::yield_now();
    }
    pred()
}
