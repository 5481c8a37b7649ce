use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::future::TaskOutput;
use super::TaskFuture;

/// A counted observer view of a [`Task`](super::Task)'s eventual value.
///
/// Every live `TaskResult` of the current run contributes 1 to a shared
/// observer count; cloning bumps it, dropping releases it. When the count
/// reaches zero while the run is still in the pool, the task's effective
/// cancel predicate observes "no observers" and aborts the run with
/// [`TaskError::Incomplete`](super::TaskError::Incomplete).
///
/// The count is split from the strong reference that keeps the result cell
/// alive: the handle keeps the cell reachable without counting as an
/// observer, so the view returned by `share` seeds the count at exactly 1.
pub struct TaskResult<T> {
    inner: Option<Inner<T>>,
}

struct Inner<T> {
    future: TaskFuture<T>,
    observers: Arc<AtomicI32>,
}

impl<T> TaskResult<T> {
    /// An empty view, bound to no task. Never ready, count 0.
    pub fn empty() -> Self {
        Self { inner: None }
    }

    pub(crate) fn new(future: TaskFuture<T>, observers: Arc<AtomicI32>) -> Self {
        observers.fetch_add(1, Ordering::AcqRel);
        Self {
            inner: Some(Inner { future, observers }),
        }
    }

    /// The number of live views of this run, this one included.
    pub fn count(&self) -> i32 {
        match &self.inner {
            Some(inner) => inner.observers.load(Ordering::Acquire),
            None => 0,
        }
    }

    /// Whether this view is bound to a task at all.
    pub fn is_empty(&self) -> bool {
        self.inner.is_none()
    }

    /// Blocks until the task has terminated. Returns immediately on an empty
    /// view.
    pub fn wait(&self) {
        if let Some(inner) = &self.inner {
            inner.future.wait();
        }
    }

    /// Blocks for at most `timeout`; returns whether the output is ready.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        match &self.inner {
            Some(inner) => inner.future.wait_timeout(timeout),
            None => false,
        }
    }

    /// Blocks until `deadline` at the latest; returns whether the output is
    /// ready.
    pub fn wait_until(&self, deadline: Instant) -> bool {
        match &self.inner {
            Some(inner) => inner.future.wait_until(deadline),
            None => false,
        }
    }

    pub fn is_ready(&self) -> bool {
        match &self.inner {
            Some(inner) => inner.future.is_ready(),
            None => false,
        }
    }
}

impl<T: Clone> TaskResult<T> {
    /// Blocks until the task terminates, then returns a copy of its output.
    ///
    /// # Panics
    ///
    /// Panics if the view is empty.
    pub fn get(&self) -> TaskOutput<T> {
        self.inner
            .as_ref()
            .expect("called `get` on an empty TaskResult")
            .future
            .get()
    }
}

impl<T> Clone for TaskResult<T> {
    fn clone(&self) -> Self {
        match &self.inner {
            Some(inner) => Self::new(inner.future.clone(), Arc::clone(&inner.observers)),
            None => Self::empty(),
        }
    }
}

impl<T> Drop for TaskResult<T> {
    fn drop(&mut self) {
        if let Some(inner) = &self.inner {
            inner.observers.fetch_sub(1, Ordering::AcqRel);
        }
    }
}

impl<T> Default for TaskResult<T> {
    fn default() -> Self {
        Self::empty()
    }
}
