//! The fine-grained worker pool.
//!
//! Workers share one blocking FIFO of type-erased step-wise tasks. Each
//! worker pops a task, runs exactly one step, and re-enqueues the task at the
//! tail if it has not terminated, so ready tasks interleave at step
//! granularity. FIFO arrival order is approximate: a re-enqueued task lands
//! behind later submissions.

mod builder;
mod worker;

pub use builder::Builder;


use anyhow::anyhow;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, trace};

use crate::queue::BlockingQueue;
use crate::task::{PoolTask, Step, StepTask, TaskFuture};

pub(crate) struct Shared {
    pub(crate) tasks: BlockingQueue<Box<dyn PoolTask>>,
    pub(crate) is_working: AtomicBool,
}

/// A pool of worker threads that executes step-wise tasks by interleaving
/// their steps.
///
/// Dropping the pool shuts it down: the queue wait is disabled so idle
/// workers exit, in-flight tasks finish their current step, and tasks still
/// queued are completed with [`TaskError::Aborted`](crate::TaskError::Aborted)
/// so no consumer blocks on an abandoned promise.
pub struct FineGrainedPool {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

impl FineGrainedPool {
    /// Creates a pool with `threads` workers; `0` means one worker per
    /// detected hardware thread (falling back to a single worker when
    /// detection fails).
    pub fn new(threads: usize) -> io::Result<Self> {
        let mut builder = Builder::new();
        if threads > 0 {
            builder.worker_threads(threads);
        }
        builder.try_build()
    }

    pub(crate) fn from_parts(shared: Arc<Shared>, workers: Vec<JoinHandle<()>>) -> Self {
        Self { shared, workers }
    }

    /// Submits a step function with no cancel condition and no notice.
    ///
    /// The task is stepped repeatedly — one [`Step`] per turn, interleaved
    /// with every other queued task — until it yields [`Step::Done`].
    pub fn submit<T, F>(&self, f: F) -> TaskFuture<T>
    where
        T: Send + 'static,
        F: FnMut() -> Step<T> + Send + 'static,
    {
        self.submit_with(f, || false, || {})
    }

    /// Submits a step function with an early-termination predicate, checked
    /// after every step.
    pub fn submit_cancellable<T, F, C>(&self, f: F, cancel: C) -> TaskFuture<T>
    where
        T: Send + 'static,
        F: FnMut() -> Step<T> + Send + 'static,
        C: FnMut() -> bool + Send + 'static,
    {
        self.submit_with(f, cancel, || {})
    }

    /// Submits a step function with a cancel predicate and a completion
    /// notice.
    ///
    /// `cancel` is evaluated after each step; returning true terminates the
    /// task with [`TaskError::Incomplete`](crate::TaskError::Incomplete).
    /// `notice` runs exactly once, on whichever terminal transition the task
    /// takes.
    pub fn submit_with<T, F, C, N>(&self, f: F, cancel: C, notice: N) -> TaskFuture<T>
    where
        T: Send + 'static,
        F: FnMut() -> Step<T> + Send + 'static,
        C: FnMut() -> bool + Send + 'static,
        N: FnOnce() + Send + 'static,
    {
        let (task, future) = StepTask::new(f, cancel, notice);
        self.submit_task(Box::new(task));
        future
    }

    /// Submits a run-to-completion callable, executed in a single step.
    pub fn submit_once<T, F>(&self, f: F) -> TaskFuture<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let (task, future) = StepTask::once(f, || false, || {});
        self.submit_task(Box::new(task));
        future
    }

    pub(crate) fn submit_task(&self, task: Box<dyn PoolTask>) {
        trace!("task enqueued");
        self.shared.tasks.push(task);
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Shuts the pool down, reporting workers that died to a panic.
    ///
    /// Equivalent to dropping the pool, except that join failures surface
    /// instead of being swallowed.
    pub fn shutdown(mut self) -> anyhow::Result<()> {
        match self.join_workers() {
            0 => Ok(()),
            panicked => Err(anyhow!("{} worker thread(s) panicked", panicked)),
        }
    }

    /// Stops and joins every worker, then settles whatever never got popped.
    /// Idempotent; returns the number of workers that panicked.
    fn join_workers(&mut self) -> usize {
        self.shared.is_working.store(false, Ordering::Release);
        self.shared.tasks.disable_wait();

        let mut panicked = 0;
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                panicked += 1;
            }
        }

        // Settle tasks that never got popped; their promises are still unset.
        let mut aborted = 0usize;
        while let Some(mut task) = self.shared.tasks.try_pop() {
            task.abort();
            aborted += 1;
        }
        if aborted > 0 {
            debug!(aborted, "settled tasks abandoned in the queue");
        }

        panicked
    }
}

impl Drop for FineGrainedPool {
    fn drop(&mut self) {
        let _ = self.join_workers();
    }
}
