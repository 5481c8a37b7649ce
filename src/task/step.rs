use std::panic::{catch_unwind, AssertUnwindSafe};

use super::future::{result_cell, Promise, TaskOutput};
use super::{TaskError, TaskFuture};

/// What one invocation of a task's step function yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step<T> {
    /// The task finished and produced its value.
    Done(T),
    /// The task wants another step later.
    NotYet,
}

/// The type-erased surface the pool queue stores.
///
/// Exactly one worker holds a task at any instant, so `step` and `is_done`
/// can never run concurrently for the same task.
pub(crate) trait PoolTask: Send {
    /// Runs one step, unless the task already terminated.
    fn step(&mut self);

    /// Reports whether the task terminated, evaluating the cancel predicate
    /// as a side effect. Called by the worker after every `step`.
    fn is_done(&mut self) -> bool;

    /// Terminates a task the pool will never step again (shutdown path).
    fn abort(&mut self);
}

/// A user callable wrapped with its cancel predicate, completion notice, and
/// result promise.
pub(crate) struct StepTask<T> {
    step_fn: Box<dyn FnMut() -> Step<T> + Send>,
    cancel_fn: Box<dyn FnMut() -> bool + Send>,
    /// Taken on the terminal transition, so it fires exactly once.
    notice_fn: Option<Box<dyn FnOnce() + Send>>,
    /// Taken together with the notice; the promise completes exactly once.
    promise: Option<Promise<T>>,
    done: bool,
}

impl<T: Send + 'static> StepTask<T> {
    pub(crate) fn new<F, C, N>(step_fn: F, cancel_fn: C, notice_fn: N) -> (Self, TaskFuture<T>)
    where
        F: FnMut() -> Step<T> + Send + 'static,
        C: FnMut() -> bool + Send + 'static,
        N: FnOnce() + Send + 'static,
    {
        let (promise, future) = result_cell();
        let task = Self {
            step_fn: Box::new(step_fn),
            cancel_fn: Box::new(cancel_fn),
            notice_fn: Some(Box::new(notice_fn)),
            promise: Some(promise),
            done: false,
        };
        (task, future)
    }

    /// Wraps a run-to-completion callable as a task that finishes on its
    /// first step.
    pub(crate) fn once<F, C, N>(f: F, cancel_fn: C, notice_fn: N) -> (Self, TaskFuture<T>)
    where
        F: FnOnce() -> T + Send + 'static,
        C: FnMut() -> bool + Send + 'static,
        N: FnOnce() + Send + 'static,
    {
        let mut f = Some(f);
        Self::new(
            move || Step::Done((f.take().expect("single-step task stepped twice"))()),
            cancel_fn,
            notice_fn,
        )
    }

    fn finish(&mut self, output: TaskOutput<T>) {
        self.done = true;
        if let Some(notice) = self.notice_fn.take() {
            notice();
        }
        if let Some(promise) = self.promise.take() {
            promise.complete(output);
        }
    }
}

impl<T: Send + 'static> PoolTask for StepTask<T> {
    fn step(&mut self) {
        if self.done {
            return;
        }

        match catch_unwind(AssertUnwindSafe(|| (self.step_fn)())) {
            Ok(Step::Done(value)) => self.finish(Ok(value)),
            Ok(Step::NotYet) => {}
            Err(payload) => self.finish(Err(TaskError::panicked(payload))),
        }
    }

    fn is_done(&mut self) -> bool {
        if self.done {
            return true;
        }

        // The predicate runs after the step, so a task that produced Done in
        // the same step in which cancellation became true still completed.
        if (self.cancel_fn)() {
            self.finish(Err(TaskError::Incomplete));
            return true;
        }

        false
    }

    fn abort(&mut self) {
        if !self.done {
            self.finish(Err(TaskError::Aborted));
        }
    }
}
