use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Arc;
use tracing::trace;

use crate::pool::FineGrainedPool;

use super::step::StepTask;
use super::{Step, TaskError, TaskFuture, TaskResult};

type MainFn<T> = Box<dyn FnMut() -> Step<T> + Send>;
type CancelFn = Box<dyn FnMut() -> bool + Send>;
type NoticeFn = Box<dyn FnMut() + Send>;

struct UserFns<T> {
    main: MainFn<T>,
    cancel: CancelFn,
    notice: NoticeFn,
}

struct CurrentRun<T> {
    future: Option<TaskFuture<T>>,
    observers: Arc<AtomicI32>,
}

struct Inner<T> {
    /// True while a wrapped step-wise task for this handle is in the pool.
    active: AtomicBool,
    /// Sticky per run; cleared on the next submission.
    kill: AtomicBool,
    /// The user callables, kept so each activation can build a fresh wrapped
    /// task. Locked by the running task's closures on every step.
    fns: Mutex<UserFns<T>>,
    /// Future and observer counter of the current (or last) run.
    run: Mutex<CurrentRun<T>>,
}

// Lock order is `fns` then `run` (the effective cancel predicate holds `fns`
// while it reads the observer count). No path acquires them the other way.

impl<T> Inner<T> {
    fn has_observers(&self) -> bool {
        self.run.lock().observers.load(Ordering::Acquire) > 0
    }
}

/// A shared handle over a restartable step-wise computation.
///
/// The handle owns the user callables and submits at most one wrapped task to
/// a pool at a time. [`share`](Self::share) hands out counted
/// [`TaskResult`] views; when every view of a run is dropped while the run is
/// still in flight, the run cancels itself with
/// [`TaskError::Incomplete`].
///
/// The wrapped task holds only a [`Weak`](std::sync::Weak) back-reference to
/// the handle, so a handle whose last clone is dropped mid-run does not leak:
/// the orphaned run observes the dead reference and cancels.
pub struct Task<T> {
    inner: Arc<Inner<T>>,
}

impl<T: Send + 'static> Task<T> {
    /// Creates a handle for a step function with no cancel condition and no
    /// completion notice.
    pub fn new<F>(main: F) -> Self
    where
        F: FnMut() -> Step<T> + Send + 'static,
    {
        Self::with_hooks(main, || false, || {})
    }

    /// Creates a handle with a user cancel predicate.
    pub fn with_cancel<F, C>(main: F, cancel: C) -> Self
    where
        F: FnMut() -> Step<T> + Send + 'static,
        C: FnMut() -> bool + Send + 'static,
    {
        Self::with_hooks(main, cancel, || {})
    }

    /// Creates a handle with a cancel predicate and a completion notice.
    ///
    /// The notice runs exactly once per run, on every terminal transition
    /// (success, panic, or cancellation).
    pub fn with_hooks<F, C, N>(main: F, cancel: C, notice: N) -> Self
    where
        F: FnMut() -> Step<T> + Send + 'static,
        C: FnMut() -> bool + Send + 'static,
        N: FnMut() + Send + 'static,
    {
        Self {
            inner: Arc::new(Inner {
                active: AtomicBool::new(false),
                kill: AtomicBool::new(false),
                fns: Mutex::new(UserFns {
                    main: Box::new(main),
                    cancel: Box::new(cancel),
                    notice: Box::new(notice),
                }),
                run: Mutex::new(CurrentRun {
                    future: None,
                    observers: Arc::new(AtomicI32::new(0)),
                }),
            }),
        }
    }

    /// Starts the computation on `pool` if it is not already running, and
    /// returns a counted view of its result.
    ///
    /// If a run is in flight the existing run's view is cloned instead; a
    /// finished (or never-started) handle is (re)submitted. The returned view
    /// is created before the task enters the pool, so a fresh run can never
    /// observe "no observers" spuriously.
    pub fn share(&self, pool: &FineGrainedPool) -> TaskResult<T> {
        let mut run = self.inner.run.lock();

        if self
            .inner
            .active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            let future = run.future.clone().expect("active run without a future");
            return TaskResult::new(future, Arc::clone(&run.observers));
        }

        self.inner.kill.store(false, Ordering::Release);

        let step_ref = Arc::downgrade(&self.inner);
        let cancel_ref = Arc::downgrade(&self.inner);
        let notice_ref = Arc::downgrade(&self.inner);

        let step = move || match step_ref.upgrade() {
            Some(inner) => (inner.fns.lock().main)(),
            // Handle gone; the effective cancel predicate ends the run.
            None => Step::NotYet,
        };

        let cancel = move || match cancel_ref.upgrade() {
            Some(inner) => {
                (inner.fns.lock().cancel)()
                    || !inner.has_observers()
                    || inner.kill.load(Ordering::Acquire)
            }
            None => true,
        };

        let notice = move || {
            if let Some(inner) = notice_ref.upgrade() {
                inner.active.store(false, Ordering::Release);
                (inner.fns.lock().notice)();
            }
        };

        let (task, future) = StepTask::new(step, cancel, notice);
        let observers = Arc::new(AtomicI32::new(0));
        let view = TaskResult::new(future.clone(), Arc::clone(&observers));

        run.future = Some(future);
        run.observers = observers;

        pool.submit_task(Box::new(task));
        view
    }

    /// Requests cancellation of the current run.
    ///
    /// The run terminates with [`TaskError::Incomplete`] the next time the
    /// pool evaluates its cancel predicate. A later [`share`](Self::share)
    /// clears the flag and restarts.
    pub fn kill(&self) {
        trace!("task kill requested");
        self.inner.kill.store(true, Ordering::Release);
    }

    /// Whether any counted [`TaskResult`] view of the current run is alive.
    ///
    /// This is the sole mechanism by which a running task learns that nobody
    /// is waiting for it any more.
    pub fn has_active_results(&self) -> bool {
        self.inner.has_observers()
    }

    /// Whether a wrapped task for this handle is currently in the pool.
    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::Acquire)
    }

    /// Replaces the stored callables for the next run.
    ///
    /// Fails with [`TaskError::StillActive`] while a run is in flight;
    /// resetting an active handle is a caller error.
    pub fn reset<F, C, N>(&self, main: F, cancel: C, notice: N) -> Result<(), TaskError>
    where
        F: FnMut() -> Step<T> + Send + 'static,
        C: FnMut() -> bool + Send + 'static,
        N: FnMut() + Send + 'static,
    {
        let mut fns = self.inner.fns.lock();
        // Holding `run` pins `active`: share() flips it only under this lock.
        let _run = self.inner.run.lock();

        if self.inner.active.load(Ordering::Acquire) {
            return Err(TaskError::StillActive);
        }

        *fns = UserFns {
            main: Box::new(main),
            cancel: Box::new(cancel),
            notice: Box::new(notice),
        };
        Ok(())
    }
}

impl<T> Clone for Task<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
