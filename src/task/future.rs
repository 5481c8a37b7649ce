use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::TaskError;

/// What a finished task left behind.
pub type TaskOutput<T> = Result<T, TaskError>;

struct Cell<T> {
    value: Mutex<Option<TaskOutput<T>>>,
    cond: Condvar,
}

/// The write half of a result cell. Completing consumes the promise, so the
/// cell is assigned exactly once.
pub(crate) struct Promise<T> {
    cell: Arc<Cell<T>>,
}

impl<T> Promise<T> {
    pub(crate) fn complete(self, output: TaskOutput<T>) {
        let mut value = self.cell.value.lock();
        debug_assert!(value.is_none(), "promise completed twice");
        *value = Some(output);
        self.cell.cond.notify_all();
    }
}

/// A shareable, blocking view of a task's eventual output.
///
/// Cloning is cheap and every clone observes the same cell. Unlike
/// [`TaskResult`](super::TaskResult), a `TaskFuture` is *not* counted: holding
/// one does not keep a cancellable task alive.
pub struct TaskFuture<T> {
    cell: Arc<Cell<T>>,
}

/// Creates a connected promise/future pair.
pub(crate) fn result_cell<T>() -> (Promise<T>, TaskFuture<T>) {
    let cell = Arc::new(Cell {
        value: Mutex::new(None),
        cond: Condvar::new(),
    });
    (
        Promise {
            cell: Arc::clone(&cell),
        },
        TaskFuture { cell },
    )
}

impl<T> TaskFuture<T> {
    /// Blocks until the task has terminated.
    pub fn wait(&self) {
        let mut value = self.cell.value.lock();
        while value.is_none() {
            self.cell.cond.wait(&mut value);
        }
    }

    /// Blocks for at most `timeout`. Returns whether the output is ready.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        self.wait_until(Instant::now() + timeout)
    }

    /// Blocks until `deadline` at the latest. Returns whether the output is
    /// ready.
    pub fn wait_until(&self, deadline: Instant) -> bool {
        let mut value = self.cell.value.lock();
        while value.is_none() {
            if self.cell.cond.wait_until(&mut value, deadline).timed_out() {
                return value.is_some();
            }
        }
        true
    }

    pub fn is_ready(&self) -> bool {
        self.cell.value.lock().is_some()
    }
}

impl<T: Clone> TaskFuture<T> {
    /// Blocks until the task terminates, then returns a copy of its output.
    pub fn get(&self) -> TaskOutput<T> {
        self.wait();
        self.try_get().expect("output set after wait")
    }

    /// Returns a copy of the output if the task has already terminated.
    pub fn try_get(&self) -> Option<TaskOutput<T>> {
        self.cell.value.lock().clone()
    }
}

impl<T> Clone for TaskFuture<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn completed_promise_is_visible_through_every_clone() {
        let (promise, future) = result_cell();
        let view = future.clone();

        assert!(!future.is_ready());
        promise.complete(Ok(7));

        assert!(future.is_ready());
        assert_eq!(future.get(), Ok(7));
        assert_eq!(view.get(), Ok(7));
    }

    #[test]
    fn wait_parks_until_completion() {
        let (promise, future) = result_cell();

        let waiter = {
            let future = future.clone();
            thread::spawn(move || {
                future.wait();
                future.try_get().unwrap()
            })
        };

        thread::sleep(Duration::from_millis(20));
        promise.complete(Ok("done"));
        assert_eq!(waiter.join().unwrap(), Ok("done"));
    }

    #[test]
    fn wait_timeout_reports_pending_output() {
        let (promise, future) = result_cell::<u32>();

        assert!(!future.wait_timeout(Duration::from_millis(10)));
        promise.complete(Err(TaskError::Incomplete));
        assert!(future.wait_timeout(Duration::from_millis(10)));
        assert_eq!(future.get(), Err(TaskError::Incomplete));
    }
}
