use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::trace;

use super::Shared;

/// The worker loop: pop a task, run one step, re-enqueue if not done.
///
/// Exits when the queue signals shutdown (`wait_and_pop` returns `None`) or
/// the pool clears `is_working`. A task popped here is exclusively owned
/// until it is pushed back, which is what makes `step`/`is_done` exclusive
/// per task.
pub(super) fn run(shared: Arc<Shared>) {
    trace!("worker started");

    while shared.is_working.load(Ordering::Acquire) {
        let Some(mut task) = shared.tasks.wait_and_pop() else {
            break;
        };

        task.step();

        if !task.is_done() {
            // Tail re-enqueue is what interleaves ready tasks; it also makes
            // FIFO ordering approximate.
            shared.tasks.push(task);
        }
    }

    trace!("worker exiting");
}
