use std::collections::HashMap;
use std::hash::Hash;
use tracing::debug;

use crate::pool::FineGrainedPool;

use super::{Step, Task, TaskResult};

/// A keyed store of [`Task`] handles.
///
/// `share` finds or creates the handle for a key and returns a counted view of
/// its run, so callers address long-lived computations by id instead of
/// holding handles themselves. Killing a key cancels its run and forgets the
/// handle.
pub struct TaskRegistry<K, T> {
    tasks: HashMap<K, Task<T>>,
}

impl<K, T> TaskRegistry<K, T>
where
    K: Eq + Hash,
    T: Send + 'static,
{
    pub fn new() -> Self {
        Self {
            tasks: HashMap::new(),
        }
    }

    /// Shares the task registered under `key`, creating it first if needed.
    ///
    /// A vacant key registers a new handle built from the given callables and
    /// starts it. An idle handle has its callables replaced before the
    /// restart; a handle with a run in flight keeps its current callables and
    /// only hands out another view.
    pub fn share<F, C, N>(
        &mut self,
        key: K,
        pool: &FineGrainedPool,
        main: F,
        cancel: C,
        notice: N,
    ) -> TaskResult<T>
    where
        F: FnMut() -> Step<T> + Send + 'static,
        C: FnMut() -> bool + Send + 'static,
        N: FnMut() + Send + 'static,
    {
        match self.tasks.get(&key) {
            Some(task) => {
                // StillActive just means the live run keeps its callables.
                let _ = task.reset(main, cancel, notice);
                task.share(pool)
            }
            None => {
                let task = Task::with_hooks(main, cancel, notice);
                let result = task.share(pool);
                self.tasks.insert(key, task);
                result
            }
        }
    }

    /// Cancels the run registered under `key` and removes the handle.
    /// Returns whether a handle was registered.
    pub fn kill(&mut self, key: &K) -> bool {
        match self.tasks.remove(key) {
            Some(task) => {
                debug!("killing registered task");
                task.kill();
                true
            }
            None => false,
        }
    }

    pub fn get(&self, key: &K) -> Option<&Task<T>> {
        self.tasks.get(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.tasks.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl<K, T> Default for TaskRegistry<K, T>
where
    K: Eq + Hash,
    T: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
