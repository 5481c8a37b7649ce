use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;

struct State<T> {
    items: VecDeque<T>,
    /// While true, `wait_and_pop` sleeps on an empty queue. Flipped once by
    /// `disable_wait` to drain blocked consumers.
    wait_enabled: bool,
}

/// An unbounded thread-safe FIFO with blocking and non-blocking pop.
///
/// `wait_and_pop` parks the caller until an element arrives or the queue's
/// wait is disabled. [`disable_wait`](Self::disable_wait) is the shutdown
/// signal: every parked consumer wakes up and gets `None`, and all later
/// `wait_and_pop` calls return `None` immediately — even if elements remain.
/// Use [`try_pop`](Self::try_pop) to drain leftovers after that point.
pub struct BlockingQueue<T> {
    state: Mutex<State<T>>,
    cond: Condvar,
}

impl<T> BlockingQueue<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                items: VecDeque::new(),
                wait_enabled: true,
            }),
            cond: Condvar::new(),
        }
    }

    /// Appends an element and wakes one waiting consumer. Never fails.
    pub fn push(&self, value: T) {
        let mut state = self.state.lock();
        state.items.push_back(value);
        self.cond.notify_one();
    }

    /// Pops the front element, or returns `None` immediately when empty.
    pub fn try_pop(&self) -> Option<T> {
        self.state.lock().items.pop_front()
    }

    /// Pops the front element, blocking while the queue is empty.
    ///
    /// Returns `None` once the queue's wait has been disabled. The disabled
    /// check wins over pending elements, so consumers never pop from a queue
    /// that has been signalled for shutdown.
    pub fn wait_and_pop(&self) -> Option<T> {
        let mut state = self.state.lock();
        loop {
            if !state.wait_enabled {
                return None;
            }
            if let Some(value) = state.items.pop_front() {
                return Some(value);
            }
            self.cond.wait(&mut state);
        }
    }

    /// Disables `wait_and_pop` and wakes every parked consumer.
    ///
    /// The flag flips under the same mutex the waiters sleep on, so a consumer
    /// that observed `wait_enabled` cannot miss the wakeup.
    pub fn disable_wait(&self) {
        let mut state = self.state.lock();
        state.wait_enabled = false;
        self.cond.notify_all();
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }
}

impl<T> Default for BlockingQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
