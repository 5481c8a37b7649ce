use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;

use super::PushStatus;

struct State<T> {
    items: VecDeque<T>,
    wait_enabled: bool,
}

/// A fixed-capacity FIFO that displaces the oldest element on overflow.
///
/// The pop surface matches [`BlockingQueue`](super::BlockingQueue); push is the
/// difference. Capacity is a soft ring: a push into a full queue drops the
/// front element first and reports [`PushStatus::Displaced`]. There is no
/// blocking push and no "full" error.
pub struct CyclicQueue<T> {
    state: Mutex<State<T>>,
    cond: Condvar,
    capacity: usize,
}

impl<T> CyclicQueue<T> {
    /// Creates a queue holding at most `capacity` elements.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be at least 1");
        Self {
            state: Mutex::new(State {
                items: VecDeque::with_capacity(capacity),
                wait_enabled: true,
            }),
            cond: Condvar::new(),
            capacity,
        }
    }

    /// Appends an element, evicting the oldest one when full.
    pub fn push(&self, value: T) -> PushStatus {
        let mut state = self.state.lock();

        let status = if state.items.len() >= self.capacity {
            state.items.pop_front();
            PushStatus::Displaced
        } else {
            PushStatus::Ok
        };

        state.items.push_back(value);
        self.cond.notify_one();
        status
    }

    pub fn try_pop(&self) -> Option<T> {
        self.state.lock().items.pop_front()
    }

    /// Pops the front element, blocking while the queue is empty. Returns
    /// `None` once the wait has been disabled, even if elements remain.
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
    pub fn disable_wait(&self) {
        let mut state = self.state.lock();
        state.wait_enabled = false;
        self.cond.notify_all();
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn third_push_displaces_the_first() {
        let queue = CyclicQueue::new(2);

        assert_eq!(queue.push(1), PushStatus::Ok);
        assert_eq!(queue.push(2), PushStatus::Ok);
        assert_eq!(queue.push(3), PushStatus::Displaced);

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.try_pop(), Some(2));
        assert_eq!(queue.try_pop(), Some(3));
        assert_eq!(queue.try_pop(), None);
    }

    #[rstest]
    #[case::capacity_1(1)]
    #[case::capacity_4(4)]
    #[case::capacity_17(17)]
    fn size_never_exceeds_capacity(#[case] capacity: usize) {
        let queue = CyclicQueue::new(capacity);

        for i in 0..capacity * 3 {
            let status = queue.push(i);
            assert!(queue.len() <= capacity);
            // Displacement is reported on exactly the overflowing pushes.
            assert_eq!(status == PushStatus::Displaced, i >= capacity);
        }

        // Survivors are the newest `capacity` elements, in order.
        let mut expect = capacity * 2;
        while let Some(got) = queue.try_pop() {
            assert_eq!(got, expect);
            expect += 1;
        }
        assert_eq!(expect, capacity * 3);
    }

    #[test]
    fn pop_then_push_avoids_displacement() {
        let queue = CyclicQueue::new(2);
        queue.push("a");
        queue.push("b");
        assert_eq!(queue.try_pop(), Some("a"));
        assert_eq!(queue.push("c"), PushStatus::Ok);
        assert_eq!(queue.capacity(), 2);
    }
}
