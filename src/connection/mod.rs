//! Typed connections between tasks: a bounded channel that displaces its
//! oldest element on overflow instead of blocking the producer.
//!
//! A connection is created from its [`Sender`] side; receivers are minted
//! with [`Sender::receiver`]. Both sides are independently cloneable and
//! independently closable, and track how many peers of the opposite side are
//! still open: sends report [`SendStatus::NO_RECEIVERS`], receives fail with
//! [`ConnectionError::SenderClosed`] once the last sender is gone and the
//! buffer has drained.

mod status;
pub use status::SendStatus;


use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Arc;

use crate::queue::{CyclicQueue, PushStatus};

/// Why a receive could not produce an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConnectionError {
    /// The buffer is empty and every sender has closed; no more data will
    /// arrive.
    #[error("the sender is closed, there will be no more data")]
    SenderClosed,

    /// The queue's blocking wait has been disabled (the last sender closed
    /// while this receiver was parked). Remaining buffered elements are still
    /// available through the non-blocking [`Receiver::receive`].
    #[error("wait and receive disabled")]
    WaitDisabled,
}

struct Core<T> {
    queue: CyclicQueue<T>,
    rx_count: AtomicI32,
    tx_count: AtomicI32,
}

/// The sending half of a connection.
///
/// `send` never blocks: a full ring displaces its oldest element and the
/// status reports it. Cloning registers another independent sender; dropping
/// (or [`close`](Self::close)) unregisters exactly once.
pub struct Sender<T> {
    core: Arc<Core<T>>,
    closed: AtomicBool,
}

/// The receiving half of a connection, minted by [`Sender::receiver`].
pub struct Receiver<T> {
    core: Arc<Core<T>>,
    closed: AtomicBool,
}

impl<T> Sender<T> {
    /// Opens a new connection with the given ring capacity and returns its
    /// first sender (`tx_count = 1`, no receivers yet).
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        Self {
            core: Arc::new(Core {
                queue: CyclicQueue::new(capacity),
                rx_count: AtomicI32::new(0),
                tx_count: AtomicI32::new(1),
            }),
            closed: AtomicBool::new(false),
        }
    }

    /// Pushes a value into the ring.
    ///
    /// Returns the combination of [`SendStatus::DISPLACEMENT_IN_QUEUE`] (the
    /// ring evicted its oldest element) and [`SendStatus::NO_RECEIVERS`] (no
    /// receiver was registered at push time). Never blocks, never fails.
    pub fn send(&self, value: T) -> SendStatus {
        let mut status = if self.core.rx_count.load(Ordering::Acquire) <= 0 {
            SendStatus::NO_RECEIVERS
        } else {
            SendStatus::OK
        };

        if self.core.queue.push(value) == PushStatus::Displaced {
            status |= SendStatus::DISPLACEMENT_IN_QUEUE;
        }

        status
    }

    /// Registers and returns a new receiver.
    pub fn receiver(&self) -> Receiver<T> {
        Receiver::register(Arc::clone(&self.core))
    }

    /// Closes this sender. Idempotent per handle.
    ///
    /// When the last sender closes, the queue's blocking wait is disabled so
    /// receivers parked in [`Receiver::wait_and_receive`] wake up with
    /// [`ConnectionError::WaitDisabled`] instead of hanging.
    pub fn close(&self) {
        if self
            .closed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
            && self.core.tx_count.fetch_sub(1, Ordering::AcqRel) == 1
        {
            self.core.queue.disable_wait();
        }
    }

    pub fn capacity(&self) -> usize {
        self.core.queue.capacity()
    }
}

impl<T> Clone for Sender<T> {
    /// Registers another open sender over the same connection, regardless of
    /// whether this handle has been closed.
    fn clone(&self) -> Self {
        self.core.tx_count.fetch_add(1, Ordering::AcqRel);
        Self {
            core: Arc::clone(&self.core),
            closed: AtomicBool::new(false),
        }
    }
}

impl<T> Drop for Sender<T> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<T> Receiver<T> {
    fn register(core: Arc<Core<T>>) -> Self {
        core.rx_count.fetch_add(1, Ordering::AcqRel);
        Self {
            core,
            closed: AtomicBool::new(false),
        }
    }

    /// Takes the next element without blocking.
    ///
    /// `Ok(None)` means the buffer is momentarily empty but data may still
    /// arrive; [`ConnectionError::SenderClosed`] means it never will.
    pub fn receive(&self) -> Result<Option<T>, ConnectionError> {
        match self.core.queue.try_pop() {
            Some(value) => Ok(Some(value)),
            None if self.core.tx_count.load(Ordering::Acquire) <= 0 => {
                Err(ConnectionError::SenderClosed)
            }
            None => Ok(None),
        }
    }

    /// Blocks until an element arrives.
    ///
    /// Fails with [`ConnectionError::WaitDisabled`] once the queue's wait has
    /// been disabled by the last sender closing; drain any buffered leftovers
    /// with [`receive`](Self::receive).
    pub fn wait_and_receive(&self) -> Result<T, ConnectionError> {
        self.core
            .queue
            .wait_and_pop()
            .ok_or(ConnectionError::WaitDisabled)
    }

    /// Closes this receiver. Idempotent per handle.
    pub fn close(&self) {
        if self
            .closed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.core.rx_count.fetch_sub(1, Ordering::AcqRel);
        }
    }

    pub fn capacity(&self) -> usize {
        self.core.queue.capacity()
    }
}

impl<T> Clone for Receiver<T> {
    /// Registers another open receiver over the same connection, regardless
    /// of whether this handle has been closed.
    fn clone(&self) -> Self {
        Self::register(Arc::clone(&self.core))
    }
}

impl<T> Drop for Receiver<T> {
    fn drop(&mut self) {
        self.close();
    }
}
