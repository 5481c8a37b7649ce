//! Thread-safe queues the scheduler and connections are built on.

mod blocking;
mod cyclic;

pub use blocking::BlockingQueue;
pub use cyclic::CyclicQueue;

/// Outcome of a push into a [`CyclicQueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushStatus {
    /// The element was appended without evicting anything.
    Ok,
    /// The queue was full; the oldest element was dropped to make room.
    Displaced,
}
