//! Step-wise tasks: the wrapped unit the pool schedules, the promise/future
//! pair behind it, and the shared handle that counts its observers.

mod error;
pub use self::error::TaskError;

mod future;
pub use self::future::{TaskFuture, TaskOutput};

mod handle;
pub use self::handle::Task;

mod registry;
pub use self::registry::TaskRegistry;

mod result;
pub use self::result::TaskResult;

mod step;
pub use self::step::Step;
pub(crate) use self::step::{PoolTask, StepTask};

#[cfg(test)]
mod tests;
