use std::any::Any;
use std::sync::Arc;

/// The ways a step-wise task can fail to produce its value.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TaskError {
    /// The task was cancelled (user predicate, kill, or no observers left)
    /// before its step function produced a value.
    #[error("value is incomplete")]
    Incomplete,

    /// The pool was shut down while the task was still queued; the task never
    /// got another step.
    #[error("pool shut down before the task completed")]
    Aborted,

    /// The task's step function panicked. The worker thread survives; the
    /// panic message is redirected here.
    #[error("task panicked: {0}")]
    Panicked(Arc<str>),

    /// Attempted to replace the callables of a handle whose run is still in
    /// flight.
    #[error("task is still active")]
    StillActive,
}

impl TaskError {
    pub(crate) fn panicked(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            *s
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.as_str()
        } else {
            "unknown panic payload"
        };
        TaskError::Panicked(Arc::from(message))
    }

    pub fn is_incomplete(&self) -> bool {
        matches!(self, TaskError::Incomplete)
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, TaskError::Aborted)
    }

    pub fn is_panic(&self) -> bool {
        matches!(self, TaskError::Panicked(_))
    }
}

impl PartialEq for TaskError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Incomplete, Self::Incomplete) => true,
            (Self::Aborted, Self::Aborted) => true,
            (Self::StillActive, Self::StillActive) => true,
            (Self::Panicked(a), Self::Panicked(b)) => a == b,
            _ => false,
        }
    }
}
