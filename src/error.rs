use std::any::Any;

use thiserror::Error;

/// Convenience alias for results carrying a crate [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the crate's primitives.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    /// A blocked `pull` was woken by an interrupt while the buffer was
    /// still empty.
    #[error("buffer consumption was interrupted")]
    Interrupted,

    /// A task was submitted to a pool that has started draining.
    #[error("the thread pool is stopped and no longer accepts tasks")]
    PoolStopped,

    /// A task failed while running; carried through handles and workload
    /// drivers.
    #[error(transparent)]
    Task(#[from] TaskError),
}

/// Failure of an individual task.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskError {
    /// The task panicked; the payload is reduced to its message.
    #[error("task panicked: {0}")]
    Panicked(String),

    /// The task's executor was dropped before the task ran.
    #[error("task was dropped before execution")]
    Cancelled,
}

impl TaskError {
    /// Build a `Panicked` error from a payload caught with
    /// `std::panic::catch_unwind`.
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> TaskError {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "opaque panic payload".to_string()
        };
        TaskError::Panicked(message)
    }
}
