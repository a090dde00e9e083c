use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;

use crate::error::{Error, Result, TaskError};

/// A type-erased task as stored on the work queues.
///
/// Executors are pinned to run thunks so that their queues stay
/// monomorphic; the typed result travels through the [`TaskHandle`]
/// created when the task was packaged.
pub(crate) type Thunk = Box<dyn FnOnce() + Send + 'static>;

/// Handle for the eventual result of a packaged task.
///
/// The handle resolves exactly once: with the task's return value, with
/// the panic that ended it, or with [`TaskError::Cancelled`] when the
/// executor was dropped before running the task.
#[derive(Debug)]
pub struct TaskHandle<R> {
    rx: mpsc::Receiver<std::result::Result<R, TaskError>>,
}

impl<R> TaskHandle<R> {
    /// Block until the task has run and return its result.
    pub fn join(self) -> Result<R> {
        match self.rx.recv() {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(task_error)) => Err(Error::Task(task_error)),
            Err(_) => Err(Error::Task(TaskError::Cancelled)),
        }
    }
}

/// Package a closure into a queueable thunk plus the handle observing it.
///
/// The thunk catches unwinding so a panicking task never tears down the
/// worker that happened to run it. `AssertUnwindSafe` is sound here
/// because the closure is `Send + 'static` and is consumed by the call.
pub(crate) fn package<F, R>(f: F) -> (Thunk, TaskHandle<R>)
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    let thunk: Thunk = Box::new(move || {
        let result = panic::catch_unwind(AssertUnwindSafe(f)).map_err(TaskError::from_panic);
        // The receiver may be gone when the caller discarded the handle.
        let _ = tx.send(result);
    });
    (thunk, TaskHandle { rx })
}
