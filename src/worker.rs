use std::panic::{self, AssertUnwindSafe};
use std::sync::{mpsc, Arc, Mutex};
use std::thread::{self, JoinHandle, ThreadId};

use crate::error::TaskError;
use crate::sink;

/// A single OS thread running a single task.
///
/// Construction hands the thread its task and blocks until the thread has
/// published its id, so [`id`](Worker::id) is valid as soon as the
/// constructor returns. The spawning thread then registers the worker
/// with the global log sink and only afterwards releases the task: a task
/// never starts before the registration is visible. A panicking task is
/// captured into the worker's error slot; the worker is not restarted.
///
/// Dropping a worker unregisters it from the log sink and joins the
/// thread.
#[derive(Debug)]
pub struct Worker {
    name: String,
    id: ThreadId,
    handle: Option<JoinHandle<()>>,
    error: Arc<Mutex<Option<TaskError>>>,
}

impl Worker {
    /// Spawn a worker named after its own thread id.
    pub fn new<F>(task: F) -> Worker
    where
        F: FnOnce() + Send + 'static,
    {
        Worker::named(task, String::new())
    }

    /// Spawn a worker with a readable `name`.
    ///
    /// An empty name defaults to the textual representation of the thread
    /// id.
    pub fn named<F>(task: F, name: impl Into<String>) -> Worker
    where
        F: FnOnce() + Send + 'static,
    {
        let mut name = name.into();
        let error = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&error);

        let (id_tx, id_rx) = mpsc::channel();
        let (go_tx, go_rx) = mpsc::channel::<()>();

        let mut builder = thread::Builder::new();
        if !name.is_empty() {
            builder = builder.name(name.clone());
        }

        let handle = builder
            .spawn(move || {
                id_tx
                    .send(thread::current().id())
                    .expect("worker constructor stopped listening for the id");
                // Wait for the spawning thread to finish log registration.
                if go_rx.recv().is_err() {
                    return;
                }
                if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(task)) {
                    *slot.lock().unwrap() = Some(TaskError::from_panic(payload));
                }
            })
            .expect("failed to spawn worker thread");

        let id = id_rx.recv().expect("worker thread exited before publishing its id");
        if name.is_empty() {
            name = format!("{:?}", id);
        }
        sink::global().register_thread(id, &name);
        let _ = go_tx.send(());

        Worker {
            name,
            id,
            handle: Some(handle),
            error,
        }
    }

    /// The worker thread's id.
    pub fn id(&self) -> ThreadId {
        self.id
    }

    /// The worker's readable name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The error captured from the task, if it failed.
    pub fn error(&self) -> Option<TaskError> {
        self.error.lock().unwrap().clone()
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        sink::global().unregister_thread(self.id);
        if let Some(handle) = self.handle.take() {
            // The task's panic was already caught, so the join cannot fail.
            let _ = handle.join();
        }
    }
}
