use std::fmt;
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle, ThreadId};

use crate::buffer::Buffer;
use crate::sink;
use crate::task::{package, TaskHandle, Thunk};

/// A single thread consuming tasks from an owned bounded buffer.
///
/// Functionally equivalent to a pool of one worker, except that the task
/// queue is capacity-bounded (initially to a single task) so producers
/// are throttled by [`enqueue`](BufferedWorker::enqueue) blocking. Meant
/// to be used in isolation rather than inside a pool.
///
/// Dropping the worker interrupts the buffer's consumer loop and joins
/// the thread. Tasks already buffered are still pulled and run before the
/// loop observes the interrupt on the then-empty buffer.
pub struct BufferedWorker {
    name: String,
    id: ThreadId,
    buffer: Arc<Buffer<Thunk>>,
    handle: Option<JoinHandle<()>>,
}

impl fmt::Debug for BufferedWorker {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("BufferedWorker")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("queue_size", &self.buffer.size())
            .field("queue_capacity", &self.buffer.capacity())
            .finish()
    }
}

impl BufferedWorker {
    /// Spawn a buffered worker named after its own thread id.
    pub fn new() -> BufferedWorker {
        BufferedWorker::named(String::new())
    }

    /// Spawn a buffered worker with a readable `name`.
    ///
    /// An empty name defaults to the textual representation of the thread
    /// id.
    pub fn named(name: impl Into<String>) -> BufferedWorker {
        let mut name = name.into();
        let buffer = Arc::new(Buffer::<Thunk>::new(1));
        let consumer = Arc::clone(&buffer);

        let (id_tx, id_rx) = mpsc::channel();

        let mut builder = thread::Builder::new();
        if !name.is_empty() {
            builder = builder.name(name.clone());
        }

        let handle = builder
            .spawn(move || {
                id_tx
                    .send(thread::current().id())
                    .expect("buffered worker constructor stopped listening for the id");
                while let Ok(task) = consumer.pull() {
                    task();
                }
            })
            .expect("failed to spawn buffered worker thread");

        let id = id_rx
            .recv()
            .expect("buffered worker thread exited before publishing its id");
        if name.is_empty() {
            name = format!("{:?}", id);
        }
        sink::global().register_thread(id, &name);

        BufferedWorker {
            name,
            id,
            buffer,
            handle: Some(handle),
        }
    }

    /// Enqueue a task, blocking while the buffer is full, and return the
    /// handle for its result.
    pub fn enqueue<F, R>(&self, task: F) -> TaskHandle<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let (thunk, handle) = package(task);
        self.buffer.push(thunk);
        handle
    }

    /// The worker thread's id.
    pub fn id(&self) -> ThreadId {
        self.id
    }

    /// The worker's readable name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The number of tasks currently buffered.
    pub fn queue_size(&self) -> usize {
        self.buffer.size()
    }

    /// The task buffer's capacity.
    pub fn queue_capacity(&self) -> usize {
        self.buffer.capacity()
    }

    /// Change the task buffer's capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero or below the number of buffered tasks.
    pub fn set_queue_capacity(&self, capacity: usize) {
        self.buffer.set_capacity(capacity);
    }
}

impl Default for BufferedWorker {
    fn default() -> BufferedWorker {
        BufferedWorker::new()
    }
}

impl Drop for BufferedWorker {
    fn drop(&mut self) {
        self.buffer.interrupt_consume();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        sink::global().unregister_thread(self.id);
    }
}
