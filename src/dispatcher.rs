use std::sync::{Arc, Mutex, OnceLock};

use crate::sink::{self, ThreadRegistry};
use crate::task::{package, TaskHandle};
use crate::thread_pool::ThreadPool;

static INSTANCE: OnceLock<TaskDispatcher> = OnceLock::new();

/// Process-wide entry point routing tasks to a shared thread pool.
///
/// The dispatcher is a lazily-constructed singleton reached through
/// [`instance`](TaskDispatcher::instance). It owns one [`ThreadPool`]
/// whose size always equals the preferred
/// [`concurrency`](TaskDispatcher::concurrency): at a concurrency of zero
/// the pool holds no workers and every enqueued task runs inline on the
/// calling thread.
///
/// On first access the dispatcher also attaches itself to the global log
/// sink as its thread registry, answering that threads are registered
/// exactly while the concurrency is positive.
#[derive(Debug)]
pub struct TaskDispatcher {
    maximum_concurrency: usize,
    concurrency: Mutex<usize>,
    pool: ThreadPool,
}

/// Registry view of the dispatcher handed to the log sink.
struct DispatcherRegistry;

impl ThreadRegistry for DispatcherRegistry {
    fn has_threads_registered(&self) -> bool {
        TaskDispatcher::instance().concurrency() > 0
    }
}

impl TaskDispatcher {
    /// The singleton instance.
    pub fn instance() -> &'static TaskDispatcher {
        let instance = INSTANCE.get_or_init(|| TaskDispatcher {
            maximum_concurrency: num_cpus::get(),
            concurrency: Mutex::new(0),
            pool: ThreadPool::new(0),
        });
        let sink = sink::global();
        if !sink.has_thread_registry_attached() {
            sink.attach_thread_registry(Arc::new(DispatcherRegistry));
        }
        instance
    }

    /// The maximum concurrency allowed by this machine.
    pub fn maximum_concurrency(&self) -> usize {
        self.maximum_concurrency
    }

    /// The preferred concurrency; zero means tasks run inline on the
    /// caller.
    pub fn concurrency(&self) -> usize {
        *self.concurrency.lock().unwrap()
    }

    /// Set the preferred concurrency, resizing the owned pool.
    ///
    /// # Panics
    ///
    /// Panics if `concurrency` exceeds
    /// [`maximum_concurrency`](TaskDispatcher::maximum_concurrency).
    pub fn set_concurrency(&self, concurrency: usize) {
        assert!(
            concurrency <= self.maximum_concurrency,
            "concurrency cannot exceed the maximum allowed by this machine"
        );
        let mut current = self.concurrency.lock().unwrap();
        *current = concurrency;
        self.pool.set_num_threads(concurrency);
    }

    /// Set the concurrency to the maximum allowed by this machine.
    pub fn set_maximum_concurrency(&self) {
        self.set_concurrency(self.maximum_concurrency);
    }

    /// Make the log sink publish on the logging thread itself.
    ///
    /// # Panics
    ///
    /// Panics unless the concurrency is zero.
    pub fn set_logging_immediate_scheduler(&self) {
        assert!(
            self.concurrency() == 0,
            "the log scheduler can only change while the concurrency is zero"
        );
        sink::global().use_immediate_scheduler();
    }

    /// Make the log sink publish through a printer thread, blocking when
    /// congested.
    ///
    /// # Panics
    ///
    /// Panics unless the concurrency is zero.
    pub fn set_logging_blocking_scheduler(&self) {
        assert!(
            self.concurrency() == 0,
            "the log scheduler can only change while the concurrency is zero"
        );
        sink::global().use_blocking_scheduler();
    }

    /// Make the log sink publish through a printer thread without ever
    /// blocking.
    ///
    /// # Panics
    ///
    /// Panics unless the concurrency is zero.
    pub fn set_logging_nonblocking_scheduler(&self) {
        assert!(
            self.concurrency() == 0,
            "the log scheduler can only change while the concurrency is zero"
        );
        sink::global().use_nonblocking_scheduler();
    }

    /// Enqueue a task, returning the handle for its result.
    ///
    /// With a concurrency of zero the task runs inline and the returned
    /// handle is already resolved; otherwise the task is forwarded to the
    /// owned pool.
    pub fn enqueue<F, R>(&self, task: F) -> TaskHandle<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        if self.concurrency() == 0 {
            let (thunk, handle) = package(task);
            thunk();
            handle
        } else {
            self.pool
                .enqueue(task)
                .expect("the dispatcher pool never drains")
        }
    }
}
