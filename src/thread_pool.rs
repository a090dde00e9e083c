use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering::SeqCst;
use std::sync::{Arc, Condvar, Mutex};

use crate::error::{Error, Result};
use crate::task::{package, TaskHandle, Thunk};
use crate::worker::Worker;

/// Name given to pools constructed without one.
pub const THREAD_POOL_DEFAULT_NAME: &str = "thr";

/// Execute tasks on a resizable set of pooled worker threads.
///
/// Differently from a [`BufferedWorker`](crate::BufferedWorker), the task
/// queue of a pool is unbounded: [`enqueue`](ThreadPool::enqueue) never
/// waits for capacity, only for the queue mutex. Each worker loops taking
/// one task at a time off the shared FIFO; tasks from a single producer
/// are therefore started in submission order.
///
/// [`set_num_threads`](ThreadPool::set_num_threads) grows the pool by
/// appending workers and shrinks it positionally: workers with an index
/// at or beyond the new size finish their current task, if any, and stop.
/// Shrinking blocks until every excess worker has stopped.
///
/// Dropping the pool stops accepting tasks, lets the workers drain the
/// queue to completion and joins them.
pub struct ThreadPool {
    shared: Arc<Shared>,
    // Also serves as the resize lock: membership changes are serialized
    // on this mutex.
    workers: Mutex<Vec<Worker>>,
}

struct Shared {
    name: String,

    // The task FIFO and the draining flag, under the one mutex whose
    // condition announces task availability, draining and shrinking.
    queue: Mutex<TaskQueue>,
    task_available: Condvar,

    // Number of workers that should keep running; workers with an index
    // at or beyond this value stop after their current task.
    num_threads_to_use: AtomicUsize,

    // Down-counter tracking workers that have not yet stopped, with the
    // condition fulfilled when the last excess worker has.
    num_active_threads: Mutex<usize>,
    excess_stopped: Condvar,
}

struct TaskQueue {
    tasks: VecDeque<Thunk>,
    draining: bool,
}

impl ThreadPool {
    /// Create a pool of `num_threads` workers with the default name.
    pub fn new(num_threads: usize) -> ThreadPool {
        ThreadPool::named(num_threads, THREAD_POOL_DEFAULT_NAME)
    }

    /// Create a pool of `num_threads` workers whose threads are named
    /// after `name`.
    pub fn named(num_threads: usize, name: impl Into<String>) -> ThreadPool {
        let shared = Arc::new(Shared {
            name: name.into(),
            queue: Mutex::new(TaskQueue {
                tasks: VecDeque::new(),
                draining: false,
            }),
            task_available: Condvar::new(),
            num_threads_to_use: AtomicUsize::new(num_threads),
            num_active_threads: Mutex::new(num_threads),
            excess_stopped: Condvar::new(),
        });

        let pool = ThreadPool {
            shared,
            workers: Mutex::new(Vec::new()),
        };
        {
            let mut workers = pool.workers.lock().unwrap();
            pool.append_worker_range(&mut workers, 0, num_threads);
        }
        pool
    }

    /// Enqueue a task, returning the handle for its result.
    ///
    /// There is no limit on the number of queued tasks. Fails with
    /// [`Error::PoolStopped`] once the pool has started draining.
    pub fn enqueue<F, R>(&self, task: F) -> Result<TaskHandle<R>>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let (thunk, handle) = package(task);
        {
            let mut queue = self.shared.queue.lock().unwrap();
            if queue.draining {
                return Err(Error::PoolStopped);
            }
            queue.tasks.push_back(thunk);
        }
        self.shared.task_available.notify_one();
        Ok(handle)
    }

    /// The name of the pool.
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// The number of worker threads.
    pub fn num_threads(&self) -> usize {
        self.workers.lock().unwrap().len()
    }

    /// The number of tasks waiting in the queue.
    pub fn queue_size(&self) -> usize {
        self.shared.queue.lock().unwrap().tasks.len()
    }

    /// Set the number of worker threads.
    ///
    /// Growing appends workers. Shrinking blocks until every worker
    /// beyond the new size has finished its current task, if any, and
    /// stopped; queued tasks continue to be served by the remaining
    /// workers meanwhile.
    pub fn set_num_threads(&self, num_threads: usize) {
        let mut workers = self.workers.lock().unwrap();
        let old_size = workers.len();
        {
            // Published under the queue mutex so a worker evaluating its
            // wait predicate cannot miss the change and sleep through the
            // broadcast below.
            let _queue = self.shared.queue.lock().unwrap();
            self.shared.num_threads_to_use.store(num_threads, SeqCst);
        }

        if num_threads > old_size {
            *self.shared.num_active_threads.lock().unwrap() = num_threads;
            self.append_worker_range(&mut workers, old_size, num_threads);
        } else if num_threads < old_size {
            self.shared.task_available.notify_all();
            let mut active = self.shared.num_active_threads.lock().unwrap();
            while *active > num_threads {
                active = self.shared.excess_stopped.wait(active).unwrap();
            }
            drop(active);
            workers.truncate(num_threads);
        }
    }

    fn append_worker_range(&self, workers: &mut Vec<Worker>, lower: usize, upper: usize) {
        for i in lower..upper {
            let shared = Arc::clone(&self.shared);
            workers.push(Worker::named(
                move || worker_loop(shared, i),
                construct_thread_name(&self.shared.name, i, upper),
            ));
        }
    }
}

impl fmt::Debug for ThreadPool {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("ThreadPool")
            .field("name", &self.shared.name)
            .field("num_threads", &self.num_threads())
            .field("queue_size", &self.queue_size())
            .finish()
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.shared.queue.lock().unwrap().draining = true;
        self.shared.task_available.notify_all();
        // Joining the workers lets them drain the remaining queue.
        self.workers.lock().unwrap().clear();
    }
}

/// The loop run by the worker at position `index`.
///
/// The worker wakes for draining, shrinking or an available task. It
/// takes at most one task per wake-up and runs it outside the queue
/// mutex. A worker selected for shrinkage by its position stops right
/// after, fulfilling the shrink handshake when it is the last one to do
/// so.
fn worker_loop(shared: Arc<Shared>, index: usize) {
    loop {
        let mut task = None;
        {
            let mut queue = shared.queue.lock().unwrap();
            loop {
                if queue.draining
                    || !queue.tasks.is_empty()
                    || *shared.num_active_threads.lock().unwrap()
                        > shared.num_threads_to_use.load(SeqCst)
                {
                    break;
                }
                queue = shared.task_available.wait(queue).unwrap();
            }
            if queue.draining && queue.tasks.is_empty() {
                return;
            }
            if !queue.tasks.is_empty() {
                task = queue.tasks.pop_front();
            }
        }
        if let Some(task) = task {
            task();
        }
        if index >= shared.num_threads_to_use.load(SeqCst) {
            let mut active = shared.num_active_threads.lock().unwrap();
            *active -= 1;
            if *active == shared.num_threads_to_use.load(SeqCst) {
                shared.excess_stopped.notify_all();
            }
            return;
        }
    }
}

/// Build a worker thread name from a `prefix` and a `number`, zero-padding
/// single digits when `max_number` needs two.
pub fn construct_thread_name(prefix: &str, number: usize, max_number: usize) -> String {
    if max_number > 9 && number <= 9 {
        format!("{}0{}", prefix, number)
    } else {
        format!("{}{}", prefix, number)
    }
}
