use std::any::type_name;
use std::collections::VecDeque;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering::SeqCst;
use std::sync::{Arc, Condvar, Mutex, Weak};

use crate::advancement::WorkloadAdvancement;
use crate::dispatcher::TaskDispatcher;
use crate::error::{Error, Result, TaskError};
use crate::progress::ProgressIndicator;
use crate::sink;

/// A workload expressed as a stream of elements supplied with a function
/// to process them.
///
/// The driver handles the zero-concurrency case separately in order to
/// unroll the tasks breadth-first: elements run in append order off a
/// sequential queue, and elements appended mid-task join the tail of that
/// queue. With a positive dispatcher concurrency each element is
/// forwarded to the shared pool instead, whose FIFO preserves the same
/// level-by-level expansion.
pub trait Workload<E> {
    /// Process the appended elements until completion.
    ///
    /// Returns the first task failure observed; sibling tasks already
    /// running are not cancelled, but the driver returns without waiting
    /// for them.
    fn process(&self) -> Result<()>;

    /// The number of elements appended and not yet picked up by the
    /// driver.
    fn size(&self) -> usize;

    /// Append one element to process.
    fn append(&self, element: E) -> &Self;

    /// Append a batch of elements to process, element by element.
    fn append_all<I>(&self, elements: I) -> &Self
    where
        I: IntoIterator<Item = E>,
        Self: Sized,
    {
        for element in elements {
            self.append(element);
        }
        self
    }
}

/// Fields of a workload driver shared with every task it launches.
///
/// Concurrent task wrappers clone the owning `Arc`, so the driver state
/// outlives any in-flight pool task even when `process` returns early
/// through a stashed error.
struct WorkloadInner<E> {
    task: Box<dyn Fn(&E) + Send + Sync>,
    progress: Box<dyn Fn(&E, &ProgressIndicator) + Send + Sync>,
    advancement: WorkloadAdvancement,
    indicator: ProgressIndicator,
    scope: String,
    // Log level of the processing thread, imposed on pool threads.
    logger_level: AtomicUsize,
    state: Mutex<DriverState<E>>,
    availability: Condvar,
    // Taken when a task appends synchronously under zero concurrency.
    appending: Mutex<()>,
}

struct DriverState<E> {
    queue: VecDeque<E>,
    error: Option<TaskError>,
}

fn using_concurrency() -> bool {
    TaskDispatcher::instance().concurrency() > 0
}

impl<E: Send + 'static> WorkloadInner<E> {
    fn new<F, P>(task: F, progress: P, scope: String) -> WorkloadInner<E>
    where
        F: Fn(&E) + Send + Sync + 'static,
        P: Fn(&E, &ProgressIndicator) + Send + Sync + 'static,
    {
        WorkloadInner {
            task: Box::new(task),
            progress: Box::new(progress),
            advancement: WorkloadAdvancement::default(),
            indicator: ProgressIndicator::new(0.0),
            scope,
            logger_level: AtomicUsize::new(0),
            state: Mutex::new(DriverState {
                queue: VecDeque::new(),
                error: None,
            }),
            availability: Condvar::new(),
            appending: Mutex::new(()),
        }
    }

    fn process(inner: &Arc<Self>) -> Result<()> {
        inner
            .logger_level
            .store(sink::global().current_level(), SeqCst);
        loop {
            let element = {
                let mut state = inner.state.lock().unwrap();
                while state.error.is_none()
                    && state.queue.is_empty()
                    && !inner.advancement.has_finished()
                {
                    state = inner.availability.wait(state).unwrap();
                }
                if let Some(error) = state.error.take() {
                    drop(state);
                    sink::global().hold(&inner.scope, "");
                    return Err(Error::Task(error));
                }
                if inner.advancement.has_finished() {
                    drop(state);
                    sink::global().hold(&inner.scope, "");
                    return Ok(());
                }
                match state.queue.pop_front() {
                    Some(element) => element,
                    None => continue,
                }
            };

            if using_concurrency() {
                WorkloadInner::dispatch(inner, element);
            } else {
                inner.advancement.add_to_processing(1);
                let sink = sink::global();
                if !sink.is_muted_at(0) {
                    (inner.progress)(&element, &inner.indicator);
                    inner.print_hold();
                }
                if let Err(payload) =
                    panic::catch_unwind(AssertUnwindSafe(|| (inner.task)(&element)))
                {
                    sink.hold(&inner.scope, "");
                    return Err(Error::Task(TaskError::from_panic(payload)));
                }
                inner.advancement.add_to_completed(1);
            }
        }
    }

    /// Hand an element to the dispatcher, wrapped with the accounting
    /// around the user task.
    fn dispatch(inner: &Arc<Self>, element: E) {
        let task_state = Arc::clone(inner);
        let _handle =
            TaskDispatcher::instance().enqueue(move || task_state.run_concurrent(element));
    }

    /// Body of a dispatched element, run on a pool thread.
    fn run_concurrent(&self, element: E) {
        self.advancement.add_to_processing(1);

        let sink = sink::global();
        let target = self.logger_level.load(SeqCst);
        let current = sink.current_level();
        if target > current {
            sink.increase_level(target - current);
        } else {
            sink.decrease_level(current - target);
        }

        if !sink.is_muted_at(0) {
            (self.progress)(&element, &self.indicator);
            self.print_hold();
        }

        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| (self.task)(&element))) {
            let mut state = self.state.lock().unwrap();
            if state.error.is_none() {
                state.error = Some(TaskError::from_panic(payload));
            }
            drop(state);
            self.availability.notify_one();
        }

        {
            let _state = self.state.lock().unwrap();
            self.advancement.add_to_completed(1);
        }
        if self.advancement.has_finished() {
            self.availability.notify_one();
        }
    }

    /// Re-entrant append used by [`WorkloadAccess`].
    fn enqueue_element(inner: &Arc<Self>, element: E) {
        if using_concurrency() {
            inner.advancement.add_to_waiting(1);
            WorkloadInner::dispatch(inner, element);
        } else {
            // The driver is mid-task on this or another thread; grow the
            // sequential queue and wake the driver loop.
            {
                let _appending = inner.appending.lock().unwrap();
                inner.append_element(element);
            }
            inner.availability.notify_one();
        }
    }

    fn append_element(&self, element: E) {
        self.advancement.add_to_waiting(1);
        self.state.lock().unwrap().queue.push_back(element);
    }

    fn size(&self) -> usize {
        self.state.lock().unwrap().queue.len()
    }

    fn print_hold(&self) {
        let text = format!(
            "[{}] {}% (w={:<2} p={:<2} c={:<3})",
            self.indicator.symbol(),
            self.indicator.percentage(),
            self.advancement.waiting(),
            self.advancement.processing(),
            self.advancement.completed()
        );
        sink::global().hold(&self.scope, &text);
    }
}

/// A workload whose elements are all appended up front.
///
/// The task observes one element per invocation; invariant inputs are
/// closure captures. Progress is acknowledged with the default policy:
/// the indicator tracks completed elements against the running total.
pub struct StaticWorkload<E> {
    inner: Arc<WorkloadInner<E>>,
}

impl<E: Send + 'static> StaticWorkload<E> {
    /// Create a workload running `task` over each appended element.
    pub fn new<F>(task: F) -> StaticWorkload<E>
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let inner = Arc::new_cyclic(|weak: &Weak<WorkloadInner<E>>| {
            let progress_source = weak.clone();
            WorkloadInner::new(
                task,
                move |_element: &E, indicator: &ProgressIndicator| {
                    if let Some(inner) = progress_source.upgrade() {
                        indicator.update_current(inner.advancement.completed() as f64);
                        indicator.update_final(inner.advancement.total() as f64);
                    }
                },
                type_name::<StaticWorkload<E>>().to_string(),
            )
        });
        StaticWorkload { inner }
    }
}

impl<E: Send + 'static> Workload<E> for StaticWorkload<E> {
    fn process(&self) -> Result<()> {
        WorkloadInner::process(&self.inner)
    }

    fn size(&self) -> usize {
        self.inner.size()
    }

    fn append(&self, element: E) -> &Self {
        self.inner.append_element(element);
        self
    }
}

impl<E> fmt::Debug for StaticWorkload<E> {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("StaticWorkload")
            .field("queued", &self.inner.state.lock().unwrap().queue.len())
            .field("completed", &self.inner.advancement.completed())
            .finish()
    }
}

/// A workload whose tasks may append new elements while processing.
///
/// The task receives a [`WorkloadAccess`] handle next to the element;
/// appending through it preserves breadth-first expansion whatever the
/// dispatcher concurrency is.
pub struct DynamicWorkload<E> {
    inner: Arc<WorkloadInner<E>>,
}

impl<E: Send + 'static> DynamicWorkload<E> {
    /// Create a workload running `task` over each element, acknowledging
    /// progress through `progress`.
    pub fn new<P, F>(progress: P, task: F) -> DynamicWorkload<E>
    where
        P: Fn(&E, &ProgressIndicator) + Send + Sync + 'static,
        F: Fn(&WorkloadAccess<E>, &E) + Send + Sync + 'static,
    {
        let inner = Arc::new_cyclic(|weak: &Weak<WorkloadInner<E>>| {
            let access = WorkloadAccess {
                inner: weak.clone(),
            };
            WorkloadInner::new(
                move |element: &E| task(&access, element),
                progress,
                type_name::<DynamicWorkload<E>>().to_string(),
            )
        });
        DynamicWorkload { inner }
    }
}

impl<E: Send + 'static> Workload<E> for DynamicWorkload<E> {
    fn process(&self) -> Result<()> {
        WorkloadInner::process(&self.inner)
    }

    fn size(&self) -> usize {
        self.inner.size()
    }

    fn append(&self, element: E) -> &Self {
        self.inner.append_element(element);
        self
    }
}

impl<E> fmt::Debug for DynamicWorkload<E> {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("DynamicWorkload")
            .field("queued", &self.inner.state.lock().unwrap().queue.len())
            .field("completed", &self.inner.advancement.completed())
            .finish()
    }
}

/// Narrow handle through which a [`DynamicWorkload`] task appends new
/// elements to its own workload.
///
/// The handle deliberately exposes appending only, and holds the driver
/// weakly: a task outliving its workload appends into the void instead of
/// keeping the driver alive.
pub struct WorkloadAccess<E> {
    inner: Weak<WorkloadInner<E>>,
}

impl<E: Send + 'static> WorkloadAccess<E> {
    /// Append one element to the workload being processed.
    pub fn append(&self, element: E) {
        if let Some(inner) = self.inner.upgrade() {
            WorkloadInner::enqueue_element(&inner, element);
        }
    }
}

impl<E> fmt::Debug for WorkloadAccess<E> {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("WorkloadAccess").finish()
    }
}
