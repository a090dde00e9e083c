//! The logging contract between the concurrency primitives and the
//! embedding application.
//!
//! Workers announce themselves to a process-wide [`LogSink`] so that log
//! output can be attributed to named threads, workload drivers ask it to
//! hold a progress line, and the task dispatcher attaches itself as its
//! [`ThreadRegistry`]. Embedders with their own logging subsystem
//! implement [`LogSink`] and install it with [`set_global`]; the default
//! is a [`TracingSink`] that forwards every operation to the `tracing`
//! ecosystem.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering::SeqCst;
use std::sync::{Arc, Mutex, OnceLock, RwLock};
use std::thread::ThreadId;

/// Answers whether any worker threads are currently registered; attached
/// to the [`LogSink`] by the task dispatcher on first access.
pub trait ThreadRegistry: Send + Sync {
    /// Whether threads have been registered.
    fn has_threads_registered(&self) -> bool;
}

/// The scheduling strategy a sink uses to publish log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheduler {
    /// Print on the logging thread itself.
    Immediate,
    /// Hand off to a printer thread, blocking while its queue is full.
    Blocking,
    /// Hand off to a printer thread without ever blocking.
    Nonblocking,
}

/// Sink for the logging concerns of workers, pools and workload drivers.
///
/// Levels are per calling thread: a workload driver snapshots its own
/// level and aligns each pool thread with it before running a task.
pub trait LogSink: Send + Sync {
    /// Associate a readable `name` with the thread `id`.
    fn register_thread(&self, id: ThreadId, name: &str);

    /// Remove the association for the thread `id`.
    fn unregister_thread(&self, id: ThreadId);

    /// Attach the registry consulted for thread bookkeeping.
    fn attach_thread_registry(&self, registry: Arc<dyn ThreadRegistry>);

    /// Whether a registry has been attached.
    fn has_thread_registry_attached(&self) -> bool;

    /// The nesting level of the calling thread.
    fn current_level(&self) -> usize;

    /// Raise the calling thread's level by `n`.
    fn increase_level(&self, n: usize);

    /// Lower the calling thread's level by `n`, saturating at zero.
    fn decrease_level(&self, n: usize);

    /// Whether output at `level` is muted.
    fn is_muted_at(&self, level: usize) -> bool;

    /// Hold `text` as the replaceable tail line of `scope`; an empty
    /// `text` releases the hold.
    fn hold(&self, scope: &str, text: &str);

    /// Publish output on the logging thread itself.
    fn use_immediate_scheduler(&self);

    /// Publish output through a printer thread, blocking when congested.
    fn use_blocking_scheduler(&self);

    /// Publish output through a printer thread, never blocking.
    fn use_nonblocking_scheduler(&self);
}

thread_local! {
    static LEVEL: std::cell::Cell<usize> = const { std::cell::Cell::new(0) };
}

/// [`LogSink`] implementation backed by the `tracing` crate.
///
/// Thread registration, holds and scheduler switches are emitted as
/// `tracing` events; verbosity and held lines are also kept queryable so
/// that embedders can render the current hold themselves.
#[derive(Default)]
pub struct TracingSink {
    threads: Mutex<HashMap<ThreadId, String>>,
    registry: Mutex<Option<Arc<dyn ThreadRegistry>>>,
    verbosity: AtomicUsize,
    holds: Mutex<HashMap<String, String>>,
    scheduler: Mutex<Option<Scheduler>>,
}

impl TracingSink {
    /// Create a sink with verbosity zero (fully muted).
    pub fn new() -> TracingSink {
        TracingSink::default()
    }

    /// Set the verbosity; output at levels below it is unmuted.
    pub fn set_verbosity(&self, verbosity: usize) {
        self.verbosity.store(verbosity, SeqCst);
    }

    /// The current verbosity.
    pub fn verbosity(&self) -> usize {
        self.verbosity.load(SeqCst)
    }

    /// The line currently held for `scope`, if any.
    pub fn current_hold(&self, scope: &str) -> Option<String> {
        self.holds.lock().unwrap().get(scope).cloned()
    }

    /// The scheduler selected through the trait, if any was.
    pub fn scheduler(&self) -> Option<Scheduler> {
        *self.scheduler.lock().unwrap()
    }

    /// Whether the thread `id` is currently registered.
    pub fn is_thread_registered(&self, id: ThreadId) -> bool {
        self.threads.lock().unwrap().contains_key(&id)
    }

    fn select_scheduler(&self, scheduler: Scheduler) {
        *self.scheduler.lock().unwrap() = Some(scheduler);
        tracing::debug!(?scheduler, "selected log scheduler");
    }
}

impl fmt::Debug for TracingSink {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("TracingSink")
            .field("verbosity", &self.verbosity.load(SeqCst))
            .field("registered_threads", &self.threads.lock().unwrap().len())
            .field("scheduler", &*self.scheduler.lock().unwrap())
            .finish()
    }
}

impl LogSink for TracingSink {
    fn register_thread(&self, id: ThreadId, name: &str) {
        self.threads.lock().unwrap().insert(id, name.to_string());
        tracing::debug!(?id, name, "registered thread");
    }

    fn unregister_thread(&self, id: ThreadId) {
        self.threads.lock().unwrap().remove(&id);
        tracing::debug!(?id, "unregistered thread");
    }

    fn attach_thread_registry(&self, registry: Arc<dyn ThreadRegistry>) {
        *self.registry.lock().unwrap() = Some(registry);
    }

    fn has_thread_registry_attached(&self) -> bool {
        self.registry.lock().unwrap().is_some()
    }

    fn current_level(&self) -> usize {
        LEVEL.with(|level| level.get())
    }

    fn increase_level(&self, n: usize) {
        LEVEL.with(|level| level.set(level.get() + n));
    }

    fn decrease_level(&self, n: usize) {
        LEVEL.with(|level| level.set(level.get().saturating_sub(n)));
    }

    fn is_muted_at(&self, level: usize) -> bool {
        level >= self.verbosity.load(SeqCst)
    }

    fn hold(&self, scope: &str, text: &str) {
        let mut holds = self.holds.lock().unwrap();
        if text.is_empty() {
            holds.remove(scope);
        } else {
            holds.insert(scope.to_string(), text.to_string());
            tracing::trace!(scope, text, "held status line");
        }
    }

    fn use_immediate_scheduler(&self) {
        self.select_scheduler(Scheduler::Immediate);
    }

    fn use_blocking_scheduler(&self) {
        self.select_scheduler(Scheduler::Blocking);
    }

    fn use_nonblocking_scheduler(&self) {
        self.select_scheduler(Scheduler::Nonblocking);
    }
}

static GLOBAL: OnceLock<RwLock<Arc<dyn LogSink>>> = OnceLock::new();

fn cell() -> &'static RwLock<Arc<dyn LogSink>> {
    GLOBAL.get_or_init(|| RwLock::new(Arc::new(TracingSink::new())))
}

/// The process-wide log sink. Defaults to a muted [`TracingSink`].
pub fn global() -> Arc<dyn LogSink> {
    cell().read().unwrap().clone()
}

/// Replace the process-wide log sink.
pub fn set_global(sink: Arc<dyn LogSink>) {
    *cell().write().unwrap() = sink;
}
