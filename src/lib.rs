//! Execute tasks on smarter threads: bounded buffers, single-task and
//! buffered workers, a resizable thread pool and breadth-first workload
//! drivers.
//!
//! The crate is built from a handful of tightly-coupled primitives:
//!
//! - [`Buffer`], a blocking FIFO of fixed capacity with an interruptible
//!   consume, usable on its own or as the task queue of a
//!   [`BufferedWorker`];
//! - [`Worker`], owning one OS thread that runs one task and surfaces its
//!   panic through an error slot;
//! - [`ThreadPool`], a named, resizable set of workers sharing one
//!   unbounded task queue;
//! - [`TaskDispatcher`], the process-wide singleton holding the preferred
//!   concurrency and the shared pool, which runs tasks inline when that
//!   concurrency is zero;
//! - [`StaticWorkload`] and [`DynamicWorkload`], drivers executing a user
//!   task breadth-first over a stream of elements with live progress
//!   accounting through a [`WorkloadAdvancement`].
//!
//! Worker threads announce themselves to a process-wide log sink (see the
//! [`sink`] module) so that log output can be attributed to named
//! threads; workload drivers additionally ask the sink to hold a one-line
//! progress status.
//!
//! Every blocking operation blocks a real thread: there is no async
//! runtime, no event loop and no work stealing. Task results travel
//! through one-shot [`TaskHandle`]s, and task panics are captured rather
//! than propagated into the executing worker.

#![deny(missing_docs)]

mod advancement;
mod buffer;
mod buffered_worker;
mod dispatcher;
mod error;
mod progress;
pub mod sink;
mod task;
mod thread_pool;
mod worker;
mod workload;

pub use advancement::WorkloadAdvancement;
pub use buffer::Buffer;
pub use buffered_worker::BufferedWorker;
pub use dispatcher::TaskDispatcher;
pub use error::{Error, Result, TaskError};
pub use progress::ProgressIndicator;
pub use task::TaskHandle;
pub use thread_pool::{construct_thread_name, ThreadPool, THREAD_POOL_DEFAULT_NAME};
pub use worker::Worker;
pub use workload::{DynamicWorkload, StaticWorkload, Workload, WorkloadAccess};
