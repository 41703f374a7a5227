//! Cooperative execution engine: suspendable tasks and lazy generators run
//! by a single dispatch loop over a fixed pool of worker threads.
//!
//! # Architecture
//!
//! - **Scheduler**: explicitly constructed executor; its dispatch loop scans
//!   the tracked tasks and hands ready ones to the worker pool
//! - **SchedulerHandle**: cloneable reference used to schedule work from any
//!   thread or from inside a task
//! - **Task**: reference-counted handle to an `async` body and its result slot;
//!   awaiting a task from another task links the continuation
//! - **WorkerPool**: N threads draining a FIFO or LIFO job queue, optionally
//!   bounded
//! - **Generator**: single-threaded lazy sequence driven by its consumer
//! - **Guarded**: value plus lock, accessed through closures
//! - **SchedulerBuilder**: fluent configuration
//!
//! # Example
//!
//! ```ignore
//! use weave::{Scheduler, Task};
//! use std::thread;
//!
//! let scheduler = Scheduler::new()?;
//! let answer = Task::new(async { 42 });
//! let reader = {
//!     let answer = answer.clone();
//!     Task::new(async move { answer.await })
//! };
//!
//! thread::scope(|s| {
//!     s.spawn(|| scheduler.start());
//!     scheduler.schedule_batch([reader.tracked(), answer.tracked()]);
//!     assert_eq!(reader.wait(), Ok(Ok(42)));
//!     scheduler.stop();
//! });
//! ```
//!
//! Faults inside a task body (panics) never disappear: they are stored as
//! [`TaskError::Panicked`] in the result slot, delivered to whoever awaits
//! the task, and reported to the fault handler when nobody does.

mod builder;
mod error;
mod generator;
mod runtime;
mod sync;
mod task;
pub mod timer;

pub use builder::SchedulerBuilder;
pub use error::{BuildError, PoolError, SchedulerError, TaskError, TaskResult};
pub use generator::{Generator, GeneratorState, Yield, Yielder};
pub use runtime::yield_now::{YieldNow, yield_now};
pub use runtime::{
    DEFAULT_WORKERS, FaultHandler, Job, Overflow, PoolConfig, QueueOrder, Scheduler,
    SchedulerHandle, TrackedTask, WorkerPool,
};
pub use sync::Guarded;
pub use task::{Task, TaskId, TaskState};
