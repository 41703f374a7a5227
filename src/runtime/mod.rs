//! Runtime subsystem modules.

pub(crate) mod context;
pub(crate) mod handle;
pub(crate) mod pool;
pub(crate) mod queue;
pub(crate) mod record;
pub(crate) mod scheduler;
pub(crate) mod waker;
pub mod yield_now;

pub use handle::{FaultHandler, SchedulerHandle};
pub use pool::{DEFAULT_WORKERS, PoolConfig, WorkerPool};
pub use queue::{Job, Overflow, QueueOrder};
pub use record::TrackedTask;
pub use scheduler::Scheduler;
