//! Fluent builder for Scheduler construction.
//!
//! ```ignore
//! let scheduler = SchedulerBuilder::new()
//!     .worker_threads(4)
//!     .queue_order(QueueOrder::Lifo)
//!     .build()?;
//! ```

use crate::error::{BuildError, TaskError};
use crate::runtime::handle::FaultHandler;
use crate::runtime::pool::PoolConfig;
use crate::runtime::queue::{Overflow, QueueOrder};
use crate::runtime::scheduler::Scheduler;
use crate::task::TaskId;

use std::sync::Arc;

/// Builder for [`Scheduler`] instances.
pub struct SchedulerBuilder {
    pool: PoolConfig,
    fault_handler: Option<FaultHandler>,
}

impl Default for SchedulerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SchedulerBuilder {
    /// Eight workers, FIFO order, unbounded queue, faults logged.
    pub fn new() -> Self {
        Self {
            pool: PoolConfig::default(),
            fault_handler: None,
        }
    }

    /// Number of pool threads. Must be greater than 0.
    pub fn worker_threads(mut self, n: usize) -> Self {
        self.pool.threads = n;
        self
    }

    /// Order in which workers pick dispatched resumptions.
    pub fn queue_order(mut self, order: QueueOrder) -> Self {
        self.pool.order = order;
        self
    }

    /// Bounds the work queue. Must be greater than 0.
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.pool.capacity = Some(capacity);
        self
    }

    /// What happens when the bounded queue is full.
    pub fn overflow(mut self, overflow: Overflow) -> Self {
        self.pool.overflow = overflow;
        self
    }

    /// Prefix for worker thread names; workers are named `<prefix>-<index>`.
    pub fn thread_name(mut self, prefix: impl Into<String>) -> Self {
        self.pool.thread_name = prefix.into();
        self
    }

    /// Receives faults from tasks that finished with an error nobody awaited.
    /// Without a handler such faults are logged at error level.
    pub fn on_fault<F>(mut self, handler: F) -> Self
    where
        F: Fn(TaskId, &TaskError) + Send + Sync + 'static,
    {
        self.fault_handler = Some(Arc::new(handler));
        self
    }

    /// Validates the configuration and spawns the worker pool.
    pub fn build(self) -> Result<Scheduler, BuildError> {
        Scheduler::with_config(self.pool, self.fault_handler)
    }
}
