//! Error types shared by tasks, the worker pool and the scheduler.

use thiserror::Error;

/// Failure carried in a task's result slot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    /// The task body panicked; the payload message is preserved when it was a string.
    #[error("task panicked: {0}")]
    Panicked(String),

    /// The result was requested before the task reached `Finished`.
    #[error("task has not finished yet")]
    NotFinished,

    /// The result was already moved out by an earlier awaiter or accessor.
    #[error("task result was already taken")]
    ResultTaken,
}

/// Errors returned when handing a job to the [`WorkerPool`](crate::WorkerPool).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PoolError {
    /// The queue is bounded, full, and configured with [`Overflow::Reject`](crate::Overflow::Reject).
    #[error("work queue is full")]
    Full,

    /// The pool has been asked to stop and accepts no more work.
    #[error("worker pool is shut down")]
    ShutDown,
}

/// Errors raised while building a pool or scheduler.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("worker_threads must be greater than 0")]
    ZeroWorkers,

    #[error("queue capacity must be greater than 0")]
    ZeroCapacity,

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Errors returned by [`Scheduler::start`](crate::Scheduler::start).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SchedulerError {
    #[error("dispatch loop is already running")]
    AlreadyStarted,

    #[error("scheduler was stopped and cannot be restarted")]
    Stopped,
}

/// Result of awaiting or reading a task.
pub type TaskResult<T> = Result<T, TaskError>;

/// Extracts a readable message from a caught panic payload.
pub(crate) fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
