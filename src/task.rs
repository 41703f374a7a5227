//! Suspendable tasks.
//!
//! A [`Task`] wraps a future (the task body) and a result slot. The body only
//! runs when a [`Scheduler`] dispatches it to a worker; each dispatch polls it
//! up to its next suspension point, which is an `.await` on another task or
//! on any other future.
//!
//! # Awaiting another task
//!
//! ```ignore
//! use weave::{Scheduler, Task};
//!
//! let answer = Task::new(async { 42 });
//! let doubled = {
//!     let answer = answer.clone();
//!     Task::new(async move { answer.await.map(|v| v * 2) })
//! };
//! scheduler.schedule(&doubled);
//! ```
//!
//! Awaiting `answer` from inside `doubled` links `doubled` as the
//! continuation of `answer` and schedules `answer` if nobody did yet. When
//! `answer` finishes, `doubled` becomes resumable and the dispatch loop picks
//! it up again; the awaited value is moved out exactly once.
//!
//! # Ownership
//!
//! `Task` is a reference-counted handle. Clones share the same computation;
//! the body and the result are released when the last handle (including the
//! scheduler's own record) goes away.
//!
//! [`Scheduler`]: crate::Scheduler

use crate::error::{TaskError, TaskResult};
use crate::runtime::context;
use crate::runtime::record::{TaskCell, Tracked, TrackedTask};

use log::trace;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;

/// Process-unique identity of a task. Clones of a [`Task`] share it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u64);

impl TaskId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value, unique for the life of the process.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// Lifecycle of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    /// Constructed, never scheduled.
    Created,
    /// Tracked by a scheduler, waiting for its first dispatch.
    Runnable,
    /// Being polled by a worker.
    Running,
    /// Suspended until something it awaits completes.
    Awaiting,
    /// Ready to be polled again.
    Resumable,
    /// Body returned or panicked; the result slot is filled.
    Finished,
}

/// Shared handle to a suspendable computation producing `T`.
pub struct Task<T> {
    cell: Arc<TaskCell<T>>,
}

impl<T> Clone for Task<T> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
        }
    }
}

impl<T: Send + 'static> Task<T> {
    /// Captures `future` as a task body. Nothing runs until the task is
    /// scheduled and dispatched.
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        Self {
            cell: Arc::new(TaskCell::new(Box::pin(future))),
        }
    }

    /// Identity shared by every clone of this handle.
    pub fn id(&self) -> TaskId {
        self.cell.id()
    }

    /// Current lifecycle state. May change as soon as it is read while the
    /// task is scheduled.
    pub fn state(&self) -> TaskState {
        self.cell.state()
    }

    /// Whether the body returned or panicked.
    pub fn is_finished(&self) -> bool {
        self.state() == TaskState::Finished
    }

    /// Moves the result out.
    ///
    /// # Errors
    /// [`TaskError::NotFinished`] before completion, [`TaskError::ResultTaken`]
    /// when an awaiter or an earlier call already took it, and the body's own
    /// fault if it panicked.
    pub fn result(&self) -> TaskResult<T> {
        self.cell.try_take().unwrap_or(Err(TaskError::NotFinished))
    }

    /// Id of the task that resumes when this one finishes, if linked.
    pub fn continuation(&self) -> Option<TaskId> {
        self.cell.continuation().map(|c| c.id())
    }

    /// Links `awaiter` to resume when this task finishes. Returns `false` if
    /// this task already finished.
    pub fn set_continuation<U: Send + 'static>(&self, awaiter: &Task<U>) -> bool {
        self.cell.set_continuation(awaiter.cell.clone())
    }

    /// Blocks the calling thread until the task finishes and takes its result.
    ///
    /// The task must be scheduled on a running scheduler. Do not call this
    /// from inside a task body: it would hold a worker hostage.
    pub fn wait(&self) -> TaskResult<T> {
        futures::executor::block_on(self.clone())
    }

    /// Type-erased record for scheduling.
    pub fn tracked(&self) -> TrackedTask {
        TrackedTask {
            inner: self.cell.clone(),
        }
    }
}

impl Task<()> {
    /// A task that completes after `duration`. See [`crate::timer::delay`].
    pub fn delay(duration: Duration) -> Self {
        crate::timer::delay(duration)
    }
}

impl<T: Send + 'static> Future for Task<T> {
    type Output = TaskResult<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if let Some(result) = self.cell.try_take() {
            return Poll::Ready(result);
        }

        let awaiter = context::current().and_then(|current| {
            current
                .scheduler
                .find_task(current.task)
                .map(|record| (current.scheduler, record))
        });

        let linked = match &awaiter {
            Some((_, record)) => self.cell.set_continuation(record.inner.clone()),
            None => self.cell.link_waker(cx.waker()),
        };
        if !linked {
            return Poll::Ready(self.result());
        }

        if let Some((scheduler, record)) = awaiter {
            trace!("{} awaits {}", record.id(), self.id());
            if !scheduler.is_tracked(self.id()) {
                scheduler.schedule(self.tracked());
            }
        }

        Poll::Pending
    }
}

impl<T: Send + 'static> From<&Task<T>> for TrackedTask {
    fn from(task: &Task<T>) -> Self {
        task.tracked()
    }
}

impl<T: Send + 'static> From<Task<T>> for TrackedTask {
    fn from(task: Task<T>) -> Self {
        task.tracked()
    }
}

impl<T: Send + 'static> fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id())
            .field("state", &self.state())
            .finish()
    }
}
