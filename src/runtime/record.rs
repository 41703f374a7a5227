//! Tracked records: the scheduler's type-erased view of a task.
//!
//! The scheduler stores tasks of every result type in one list. It only needs
//! identity, state, continuation and a way to resume, which is what the
//! [`Tracked`] capability exposes. [`TaskCell`] is the single concrete
//! adapter; it also owns the result slot, which only typed [`Task`] handles
//! can read.
//!
//! # State transitions
//!
//! ```text
//! Created ──schedule──▶ Runnable ──claim──▶ Running ──poll Ready──▶ Finished
//!                                             │  ▲
//!                                  poll Pending  claim
//!                                             ▼  │
//!                                  Awaiting ──wake──▶ Resumable
//! ```
//!
//! A wake that arrives while the record is still `Running` (the awaited task
//! finished before the awaiting poll returned) is remembered and applied as
//! soon as the poll returns, so a record is never handed to two workers.
//!
//! [`Task`]: crate::Task

use crate::error::{TaskError, TaskResult, panic_message};
use crate::runtime::context;
use crate::runtime::handle::{SchedulerCore, SchedulerHandle};
use crate::runtime::waker::make_waker;
use crate::sync::Guarded;
use crate::task::{TaskId, TaskState};

use futures::future::BoxFuture;
use log::{debug, trace, warn};
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Weak};
use std::task::{Context, Poll, Waker};

/// Bookkeeping capability shared by all tracked records.
pub(crate) trait Tracked: Send + Sync {
    fn id(&self) -> TaskId;

    fn state(&self) -> TaskState;

    fn set_state(&self, state: TaskState);

    fn continuation(&self) -> Option<Arc<dyn Tracked>>;

    /// Links the record to resume once this one finishes. Returns `false`
    /// when this record already finished and nothing was linked.
    fn set_continuation(&self, continuation: Arc<dyn Tracked>) -> bool;

    /// Attaches the record to the scheduler that now tracks it.
    fn bind(&self, scheduler: Weak<SchedulerCore>);

    /// Moves a dispatchable record to `Running`. Returns `false` when the
    /// record is not ready (awaiting, already running, or finished).
    fn claim(&self) -> bool;

    /// Signals that whatever the record was waiting on is available.
    fn wake(&self);

    /// Polls the body once on the current thread.
    fn resume(self: Arc<Self>);
}

/// Opaque handle to a tracked record, as seen by embedding code.
#[derive(Clone)]
pub struct TrackedTask {
    pub(crate) inner: Arc<dyn Tracked>,
}

impl TrackedTask {
    /// Id of the underlying task.
    pub fn id(&self) -> TaskId {
        self.inner.id()
    }

    /// Current lifecycle state of the underlying task.
    pub fn state(&self) -> TaskState {
        self.inner.state()
    }

    /// Id of the record that resumes when this one finishes, if linked.
    pub fn continuation(&self) -> Option<TaskId> {
        self.inner.continuation().map(|c| c.id())
    }
}

impl fmt::Debug for TrackedTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackedTask")
            .field("id", &self.id())
            .field("state", &self.state())
            .finish()
    }
}

struct CellState<T> {
    state: TaskState,
    result: Option<TaskResult<T>>,
    taken: bool,
    continuation: Option<Arc<dyn Tracked>>,
    // Extra awaiters: a second task awaiting the same handle, or a thread
    // blocked in `Task::wait`.
    waiters: Vec<Waker>,
    wake_pending: bool,
    scheduler: Weak<SchedulerCore>,
}

/// Concrete tracked record for a task producing `T`.
pub(crate) struct TaskCell<T> {
    id: TaskId,
    body: Guarded<Option<BoxFuture<'static, T>>>,
    inner: Guarded<CellState<T>>,
}

impl<T: Send + 'static> TaskCell<T> {
    pub(crate) fn new(body: BoxFuture<'static, T>) -> Self {
        Self {
            id: TaskId::next(),
            body: Guarded::new(Some(body)),
            inner: Guarded::new(CellState {
                state: TaskState::Created,
                result: None,
                taken: false,
                continuation: None,
                waiters: Vec::new(),
                wake_pending: false,
                scheduler: Weak::new(),
            }),
        }
    }

    /// Moves the result out if the task has finished.
    pub(crate) fn try_take(&self) -> Option<TaskResult<T>> {
        self.inner.with(|s| {
            if s.state != TaskState::Finished {
                return None;
            }
            Some(Self::take_locked(s))
        })
    }

    /// Registers a plain waker, used when awaited outside any scheduler.
    /// Returns `false` when the task already finished.
    pub(crate) fn link_waker(&self, waker: &Waker) -> bool {
        self.inner.with(|s| {
            if s.state == TaskState::Finished {
                return false;
            }

            if !s.waiters.iter().any(|w| w.will_wake(waker)) {
                s.waiters.push(waker.clone());
            }
            true
        })
    }

    fn take_locked(s: &mut CellState<T>) -> TaskResult<T> {
        match s.result.take() {
            Some(result) => {
                s.taken = true;
                result
            }
            None if s.taken => Err(TaskError::ResultTaken),
            None => Err(TaskError::NotFinished),
        }
    }

    /// Records the poll's `Pending` outcome.
    fn suspend(&self) {
        let requeue = self.inner.with(|s| {
            if s.state != TaskState::Running {
                return None;
            }

            if std::mem::take(&mut s.wake_pending) {
                s.state = TaskState::Resumable;
                s.scheduler.upgrade()
            } else {
                s.state = TaskState::Awaiting;
                None
            }
        });

        if let Some(core) = requeue {
            core.notify();
        }
    }

    fn complete(&self, result: TaskResult<T>, handle: &SchedulerHandle) {
        let fault = result.as_ref().err().cloned();

        let (continuation, waiters) = self.inner.with(|s| {
            s.state = TaskState::Finished;
            s.result = Some(result);
            (s.continuation.take(), std::mem::take(&mut s.waiters))
        });

        if let Some(err) = fault
            && continuation.is_none()
            && waiters.is_empty()
        {
            handle.report_fault(self.id, &err);
        }

        if let Some(continuation) = continuation {
            trace!("{} finished, resuming {}", self.id, continuation.id());
            continuation.wake();
        }
        for waiter in waiters {
            waiter.wake();
        }

        debug!("{} finished", self.id);
        handle.notify();
    }
}

impl<T: Send + 'static> Tracked for TaskCell<T> {
    fn id(&self) -> TaskId {
        self.id
    }

    fn state(&self) -> TaskState {
        self.inner.with(|s| s.state)
    }

    fn set_state(&self, state: TaskState) {
        self.inner.with(|s| s.state = state);
    }

    fn continuation(&self) -> Option<Arc<dyn Tracked>> {
        self.inner.with(|s| s.continuation.clone())
    }

    fn set_continuation(&self, continuation: Arc<dyn Tracked>) -> bool {
        self.inner.with(|s| {
            if s.state == TaskState::Finished {
                return false;
            }

            let held_by_other = s
                .continuation
                .as_ref()
                .map(|existing| existing.id() != continuation.id());

            match held_by_other {
                None => s.continuation = Some(continuation),
                // A different awaiter already holds the slot: keep both.
                Some(true) => s.waiters.push(make_waker(continuation)),
                Some(false) => {}
            }
            true
        })
    }

    fn bind(&self, scheduler: Weak<SchedulerCore>) {
        self.inner.with(|s| {
            s.scheduler = scheduler;
            if s.state == TaskState::Created {
                s.state = TaskState::Runnable;
            }
        });
    }

    fn claim(&self) -> bool {
        self.inner.with(|s| match s.state {
            TaskState::Created | TaskState::Runnable | TaskState::Resumable => {
                s.state = TaskState::Running;
                s.wake_pending = false;
                true
            }
            _ => false,
        })
    }

    fn wake(&self) {
        let requeue = self.inner.with(|s| match s.state {
            TaskState::Awaiting => {
                s.state = TaskState::Resumable;
                s.scheduler.upgrade()
            }
            TaskState::Running => {
                s.wake_pending = true;
                None
            }
            _ => None,
        });

        if let Some(core) = requeue {
            core.notify();
        }
    }

    fn resume(self: Arc<Self>) {
        let Some(core) = self.inner.with(|s| s.scheduler.upgrade()) else {
            warn!("{} resumed after its scheduler was dropped", self.id);
            return;
        };
        let handle = SchedulerHandle::from_core(core);

        let record: Arc<dyn Tracked> = self.clone();
        let waker = make_waker(record);
        let mut cx = Context::from_waker(&waker);

        let outcome = context::enter(handle.clone(), self.id, || {
            self.body.with(|slot| {
                let body = slot.as_mut()?;
                let polled = catch_unwind(AssertUnwindSafe(|| body.as_mut().poll(&mut cx)));

                let finished = match polled {
                    Ok(Poll::Pending) => return Some(Poll::Pending),
                    Ok(Poll::Ready(value)) => Ok(value),
                    Err(payload) => Err(TaskError::Panicked(panic_message(payload))),
                };
                *slot = None;
                Some(Poll::Ready(finished))
            })
        });

        match outcome {
            Some(Poll::Pending) => self.suspend(),
            Some(Poll::Ready(result)) => self.complete(result, &handle),
            None => warn!("{} resumed with no body left to run", self.id),
        }
    }
}
