//! Shared scheduler state and the cloneable handle used to reach it.
//!
//! The dispatch loop and the worker pool live in [`Scheduler`]; everything
//! tasks need while they run (tracking, lookup, wake-ups) lives in
//! [`SchedulerCore`] behind a [`SchedulerHandle`]. Records only keep a weak
//! reference to the core, so dropping the scheduler is never blocked by a
//! task that is still tracked.
//!
//! [`Scheduler`]: crate::Scheduler

use crate::error::TaskError;
use crate::runtime::context;
use crate::runtime::record::{Tracked, TrackedTask};
use crate::sync::Guarded;
use crate::task::{Task, TaskId, TaskState};

use log::{debug, error};
use std::fmt;
use std::sync::{Arc, Condvar};
use std::time::Duration;

/// Callback receiving faults that no awaiter observed.
pub type FaultHandler = Arc<dyn Fn(TaskId, &TaskError) + Send + Sync>;

/// Run-state of the dispatch loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RunState {
    /// Work may be ready; the loop should scan.
    Running,
    /// Nothing changed since the last scan.
    Waiting,
    /// Terminal.
    Stopped,
}

pub(crate) struct SchedulerCore {
    pub(crate) tasks: Guarded<Vec<Arc<dyn Tracked>>>,
    pub(crate) run_state: Guarded<RunState>,
    pub(crate) wakeup: Condvar,
    pub(crate) idle: Condvar,
    fault_handler: Option<FaultHandler>,
}

impl SchedulerCore {
    pub(crate) fn new(fault_handler: Option<FaultHandler>) -> Self {
        Self {
            tasks: Guarded::new(Vec::new()),
            run_state: Guarded::new(RunState::Waiting),
            wakeup: Condvar::new(),
            idle: Condvar::new(),
            fault_handler,
        }
    }

    /// Marks the loop as having work and wakes it. Level-triggered: several
    /// signals before the loop wakes collapse into one scan.
    pub(crate) fn notify(&self) {
        self.run_state.with(|state| {
            if *state != RunState::Stopped {
                *state = RunState::Running;
            }
        });
        self.wakeup.notify_one();
    }
}

/// Cloneable reference to a scheduler, used to schedule and inspect work.
#[derive(Clone)]
pub struct SchedulerHandle {
    core: Arc<SchedulerCore>,
}

impl SchedulerHandle {
    pub(crate) fn from_core(core: Arc<SchedulerCore>) -> Self {
        Self { core }
    }

    pub(crate) fn core(&self) -> &Arc<SchedulerCore> {
        &self.core
    }

    /// Handle of the scheduler running the current task, if called from
    /// inside a task body.
    pub fn current() -> Option<Self> {
        context::current().map(|current| current.scheduler)
    }

    /// Starts tracking one task and wakes the dispatch loop.
    pub fn schedule(&self, task: impl Into<TrackedTask>) {
        self.schedule_batch([task.into()]);
    }

    /// Starts tracking several tasks in one atomic append.
    ///
    /// Tasks that are already tracked are skipped, so a task never appears
    /// twice in the list.
    pub fn schedule_batch<I>(&self, tasks: I)
    where
        I: IntoIterator<Item = TrackedTask>,
    {
        let owner = Arc::downgrade(&self.core);

        let added = self.core.tasks.with(|tracked| {
            let mut added = 0;
            for task in tasks {
                let id = task.inner.id();
                if tracked.iter().any(|record| record.id() == id) {
                    continue;
                }

                task.inner.bind(owner.clone());
                tracked.push(task.inner);
                added += 1;
            }
            added
        });

        debug!("scheduled {} task(s)", added);
        self.core.notify();
    }

    /// Looks up a tracked record by task id.
    pub fn find_task(&self, id: TaskId) -> Option<TrackedTask> {
        self.core.tasks.with(|tracked| {
            tracked
                .iter()
                .find(|record| record.id() == id)
                .map(|record| TrackedTask {
                    inner: record.clone(),
                })
        })
    }

    /// Whether `task` is currently tracked.
    pub fn is_scheduled<T: Send + 'static>(&self, task: &Task<T>) -> bool {
        self.is_tracked(task.id())
    }

    pub(crate) fn is_tracked(&self, id: TaskId) -> bool {
        self.core
            .tasks
            .with(|tracked| tracked.iter().any(|record| record.id() == id))
    }

    /// Number of records in the tracked list, finished ones included until
    /// the next scan reclaims them.
    pub fn tracked_len(&self) -> usize {
        self.core.tasks.with(|tracked| tracked.len())
    }

    /// Blocks until the tracked list is empty or `timeout` elapses.
    /// Returns `true` when the list drained.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        self.core.tasks.wait_timeout_with(
            &self.core.idle,
            timeout,
            |tracked| tracked.is_empty(),
            |_, drained| drained,
        )
    }

    /// Stops the dispatch loop. There is no restart.
    pub fn stop(&self) {
        self.core.run_state.with(|state| *state = RunState::Stopped);
        self.core.wakeup.notify_all();
        self.core.idle.notify_all();
    }

    /// Whether [`stop`](Self::stop) was called.
    pub fn is_stopped(&self) -> bool {
        self.core
            .run_state
            .with(|state| *state == RunState::Stopped)
    }

    pub(crate) fn notify(&self) {
        self.core.notify();
    }

    /// Delivers a fault nobody awaited to the configured handler, or logs it.
    pub(crate) fn report_fault(&self, id: TaskId, err: &TaskError) {
        match &self.core.fault_handler {
            Some(handler) => handler(id, err),
            None => error!("{} failed with no awaiter: {}", id, err),
        }
    }

    /// Records currently in `state`. Mostly useful in tests and diagnostics.
    pub fn count_in_state(&self, state: TaskState) -> usize {
        self.core.tasks.with(|tracked| {
            tracked
                .iter()
                .filter(|record| record.state() == state)
                .count()
        })
    }
}

impl fmt::Debug for SchedulerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchedulerHandle")
            .field("tracked", &self.tracked_len())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}
