//! The dispatch loop.
//!
//! A [`Scheduler`] owns the tracked-record list (through its
//! [`SchedulerHandle`]) and a [`WorkerPool`]. [`Scheduler::start`] turns the
//! calling thread into the dispatch loop: each wake it evicts finished
//! records, claims the ready ones and hands their resumption to the pool
//! without waiting for it.

use crate::builder::SchedulerBuilder;
use crate::error::{BuildError, PoolError, SchedulerError};
use crate::runtime::handle::{FaultHandler, RunState, SchedulerCore, SchedulerHandle};
use crate::runtime::pool::{PoolConfig, WorkerPool};
use crate::runtime::record::{Tracked, TrackedTask};
use crate::task::{Task, TaskId, TaskState};

use log::{debug, info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// How often a loop parked on a full queue rechecks for `stop`.
const SPACE_RECHECK: Duration = Duration::from_millis(50);

/// Explicitly constructed executor: dispatch loop plus worker pool.
///
/// The scheduler is meant to live for as long as work is submitted to it.
/// Once stopped it cannot be started again. Dropping it stops the loop and
/// joins the pool's workers.
pub struct Scheduler {
    handle: SchedulerHandle,
    pool: WorkerPool,
    started: AtomicBool,
}

impl Scheduler {
    /// Builds a scheduler with the default configuration.
    pub fn new() -> Result<Self, BuildError> {
        SchedulerBuilder::new().build()
    }

    /// Starts a [`SchedulerBuilder`] for a custom configuration.
    pub fn builder() -> SchedulerBuilder {
        SchedulerBuilder::new()
    }

    pub(crate) fn with_config(
        pool: PoolConfig,
        fault_handler: Option<FaultHandler>,
    ) -> Result<Self, BuildError> {
        let pool = WorkerPool::new(pool)?;
        let core = Arc::new(SchedulerCore::new(fault_handler));

        Ok(Self {
            handle: SchedulerHandle::from_core(core),
            pool,
            started: AtomicBool::new(false),
        })
    }

    /// A cloneable handle for scheduling work from other threads or tasks.
    pub fn handle(&self) -> SchedulerHandle {
        self.handle.clone()
    }

    /// Number of worker threads in the pool.
    pub fn worker_threads(&self) -> usize {
        self.pool.threads()
    }

    /// Starts tracking `task` and wakes the dispatch loop.
    ///
    /// # Arguments
    /// * `task` - a [`Task`] (by reference or value) or a [`TrackedTask`].
    ///   Scheduling a task that is already tracked does nothing.
    pub fn schedule(&self, task: impl Into<TrackedTask>) {
        self.handle.schedule(task);
    }

    /// Starts tracking several tasks in one atomic append, skipping any that
    /// are already tracked.
    pub fn schedule_batch<I>(&self, tasks: I)
    where
        I: IntoIterator<Item = TrackedTask>,
    {
        self.handle.schedule_batch(tasks);
    }

    /// Looks up a tracked record.
    ///
    /// # Returns
    /// `None` when no record with `id` is tracked, including records already
    /// reclaimed after finishing.
    pub fn find_task(&self, id: TaskId) -> Option<TrackedTask> {
        self.handle.find_task(id)
    }

    /// Whether `task` is currently in the tracked list.
    pub fn is_scheduled<T: Send + 'static>(&self, task: &Task<T>) -> bool {
        self.handle.is_scheduled(task)
    }

    /// Number of tracked records, finished ones included until the next scan.
    pub fn tracked_len(&self) -> usize {
        self.handle.tracked_len()
    }

    /// Blocks until every tracked record finished and was reclaimed.
    ///
    /// # Returns
    /// `false` if `timeout` elapsed first.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        self.handle.wait_idle(timeout)
    }

    /// Stops the dispatch loop after its current pass. Work already handed
    /// to the pool still runs; there is no restart.
    pub fn stop(&self) {
        self.handle.stop();
    }

    /// Runs the dispatch loop on the calling thread until [`stop`](Self::stop).
    ///
    /// # Errors
    /// [`SchedulerError::AlreadyStarted`] if another thread is running the
    /// loop, [`SchedulerError::Stopped`] if the scheduler was stopped before.
    pub fn start(&self) -> Result<(), SchedulerError> {
        if self.handle.is_stopped() {
            return Err(SchedulerError::Stopped);
        }
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(SchedulerError::AlreadyStarted);
        }

        info!(
            "dispatch loop started with {} worker threads",
            self.pool.threads()
        );

        let core = self.handle.core();
        loop {
            // Switching to Waiting before the scan means a signal raised while
            // scanning flips it back to Running and forces another pass.
            let proceed = core.run_state.wait_with(
                &core.wakeup,
                |state| *state != RunState::Waiting,
                |state| match *state {
                    RunState::Stopped => false,
                    _ => {
                        *state = RunState::Waiting;
                        true
                    }
                },
            );
            if !proceed {
                break;
            }

            let mut ready = self.scan().into_iter();
            let mut full = false;
            for record in ready.by_ref() {
                if let Err(err) = self.dispatch(&record) {
                    full = err == PoolError::Full;
                    break;
                }
            }

            // Whatever was claimed but not handed over goes back to the next scan.
            for record in ready {
                record.set_state(TaskState::Resumable);
            }

            if full {
                self.wait_for_space();
            }
        }

        info!("dispatch loop stopped");
        Ok(())
    }

    /// Evicts finished records and claims every ready one.
    fn scan(&self) -> Vec<Arc<dyn Tracked>> {
        let core = self.handle.core();

        core.tasks.with(|tracked| {
            let before = tracked.len();
            tracked.retain(|record| record.state() != TaskState::Finished);
            let evicted = before - tracked.len();

            let ready: Vec<_> = tracked
                .iter()
                .filter(|record| record.claim())
                .cloned()
                .collect();

            if tracked.is_empty() {
                core.idle.notify_all();
            }

            debug!(
                "scan: {} evicted, {} ready, {} tracked",
                evicted,
                ready.len(),
                tracked.len()
            );
            ready
        })
    }

    /// Hands one claimed record to the pool. A rejected record is reverted to
    /// `Resumable`.
    fn dispatch(&self, record: &Arc<dyn Tracked>) -> Result<(), PoolError> {
        let job = record.clone();

        self.pool
            .submit_boxed(Box::new(move || job.resume()))
            .inspect_err(|err| {
                warn!("could not dispatch {}: {}", record.id(), err);
                record.set_state(TaskState::Resumable);
            })
    }

    /// Parks the loop until a worker frees a queue slot, then re-signals it.
    fn wait_for_space(&self) {
        while !self.handle.is_stopped() {
            if self.pool.wait_for_space(SPACE_RECHECK) {
                self.handle.notify();
                return;
            }
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.handle.stop();
    }
}
