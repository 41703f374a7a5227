//! Fixed-size worker pool.
//!
//! Workers drain a shared [`JobQueue`] guarded by one lock and woken through
//! a condition variable. Jobs run outside the lock, so a job may freely submit
//! more work or re-enter the scheduler.

use crate::error::{BuildError, PoolError, panic_message};
use crate::runtime::queue::{Job, JobQueue, Overflow, QueueOrder};
use crate::sync::Guarded;

use log::{debug, error, info};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Condvar};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Number of worker threads used when nothing else is configured.
pub const DEFAULT_WORKERS: usize = 8;

/// Settings for a [`WorkerPool`].
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Worker thread count, at least one.
    pub threads: usize,
    pub order: QueueOrder,
    /// `None` means unbounded.
    pub capacity: Option<usize>,
    /// Only consulted when `capacity` is set.
    pub overflow: Overflow,
    /// Prefix of worker thread names; workers are `<prefix>-<index>`.
    pub thread_name: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            threads: DEFAULT_WORKERS,
            order: QueueOrder::Fifo,
            capacity: None,
            overflow: Overflow::Block,
            thread_name: "weave-worker".to_string(),
        }
    }
}

struct PoolShared {
    queue: Guarded<JobQueue>,
    work_ready: Condvar,
    space_ready: Condvar,
    overflow: Overflow,
}

/// N worker threads draining a shared job queue.
///
/// Shutdown is a best-effort drain: jobs queued before [`shutdown`](Self::shutdown)
/// still run, jobs submitted afterwards are refused with [`PoolError::ShutDown`].
pub struct WorkerPool {
    shared: Arc<PoolShared>,
    workers: Guarded<Vec<JoinHandle<()>>>,
    threads: usize,
}

impl WorkerPool {
    /// Spawns the configured number of workers.
    pub fn new(config: PoolConfig) -> Result<Self, BuildError> {
        if config.threads == 0 {
            return Err(BuildError::ZeroWorkers);
        }
        if config.capacity == Some(0) {
            return Err(BuildError::ZeroCapacity);
        }

        let shared = Arc::new(PoolShared {
            queue: Guarded::new(JobQueue::new(config.order, config.capacity)),
            work_ready: Condvar::new(),
            space_ready: Condvar::new(),
            overflow: config.overflow,
        });

        let pool = Self {
            shared,
            workers: Guarded::new(Vec::with_capacity(config.threads)),
            threads: config.threads,
        };

        for index in 0..config.threads {
            let shared = pool.shared.clone();
            let spawned = thread::Builder::new()
                .name(format!("{}-{}", config.thread_name, index))
                .spawn(move || run_worker(shared, index));

            match spawned {
                Ok(handle) => pool.workers.with(|workers| workers.push(handle)),
                // Dropping `pool` stops and joins the workers spawned so far.
                Err(err) => return Err(BuildError::Spawn(err)),
            }
        }

        info!(
            "worker pool started: {} threads, {:?} order",
            config.threads, config.order
        );

        Ok(pool)
    }

    /// Queues a job and wakes one idle worker.
    pub fn submit<F>(&self, job: F) -> Result<(), PoolError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.submit_boxed(Box::new(job))
    }

    pub(crate) fn submit_boxed(&self, job: Job) -> Result<(), PoolError> {
        let shared = &self.shared;

        match shared.overflow {
            Overflow::Block => shared.queue.wait_with(
                &shared.space_ready,
                |queue| queue.is_stopping() || !queue.is_full(),
                |queue| queue.push(job),
            )?,
            Overflow::Reject => shared.queue.with(|queue| queue.push(job))?,
        }

        shared.work_ready.notify_one();
        Ok(())
    }

    /// Blocks until the queue has room or the pool stops.
    ///
    /// # Returns
    /// `false` if `timeout` elapsed while the queue was still full.
    pub(crate) fn wait_for_space(&self, timeout: Duration) -> bool {
        let shared = &self.shared;

        shared.queue.wait_timeout_with(
            &shared.space_ready,
            timeout,
            |queue| queue.is_stopping() || !queue.is_full(),
            |_, ready| ready,
        )
    }

    /// Number of jobs waiting for a worker.
    pub fn pending(&self) -> usize {
        self.shared.queue.with(|queue| queue.len())
    }

    /// Number of worker threads.
    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Stops accepting work, wakes every worker and joins them.
    ///
    /// Idempotent. When called from one of the pool's own workers that worker
    /// is not joined (it would wait on itself).
    pub fn shutdown(&self) {
        self.shared.queue.with(|queue| queue.stop());
        self.shared.work_ready.notify_all();
        self.shared.space_ready.notify_all();

        let workers = self.workers.with(std::mem::take);
        if workers.is_empty() {
            return;
        }

        let current = thread::current().id();
        for handle in workers {
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                error!("worker thread terminated abnormally");
            }
        }

        info!("worker pool stopped");
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker(shared: Arc<PoolShared>, index: usize) {
    debug!("worker {} started", index);

    loop {
        let job = shared.queue.wait_with(
            &shared.work_ready,
            |queue| queue.is_stopping() || !queue.is_empty(),
            |queue| queue.pop(),
        );

        // Only `None` when stopping with nothing left to drain.
        let Some(job) = job else { break };

        shared.space_ready.notify_one();

        if let Err(payload) = catch_unwind(AssertUnwindSafe(job)) {
            error!("worker {}: job panicked: {}", index, panic_message(payload));
        }
    }

    debug!("worker {} exiting", index);
}
