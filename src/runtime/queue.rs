//! Job queue backing the worker pool.
//!
//! The queue itself is not synchronized; the pool keeps it inside a
//! [`Guarded`](crate::sync::Guarded) and pairs it with condition variables.

use crate::error::PoolError;

use std::collections::VecDeque;

/// A unit of work handed to the pool.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Order in which idle workers pick queued jobs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QueueOrder {
    /// Oldest job first.
    #[default]
    Fifo,
    /// Most recently submitted job first. Favors recency and can starve an
    /// old backlog under sustained load.
    Lifo,
}

/// What `submit` does when a bounded queue is full.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Overflow {
    /// Wait until a worker takes a job off the queue.
    #[default]
    Block,
    /// Fail immediately with [`PoolError::Full`].
    Reject,
}

pub(crate) struct JobQueue {
    jobs: VecDeque<Job>,
    order: QueueOrder,
    capacity: Option<usize>,
    stopping: bool,
}

impl JobQueue {
    pub(crate) fn new(order: QueueOrder, capacity: Option<usize>) -> Self {
        Self {
            jobs: VecDeque::new(),
            order,
            capacity,
            stopping: false,
        }
    }

    /// Appends a job unless the queue is stopping or at capacity.
    pub(crate) fn push(&mut self, job: Job) -> Result<(), PoolError> {
        if self.stopping {
            return Err(PoolError::ShutDown);
        }
        if self.is_full() {
            return Err(PoolError::Full);
        }

        self.jobs.push_back(job);
        Ok(())
    }

    /// Takes the next job according to the ordering policy.
    pub(crate) fn pop(&mut self) -> Option<Job> {
        match self.order {
            QueueOrder::Fifo => self.jobs.pop_front(),
            QueueOrder::Lifo => self.jobs.pop_back(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.jobs.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub(crate) fn is_full(&self) -> bool {
        self.capacity.is_some_and(|cap| self.jobs.len() >= cap)
    }

    pub(crate) fn stop(&mut self) {
        self.stopping = true;
    }

    pub(crate) fn is_stopping(&self) -> bool {
        self.stopping
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recording(log: &Arc<Mutex<Vec<u32>>>, n: u32) -> Job {
        let log = log.clone();
        Box::new(move || log.lock().unwrap().push(n))
    }

    fn drain(queue: &mut JobQueue) {
        while let Some(job) = queue.pop() {
            job();
        }
    }

    #[test]
    fn fifo_runs_oldest_first() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut queue = JobQueue::new(QueueOrder::Fifo, None);

        for n in 0..3 {
            queue.push(recording(&log, n)).unwrap();
        }
        drain(&mut queue);

        assert_eq!(*log.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn lifo_runs_newest_first() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut queue = JobQueue::new(QueueOrder::Lifo, None);

        for n in 0..3 {
            queue.push(recording(&log, n)).unwrap();
        }
        drain(&mut queue);

        assert_eq!(*log.lock().unwrap(), vec![2, 1, 0]);
    }

    #[test]
    fn bounded_queue_rejects_when_full() {
        let mut queue = JobQueue::new(QueueOrder::Fifo, Some(1));

        assert!(queue.push(Box::new(|| {})).is_ok());
        assert!(queue.is_full());
        assert_eq!(queue.push(Box::new(|| {})).unwrap_err(), PoolError::Full);
    }

    #[test]
    fn stopped_queue_rejects_new_jobs() {
        let mut queue = JobQueue::new(QueueOrder::Fifo, None);
        queue.stop();

        assert!(queue.is_stopping());
        assert_eq!(queue.push(Box::new(|| {})).unwrap_err(), PoolError::ShutDown);
        assert!(queue.is_empty());
    }
}
