//! Blocking delay task.
//!
//! There is no timer reactor: a delay occupies the worker that runs it for
//! the whole duration. Keep delays short relative to the pool size, or give
//! the scheduler more workers than concurrent delays.

use crate::task::Task;

use std::thread;
use std::time::{Duration, Instant};

/// Returns a task that sleeps its worker for `duration`, then completes.
///
/// The task never reports `Finished` before `duration` has elapsed since it
/// started running.
///
/// # Example
/// ```ignore
/// use std::time::Duration;
///
/// let pause = weave::timer::delay(Duration::from_millis(100));
/// scheduler.schedule(&pause);
/// ```
pub fn delay(duration: Duration) -> Task<()> {
    Task::new(async move {
        let deadline = Instant::now() + duration;

        // `sleep` may wake early on some platforms.
        let mut now = Instant::now();
        while now < deadline {
            thread::sleep(deadline - now);
            now = Instant::now();
        }
    })
}
