//! Helpers shared by the integration tests.

use std::thread;
use weave::Scheduler;

/// Stops the scheduler even when an assertion unwinds out of the test body,
/// so the scoped dispatch thread can be joined.
struct StopOnDrop<'a>(&'a Scheduler);

impl Drop for StopOnDrop<'_> {
    fn drop(&mut self) {
        self.0.stop();
    }
}

/// Runs the dispatch loop on a scoped thread while `body` executes.
pub fn with_running<R>(scheduler: &Scheduler, body: impl FnOnce() -> R) -> R {
    thread::scope(|s| {
        let dispatcher = s.spawn(|| scheduler.start());
        let out = {
            let _stop = StopOnDrop(scheduler);
            body()
        };
        dispatcher
            .join()
            .expect("dispatch thread panicked")
            .expect("dispatch loop failed to start");
        out
    })
}
