//! Thread-local execution context.
//!
//! While a worker polls a task it publishes the owning scheduler and the id of
//! the running task here. Awaiting another task reads it to find the caller's
//! own tracked record, and [`SchedulerHandle::current`] reads it to let task
//! bodies schedule more work without threading a handle through.
//!
//! [`SchedulerHandle::current`]: crate::SchedulerHandle::current

use crate::runtime::handle::SchedulerHandle;
use crate::task::TaskId;

use std::cell::RefCell;

#[derive(Clone)]
pub(crate) struct Current {
    pub(crate) scheduler: SchedulerHandle,
    pub(crate) task: TaskId,
}

thread_local! {
    static CURRENT: RefCell<Option<Current>> = const { RefCell::new(None) };
}

/// Runs `function` with `scheduler` and `task` published as the current
/// context, restoring the previous context afterwards.
pub(crate) fn enter<F, R>(scheduler: SchedulerHandle, task: TaskId, function: F) -> R
where
    F: FnOnce() -> R,
{
    let previous = CURRENT.with(|current| {
        current
            .borrow_mut()
            .replace(Current { scheduler, task })
    });

    // Restores on unwind too, although task polls are already panic-guarded.
    struct Restore(Option<Current>);

    impl Drop for Restore {
        fn drop(&mut self) {
            let previous = self.0.take();
            CURRENT.with(|current| *current.borrow_mut() = previous);
        }
    }

    let _restore = Restore(previous);
    function()
}

/// The context of the task running on this thread, if any.
pub(crate) fn current() -> Option<Current> {
    CURRENT.with(|current| current.borrow().clone())
}
