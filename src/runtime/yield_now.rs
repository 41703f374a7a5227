//! Cooperative yield point.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Future returned by [`yield_now`].
#[derive(Debug, Default)]
#[must_use = "yielding only happens when the future is awaited"]
pub struct YieldNow {
    yielded: bool,
}

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            return Poll::Ready(());
        }

        self.yielded = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}

/// Gives the worker back once.
///
/// Inside a scheduler the task wakes itself while still running, so it turns
/// `Resumable` as soon as this poll returns and the next dispatch scan picks
/// it up again. Other ready tasks get a chance at the worker in between.
pub fn yield_now() -> YieldNow {
    YieldNow::default()
}
