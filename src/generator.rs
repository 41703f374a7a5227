//! Lazy sequences.
//!
//! A [`Generator`] runs an `async` body that hands values out through a
//! [`Yielder`]. The consumer drives it: each advance polls the body up to the
//! next `yield_` (or to its end), then moves the produced value out. Nothing
//! runs at construction.
//!
//! ```ignore
//! use weave::Generator;
//!
//! let evens = Generator::new(|co| async move {
//!     for n in 0..5 {
//!         co.yield_(n * 2).await;
//!     }
//! });
//! assert_eq!(evens.collect::<Vec<_>>(), vec![0, 2, 4, 6, 8]);
//! ```
//!
//! Generators are single-threaded (`!Send`): the producer and the consumer
//! share one value slot without locking.

use futures::future::LocalBoxFuture;
use futures::task::noop_waker_ref;
use log::warn;
use std::cell::Cell;
use std::fmt;
use std::future::Future;
use std::iter::FusedIterator;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

/// Outcome of one [`Generator::resume`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratorState<T> {
    Yielded(T),
    Complete,
}

/// Producer side of a generator, passed to the body.
pub struct Yielder<T> {
    slot: Rc<Cell<Option<T>>>,
}

impl<T> Yielder<T> {
    /// Hands `value` to the consumer and suspends until the next advance.
    pub fn yield_(&self, value: T) -> Yield<'_, T> {
        Yield {
            slot: &self.slot,
            value: Some(value),
        }
    }
}

/// Future returned by [`Yielder::yield_`].
#[must_use = "a yielded value is only delivered when the future is awaited"]
pub struct Yield<'a, T> {
    slot: &'a Cell<Option<T>>,
    value: Option<T>,
}

// `value` is never pinned.
impl<T> Unpin for Yield<'_, T> {}

impl<T> Future for Yield<'_, T> {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<()> {
        match self.value.take() {
            Some(value) => {
                self.slot.set(Some(value));
                Poll::Pending
            }
            None => Poll::Ready(()),
        }
    }
}

/// A suspended computation producing values on demand.
pub struct Generator<T> {
    body: Option<LocalBoxFuture<'static, ()>>,
    slot: Rc<Cell<Option<T>>>,
}

impl<T: 'static> Generator<T> {
    /// Captures the body. `producer` is called here to build the future, but
    /// the future itself does not run until the first advance.
    pub fn new<F, Fut>(producer: F) -> Self
    where
        F: FnOnce(Yielder<T>) -> Fut,
        Fut: Future<Output = ()> + 'static,
    {
        let slot = Rc::new(Cell::new(None));
        let body = producer(Yielder { slot: slot.clone() });

        Self {
            body: Some(Box::pin(body)),
            slot,
        }
    }

    /// Runs the body to its next yield or to completion.
    pub fn resume(&mut self) -> GeneratorState<T> {
        let Some(body) = self.body.as_mut() else {
            return GeneratorState::Complete;
        };

        let mut cx = Context::from_waker(noop_waker_ref());
        match body.as_mut().poll(&mut cx) {
            Poll::Ready(()) => {
                self.body = None;
                GeneratorState::Complete
            }
            Poll::Pending => match self.slot.take() {
                Some(value) => GeneratorState::Yielded(value),
                None => {
                    warn!("generator body suspended without yielding; treating it as complete");
                    self.body = None;
                    GeneratorState::Complete
                }
            },
        }
    }

    /// Whether the body has run to completion.
    pub fn is_done(&self) -> bool {
        self.body.is_none()
    }
}

impl<T: 'static> Iterator for Generator<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        match self.resume() {
            GeneratorState::Yielded(value) => Some(value),
            GeneratorState::Complete => None,
        }
    }
}

impl<T: 'static> FusedIterator for Generator<T> {}

impl<T> fmt::Debug for Generator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Generator")
            .field("done", &self.body.is_none())
            .finish()
    }
}
