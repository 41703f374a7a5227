//! Guarded shared state.
//!
//! [`Guarded`] pairs a value with the lock that protects it. All access goes
//! through a closure that runs while the lock is held, so the guard can never
//! outlive a single operation or leak across a blocking call.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// A value protected by a mutex, accessed only through short-lived closures.
#[derive(Debug, Default)]
pub struct Guarded<T> {
    value: Mutex<T>,
}

impl<T> Guarded<T> {
    /// Wraps `value` behind a fresh lock.
    pub fn new(value: T) -> Self {
        Self {
            value: Mutex::new(value),
        }
    }

    /// Runs `f` with exclusive access to the value and returns its result.
    ///
    /// A poisoned lock is recovered: task bodies never run while a guard is
    /// held, so the value is still consistent.
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.lock();
        f(&mut *guard)
    }

    /// Blocks on `condvar` until `ready` holds, then runs `f` under the same lock.
    pub fn wait_with<R>(
        &self,
        condvar: &Condvar,
        mut ready: impl FnMut(&T) -> bool,
        f: impl FnOnce(&mut T) -> R,
    ) -> R {
        let guard = self.lock();
        let mut guard = condvar
            .wait_while(guard, |value| !ready(&*value))
            .unwrap_or_else(PoisonError::into_inner);
        f(&mut *guard)
    }

    /// Like [`wait_with`](Self::wait_with) but gives up after `timeout`.
    ///
    /// `f` receives `true` when `ready` held before the deadline.
    pub fn wait_timeout_with<R>(
        &self,
        condvar: &Condvar,
        timeout: Duration,
        mut ready: impl FnMut(&T) -> bool,
        f: impl FnOnce(&mut T, bool) -> R,
    ) -> R {
        let guard = self.lock();
        let (mut guard, result) = condvar
            .wait_timeout_while(guard, timeout, |value| !ready(&*value))
            .unwrap_or_else(PoisonError::into_inner);
        f(&mut *guard, !result.timed_out())
    }

    /// Consumes the wrapper and returns the value.
    pub fn into_inner(self) -> T {
        self.value.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock(&self) -> MutexGuard<'_, T> {
        self.value.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn with_returns_closure_result() {
        let guarded = Guarded::new(vec![1, 2, 3]);
        let len = guarded.with(|v| {
            v.push(4);
            v.len()
        });

        assert_eq!(len, 4);
        assert_eq!(guarded.into_inner(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn concurrent_increments_are_not_lost() {
        let counter = Arc::new(Guarded::new(0usize));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let counter = counter.clone();
                thread::spawn(move || {
                    for _ in 0..1000 {
                        counter.with(|c| *c += 1);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(counter.with(|c| *c), 8000);
    }

    #[test]
    fn wait_with_wakes_on_condition() {
        let shared = Arc::new((Guarded::new(false), Condvar::new()));
        let setter = shared.clone();

        let handle = thread::spawn(move || {
            setter.0.with(|flag| *flag = true);
            setter.1.notify_all();
        });

        let seen = shared.0.wait_with(&shared.1, |flag| *flag, |flag| *flag);
        handle.join().unwrap();

        assert!(seen);
    }

    #[test]
    fn wait_timeout_reports_expiry() {
        let guarded = Guarded::new(0u8);
        let condvar = Condvar::new();

        let satisfied = guarded.wait_timeout_with(
            &condvar,
            Duration::from_millis(20),
            |v| *v > 0,
            |_, ok| ok,
        );

        assert!(!satisfied);
    }
}
