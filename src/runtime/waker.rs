//! Waker bridging the standard waking protocol to tracked records.
//!
//! Waking a record's waker performs the same transition as a finished
//! dependency: an `Awaiting` record becomes `Resumable` and the dispatch loop
//! is signaled. This lets task bodies await arbitrary futures, not only other
//! tasks.

use crate::runtime::record::Tracked;

use std::sync::Arc;
use std::task::{RawWaker, RawWakerVTable, Waker};

/// Thin wrapper so the record can travel through a single data pointer.
struct RecordWaker {
    record: Arc<dyn Tracked>,
}

impl RecordWaker {
    fn clone_raw(ptr: *const ()) -> RawWaker {
        // SAFETY: `ptr` came from `Arc::into_raw` in `make_waker` or here, and
        // the reference count it owns is left untouched.
        unsafe {
            Arc::<RecordWaker>::increment_strong_count(ptr as *const RecordWaker);
        }
        RawWaker::new(ptr, &Self::VTABLE)
    }

    fn wake_raw(ptr: *const ()) {
        // SAFETY: consumes the count owned by this waker.
        let waker = unsafe { Arc::<RecordWaker>::from_raw(ptr as *const RecordWaker) };
        waker.record.wake();
    }

    fn wake_by_ref_raw(ptr: *const ()) {
        // SAFETY: the pointer is valid for as long as the waker is alive;
        // no count is consumed.
        let waker = unsafe { &*(ptr as *const RecordWaker) };
        waker.record.wake();
    }

    fn drop_raw(ptr: *const ()) {
        // SAFETY: releases the count owned by this waker.
        unsafe {
            drop(Arc::<RecordWaker>::from_raw(ptr as *const RecordWaker));
        }
    }

    const VTABLE: RawWakerVTable = RawWakerVTable::new(
        Self::clone_raw,
        Self::wake_raw,
        Self::wake_by_ref_raw,
        Self::drop_raw,
    );
}

/// Creates a waker that wakes `record` when called.
pub(crate) fn make_waker(record: Arc<dyn Tracked>) -> Waker {
    let ptr = Arc::into_raw(Arc::new(RecordWaker { record })) as *const ();
    // SAFETY: the vtable functions uphold the `RawWaker` contract for a
    // pointer produced by `Arc::into_raw`.
    unsafe { Waker::from_raw(RawWaker::new(ptr, &RecordWaker::VTABLE)) }
}
