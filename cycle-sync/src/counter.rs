//! The shared arrival counter behind a [`CycleBarrier`](crate::barrier::CycleBarrier).

use core::sync::atomic::Ordering;

#[cfg(not(loom))]
use portable_atomic::AtomicUsize;

#[cfg(loom)]
use loom::sync::atomic::AtomicUsize;

/// An arrival counter that is incremented lock-free and rewound under a lock.
///
/// Increments may come from any number of concurrent callers. The mutating
/// methods other than [`increment_and_get`](Self::increment_and_get) must only
/// be called from inside the exclusive section of the owning barrier: they
/// are atomic by themselves, but the decision *whether* to rewind is not.
#[derive(Debug)]
pub struct AtomicRoundCounter {
    value: AtomicUsize,
}

impl AtomicRoundCounter {
    /// Create a counter starting at zero.
    #[cfg(not(loom))]
    pub const fn new() -> Self {
        Self {
            value: AtomicUsize::new(0),
        }
    }

    /// Create a counter starting at zero.
    #[cfg(loom)]
    pub fn new() -> Self {
        Self {
            value: AtomicUsize::new(0),
        }
    }

    /// Add one and return the value after the increment.
    #[inline]
    pub fn increment_and_get(&self) -> usize {
        self.value.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Snapshot of the current value.
    #[inline]
    pub fn value(&self) -> usize {
        self.value.load(Ordering::Acquire)
    }

    /// Set the value back to zero.
    ///
    /// Any increment racing with this call is lost, so it must be done while
    /// holding the barrier's exclusive section with no arrivals in flight.
    #[inline]
    pub fn reset(&self) {
        self.value.store(0, Ordering::Release);
    }

    /// Consume `by` arrivals and return what is left.
    ///
    /// Unlike [`reset`](Self::reset) this keeps arrivals that belong to the
    /// next round and were counted before the lock was taken.
    ///
    /// The caller must hold the exclusive section and must have observed
    /// `value() >= by` inside it.
    #[inline]
    pub fn rewind(&self, by: usize) -> usize {
        let previous = self.value.fetch_sub(by, Ordering::AcqRel);
        debug_assert!(previous >= by, "rewind past zero");
        previous - by
    }
}

impl Default for AtomicRoundCounter {
    fn default() -> Self {
        Self::new()
    }
}
