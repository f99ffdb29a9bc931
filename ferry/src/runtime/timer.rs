use std::cmp::Ordering;
use std::sync::Arc;
use std::sync::atomic::{self, AtomicBool};
use std::task::Waker;
use std::time::Instant;

/// An entry in the worker's timer heap.
///
/// `TimerEntry` is a scheduled wake-up at `deadline`. Entries live in a
/// `BinaryHeap` owned by the run loop, ordered so the earliest deadline
/// is on top.
pub(crate) struct TimerEntry {
    /// The time at which the timer fires.
    pub(crate) deadline: Instant,

    /// Waker to notify when the deadline is reached.
    pub(crate) waker: Waker,

    /// Set by the sleep future when it is dropped before firing.
    pub(crate) cancelled: Arc<AtomicBool>,
}

impl TimerEntry {
    /// Returns `true` if the deadline has passed at `now`.
    pub(crate) fn is_due(&self, now: Instant) -> bool {
        self.deadline <= now
    }

    /// Returns `true` once the owning sleep was dropped.
    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled.load(atomic::Ordering::Acquire)
    }

    /// Wakes the owner unless the timer was abandoned.
    pub(crate) fn fire(self) {
        if !self.is_cancelled() {
            self.waker.wake();
        }
    }
}

impl Eq for TimerEntry {}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline.eq(&other.deadline)
    }
}

impl Ord for TimerEntry {
    /// Reversed so that `BinaryHeap<TimerEntry>` pops the earliest
    /// deadline first.
    fn cmp(&self, other: &Self) -> Ordering {
        other.deadline.cmp(&self.deadline)
    }
}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
