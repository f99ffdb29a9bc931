use crate::runtime::injector::InjectorHandle;
use crate::runtime::timer::TimerEntry;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

/// Stand-in deadline for durations that overflow `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// A future that completes once a deadline is reached.
///
/// Created by [`Scheduler::sleep`](crate::Scheduler::sleep). On first
/// poll it arms a timer on the scheduler's worker through the admission
/// queue; the worker wakes the polling task when the deadline passes.
///
/// Dropping a `Sleep` disarms its timer.
pub struct Sleep {
    /// Absolute point in time when the sleep completes.
    deadline: Instant,

    /// Whether the timer has been accepted by the worker.
    registered: bool,

    /// Disarm flag shared with the timer entry.
    cancelled: Arc<AtomicBool>,

    /// Admission queue of the scheduler driving the timer.
    injector: InjectorHandle,
}

impl Sleep {
    pub(crate) fn new(injector: InjectorHandle, duration: Duration) -> Self {
        let now = Instant::now();

        Self {
            deadline: now
                .checked_add(duration)
                .unwrap_or_else(|| now + FAR_FUTURE),
            registered: false,
            cancelled: Arc::new(AtomicBool::new(false)),
            injector,
        }
    }

    /// The instant at which this sleep completes.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Returns `true` if the deadline has passed.
    pub fn is_elapsed(&self) -> bool {
        Instant::now() >= self.deadline
    }
}

impl Future for Sleep {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let this = self.get_mut();

        if Instant::now() >= this.deadline {
            return Poll::Ready(());
        }

        if !this.registered {
            this.registered = this.injector.set_timer(TimerEntry {
                deadline: this.deadline,
                waker: cx.waker().clone(),
                cancelled: this.cancelled.clone(),
            });
        }

        Poll::Pending
    }
}

impl Drop for Sleep {
    fn drop(&mut self) {
        self.cancelled.store(true, Ordering::Release);
    }
}

impl fmt::Debug for Sleep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sleep")
            .field("deadline", &self.deadline)
            .field("registered", &self.registered)
            .finish()
    }
}
