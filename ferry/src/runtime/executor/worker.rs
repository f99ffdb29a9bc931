use crate::runtime::command::Command;
use crate::runtime::injector::InjectorHandle;
use crate::runtime::task::Runnable;
use crate::runtime::timer::TimerEntry;
use crate::utils::Slab;

use std::collections::binary_heap::PeekMut;
use std::collections::{BinaryHeap, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use tracing::Dispatch;

/// Initial capacity of the live-task registry.
const REGISTRY_CAPACITY: usize = 64;

/// Timer heap size at which abandoned entries are first swept out.
const TIMER_SWEEP_THRESHOLD: usize = 64;

/// The run loop of a background worker.
///
/// A `Worker` is moved onto its dedicated thread and drives one
/// cooperative scheduler there. The ready queue, the timer heap and the
/// live-task registry are locals of [`run`](Self::run), so no other
/// thread can touch them; everything from outside arrives through the
/// admission queue.
///
/// Each iteration:
/// 1. Collect commands (parking when there is nothing ready)
/// 2. Register new tasks and arm timers
/// 3. Fire due timers
/// 4. Poll every task that was ready at the start of the pass, in order
pub(crate) struct Worker {
    /// Admission queue shared with scheduler handles and wakers.
    injector: InjectorHandle,

    /// Dispatcher installed on the worker thread, if one was injected.
    dispatch: Option<Dispatch>,
}

impl Worker {
    pub(crate) fn new(injector: InjectorHandle, dispatch: Option<Dispatch>) -> Self {
        Self { injector, dispatch }
    }

    /// Drives the scheduler until shutdown.
    ///
    /// Without a call to `stop()` this never returns.
    pub(crate) fn run(self) {
        let _dispatch = self.dispatch.as_ref().map(tracing::dispatcher::set_default);

        tracing::debug!("worker started");

        let mut ready: VecDeque<Arc<dyn Runnable>> = VecDeque::new();
        let mut timers: BinaryHeap<TimerEntry> = BinaryHeap::new();
        let mut live: Slab<Arc<dyn Runnable>> = Slab::new(REGISTRY_CAPACITY);
        let mut commands = VecDeque::new();
        let mut closing = false;
        let mut sweep_at = TIMER_SWEEP_THRESHOLD;

        loop {
            if ready.is_empty() && !closing {
                let deadline = timers.peek().map(|timer| timer.deadline);
                self.injector.park(deadline, &mut commands);
            } else {
                self.injector.drain(&mut commands);
            }

            for command in commands.drain(..) {
                match command {
                    Command::Spawn(task) => {
                        let key = live.insert(task.clone());
                        task.bind(key);
                        ready.push_back(task);
                    }
                    Command::Schedule(task) => ready.push_back(task),
                    Command::SetTimer(entry) => timers.push(entry),
                    Command::Shutdown => {
                        tracing::debug!(live = live.len(), "worker stopping");
                        closing = true;
                        timers.clear();
                    }
                }
            }

            if timers.len() >= sweep_at {
                sweep_cancelled(&mut timers);
                sweep_at = (timers.len() * 2).max(TIMER_SWEEP_THRESHOLD);
            }

            fire_due(&mut timers, Instant::now());

            if ready.is_empty() {
                if closing && self.injector.is_empty() {
                    break;
                }
                continue;
            }

            for _ in 0..ready.len() {
                let Some(task) = ready.pop_front() else {
                    break;
                };

                if task.clone().run().is_ready() {
                    live.remove(task.key());
                }
            }
        }

        drop(self.injector.terminate());

        let cancelled = live.len();
        for task in live.drain() {
            task.abort();
        }

        tracing::debug!(cancelled, "worker exited");
    }
}

/// Drops every timer whose sleep was dropped before it fired.
///
/// Abandoned entries still hold the owner's waker, and with it the task.
fn sweep_cancelled(timers: &mut BinaryHeap<TimerEntry>) {
    let before = timers.len();
    timers.retain(|timer| !timer.is_cancelled());

    tracing::trace!(swept = before - timers.len(), "timer heap swept");
}

/// Pops and fires every timer whose deadline is at or before `now`.
fn fire_due(timers: &mut BinaryHeap<TimerEntry>, now: Instant) {
    while let Some(timer) = timers.peek_mut() {
        if !timer.is_due(now) {
            break;
        }

        PeekMut::pop(timer).fire();
    }
}

#[cfg(test)]
mod tests {
    use super::{fire_due, sweep_cancelled};
    use crate::runtime::timer::TimerEntry;

    use std::collections::BinaryHeap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::task::{Wake, Waker};
    use std::time::{Duration, Instant};

    #[derive(Default)]
    struct Counter(std::sync::atomic::AtomicUsize);

    impl Wake for Counter {
        fn wake(self: Arc<Self>) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn entry(deadline: Instant, waker: &Waker, cancelled: bool) -> TimerEntry {
        TimerEntry {
            deadline,
            waker: waker.clone(),
            cancelled: Arc::new(AtomicBool::new(cancelled)),
        }
    }

    #[test]
    fn sweep_releases_abandoned_wakers() {
        let counter = Arc::new(Counter::default());
        let waker = Waker::from(counter.clone());
        let later = Instant::now() + Duration::from_secs(60);

        let mut timers = BinaryHeap::new();
        for i in 0..10 {
            timers.push(entry(later, &waker, i % 2 == 0));
        }
        assert_eq!(Arc::strong_count(&counter), 12);

        sweep_cancelled(&mut timers);

        assert_eq!(timers.len(), 5);
        assert_eq!(Arc::strong_count(&counter), 7);
    }

    #[test]
    fn only_live_due_timers_wake() {
        let counter = Arc::new(Counter::default());
        let waker = Waker::from(counter.clone());
        let now = Instant::now();

        let mut timers = BinaryHeap::new();
        timers.push(entry(now, &waker, false));
        timers.push(entry(now, &waker, true));
        timers.push(entry(now + Duration::from_secs(60), &waker, false));

        fire_due(&mut timers, now);

        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
        assert_eq!(timers.len(), 1);
    }
}
