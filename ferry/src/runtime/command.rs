use super::task::Runnable;
use super::timer::TimerEntry;

use std::sync::Arc;

/// A request delivered to the worker through the admission queue.
///
/// Every interaction another thread has with a scheduler takes the form
/// of one of these commands.
pub(crate) enum Command {
    /// A newly submitted task, to be registered and queued.
    Spawn(Arc<dyn Runnable>),

    /// A known task that was woken and must be polled again.
    Schedule(Arc<dyn Runnable>),

    /// A timer to arm on the worker's timer heap.
    SetTimer(TimerEntry),

    /// Drain runnable work, cancel the rest and exit.
    Shutdown,
}
