//! Task state.
//!
//! Two layers of state are tracked per task. The scheduling word
//! (`IDLE` .. `FINISHED`) lives in an atomic on the task and decides
//! whether a wake-up must requeue it. The lifecycle ([`TaskState`]) is
//! what a [`ResultHandle`](super::ResultHandle) observes.

/// Task is suspended and not scheduled.
///
/// It waits for a waker to move it back to `QUEUED`.
pub(crate) const IDLE: usize = 0;

/// Task is queued for execution.
///
/// It sits either in the admission queue or in the worker's ready queue,
/// never in both.
pub(crate) const QUEUED: usize = 1;

/// Task is being polled by the worker.
pub(crate) const RUNNING: usize = 2;

/// Task was woken while being polled.
///
/// It is requeued as soon as the current poll returns.
pub(crate) const NOTIFIED: usize = 3;

/// Task is done and has been released by the worker.
///
/// Wake-ups are ignored from here on.
pub(crate) const FINISHED: usize = 4;

/// Lifecycle of a submitted computation as seen through its handle.
///
/// ```text
/// Pending ──► Running ──► Completed | Failed | Cancelled
///    └──────────────────► Cancelled
/// ```
///
/// Terminal states are absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    /// Admitted, never polled yet.
    Pending,

    /// Polled at least once, no outcome yet.
    Running,

    /// Finished with a value.
    Completed,

    /// Finished with an error or a panic.
    Failed,

    /// Cancelled before producing an outcome.
    Cancelled,
}

impl TaskState {
    /// Returns `true` once the computation can no longer change state.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Failed | TaskState::Cancelled
        )
    }
}
