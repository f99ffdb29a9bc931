use super::state::TaskState;
use crate::error::TaskError;
use crate::utils::lock;

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll, Waker};
use std::time::Instant;

/// The outcome of a computation as delivered to its handle.
pub(crate) type Outcome<T, E> = Result<T, TaskError<E>>;

/// Continuation attached with [`ResultHandle::on_complete`](super::ResultHandle::on_complete).
pub(crate) type Continuation<T, E> = Box<dyn FnOnce(Outcome<T, E>) + Send>;

/// Result of a cancellation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CancelRequest {
    /// The computation never ran and is now `Cancelled`.
    Resolved,

    /// The computation is running; it stops at its next suspension point.
    Deferred,

    /// The computation already reached a terminal state.
    Rejected,
}

/// The single-assignment cell shared by a task and its handle.
///
/// The worker writes the outcome exactly once; any thread may block on
/// it through the condition variable, await it through registered
/// wakers, or hand it to a continuation.
pub(crate) struct Completion<T, E> {
    slot: Mutex<Slot<T, E>>,
    condvar: Condvar,
}

struct Slot<T, E> {
    /// Lifecycle state observed by the handle.
    state: TaskState,

    /// Outcome, until taken by a retrieval.
    outcome: Option<Outcome<T, E>>,

    /// Set when a cancellation reaches a running computation.
    cancel_requested: bool,

    /// Wakers of tasks awaiting the handle.
    waiters: Vec<Waker>,

    /// Continuation that receives the outcome instead of the slot.
    continuation: Option<Continuation<T, E>>,
}

impl<T, E> Completion<T, E> {
    pub(crate) fn new() -> Self {
        Self {
            slot: Mutex::new(Slot {
                state: TaskState::Pending,
                outcome: None,
                cancel_requested: false,
                waiters: Vec::new(),
                continuation: None,
            }),
            condvar: Condvar::new(),
        }
    }

    pub(crate) fn state(&self) -> TaskState {
        lock(&self.slot).state
    }

    pub(crate) fn is_cancel_requested(&self) -> bool {
        lock(&self.slot).cancel_requested
    }

    /// Marks the computation as running before a poll.
    ///
    /// Returns `false` if it must not be polled: it already reached a
    /// terminal state or a cancellation is pending.
    pub(crate) fn start(&self) -> bool {
        let mut slot = lock(&self.slot);

        if slot.state.is_terminal() || slot.cancel_requested {
            return false;
        }

        slot.state = TaskState::Running;
        true
    }

    /// Records a cancellation request.
    pub(crate) fn request_cancel(&self) -> CancelRequest {
        let mut slot = lock(&self.slot);
        let state = slot.state;

        match state {
            TaskState::Pending => {
                self.finish(slot, Err(TaskError::Cancelled));
                CancelRequest::Resolved
            }
            TaskState::Running => {
                slot.cancel_requested = true;
                CancelRequest::Deferred
            }
            TaskState::Completed | TaskState::Failed | TaskState::Cancelled => {
                CancelRequest::Rejected
            }
        }
    }

    /// Stores the terminal outcome and notifies every observer.
    ///
    /// Only the first call has an effect. Returns `false` if an outcome
    /// was already recorded.
    pub(crate) fn resolve(&self, outcome: Outcome<T, E>) -> bool {
        let slot = lock(&self.slot);

        if slot.state.is_terminal() {
            return false;
        }

        self.finish(slot, outcome);
        true
    }

    /// Publishes `outcome` on a slot that is known not to be terminal.
    ///
    /// Observers are notified after the lock is released.
    fn finish(&self, mut slot: MutexGuard<'_, Slot<T, E>>, outcome: Outcome<T, E>) {
        slot.state = match &outcome {
            Ok(_) => TaskState::Completed,
            Err(TaskError::Cancelled) => TaskState::Cancelled,
            Err(_) => TaskState::Failed,
        };

        let continuation = slot.continuation.take();
        let outcome = match continuation {
            Some(continuation) => Some((continuation, outcome)),
            None => {
                slot.outcome = Some(outcome);
                None
            }
        };

        let waiters = std::mem::take(&mut slot.waiters);
        drop(slot);

        self.condvar.notify_all();

        for waker in waiters {
            waker.wake();
        }

        if let Some((continuation, outcome)) = outcome {
            run_continuation(continuation, outcome);
        }
    }

    /// Blocks until the outcome is available or `deadline` passes.
    pub(crate) fn wait(&self, deadline: Option<Instant>) -> Outcome<T, E> {
        let mut slot = lock(&self.slot);

        loop {
            if slot.state.is_terminal() {
                return take(&mut slot);
            }

            slot = match deadline {
                None => self
                    .condvar
                    .wait(slot)
                    .unwrap_or_else(PoisonError::into_inner),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(TaskError::Timeout);
                    }

                    self.condvar
                        .wait_timeout(slot, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
            };
        }
    }

    /// Takes the outcome if the computation is done.
    pub(crate) fn try_take(&self) -> Option<Outcome<T, E>> {
        let mut slot = lock(&self.slot);

        if slot.state.is_terminal() {
            Some(take(&mut slot))
        } else {
            None
        }
    }

    /// Polls for the outcome, registering `cx`'s waker while pending.
    ///
    /// The waker is registered under the same lock that guards the
    /// state, so a concurrent resolution cannot be missed.
    pub(crate) fn poll(&self, cx: &mut Context<'_>) -> Poll<Outcome<T, E>> {
        let mut slot = lock(&self.slot);

        if slot.state.is_terminal() {
            return Poll::Ready(take(&mut slot));
        }

        if !slot.waiters.iter().any(|w| w.will_wake(cx.waker())) {
            slot.waiters.push(cx.waker().clone());
        }

        Poll::Pending
    }

    /// Routes the outcome to `continuation`.
    ///
    /// If the outcome is already known the continuation runs right away
    /// on the calling thread, otherwise on the worker thread when the
    /// computation finishes.
    pub(crate) fn on_complete(&self, continuation: Continuation<T, E>) {
        let mut slot = lock(&self.slot);

        if slot.state.is_terminal() {
            let outcome = take(&mut slot);
            drop(slot);
            run_continuation(continuation, outcome);
            return;
        }

        slot.continuation = Some(continuation);
    }
}

fn take<T, E>(slot: &mut Slot<T, E>) -> Outcome<T, E> {
    slot.outcome.take().unwrap_or(Err(TaskError::Consumed))
}

/// Runs a continuation, containing any panic it raises.
///
/// Continuations usually run on the worker thread, which must survive a
/// misbehaving callback.
fn run_continuation<T, E>(continuation: Continuation<T, E>, outcome: Outcome<T, E>) {
    let result = panic::catch_unwind(AssertUnwindSafe(move || continuation(outcome)));

    if let Err(payload) = result {
        tracing::error!(
            panic = %panic_message(payload.as_ref()),
            "continuation panicked"
        );
    }
}

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_owned()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "Box<dyn Any>".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::{CancelRequest, Completion};
    use crate::error::TaskError;
    use crate::task::TaskState;

    use std::sync::mpsc;
    use std::time::{Duration, Instant};

    #[test]
    fn resolves_only_once() {
        let completion = Completion::<u32, ()>::new();

        assert!(completion.resolve(Ok(1)));
        assert!(!completion.resolve(Ok(2)));
        assert!(!completion.resolve(Err(TaskError::Cancelled)));

        assert_eq!(completion.state(), TaskState::Completed);
        assert_eq!(completion.try_take(), Some(Ok(1)));
        assert_eq!(completion.try_take(), Some(Err(TaskError::Consumed)));
    }

    #[test]
    fn cancel_before_start_resolves_immediately() {
        let completion = Completion::<u32, ()>::new();

        assert_eq!(completion.request_cancel(), CancelRequest::Resolved);
        assert_eq!(completion.state(), TaskState::Cancelled);
        assert_eq!(completion.request_cancel(), CancelRequest::Rejected);
        assert!(!completion.start());
        assert!(!completion.resolve(Ok(3)));
    }

    #[test]
    fn cancel_while_running_is_deferred() {
        let completion = Completion::<u32, ()>::new();
        assert!(completion.start());

        assert_eq!(completion.request_cancel(), CancelRequest::Deferred);
        assert!(completion.is_cancel_requested());
        assert_eq!(completion.state(), TaskState::Running);
        assert!(!completion.start());
    }

    #[test]
    fn bounded_wait_times_out() {
        let completion = Completion::<u32, ()>::new();
        let deadline = Instant::now() + Duration::from_millis(5);

        assert_eq!(completion.wait(Some(deadline)), Err(TaskError::Timeout));
        assert_eq!(completion.state(), TaskState::Pending);
    }

    #[test]
    fn continuation_receives_outcome() {
        let completion = Completion::<u32, &'static str>::new();
        let (tx, rx) = mpsc::channel();

        completion.on_complete(Box::new(move |outcome| {
            tx.send(outcome).unwrap();
        }));
        completion.resolve(Err(TaskError::Failed("boom")));

        assert_eq!(rx.recv().unwrap(), Err(TaskError::Failed("boom")));
        assert_eq!(completion.state(), TaskState::Failed);
    }

    #[test]
    fn panicking_continuation_is_contained() {
        let completion = Completion::<u32, ()>::new();

        completion.on_complete(Box::new(|_| panic!("callback exploded")));

        assert!(completion.resolve(Ok(7)));
        assert_eq!(completion.state(), TaskState::Completed);
    }
}
