use super::completion::{CancelRequest, Completion, Outcome, panic_message};
use super::state::{FINISHED, IDLE, NOTIFIED, QUEUED, RUNNING};
use super::waker::make_waker;
use crate::error::TaskError;
use crate::runtime::injector::InjectorHandle;
use crate::utils::lock;

use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

/// The boxed future a task drives.
type BoxFuture<T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send>>;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// A unit of work the worker can drive without knowing its output type.
///
/// The worker keeps a heterogeneous set of tasks as `Arc<dyn Runnable>`.
pub(crate) trait Runnable: Send + Sync {
    /// Polls the task once.
    ///
    /// Returns `Poll::Ready(())` exactly once, on the call that finishes
    /// the task; the worker then releases it from its registry.
    fn run(self: Arc<Self>) -> Poll<()>;

    /// Records the task's slot in the worker registry.
    fn bind(&self, key: usize);

    /// The slot recorded by [`bind`](Runnable::bind).
    fn key(&self) -> usize;

    /// Drops the future and resolves the task as cancelled.
    ///
    /// Used by the worker for tasks still suspended at shutdown.
    fn abort(&self);
}

/// A submitted computation owned by a scheduler.
///
/// A `Task` holds the future, its scheduling state and the
/// [`Completion`] shared with the [`ResultHandle`](super::ResultHandle).
/// The future is only ever touched by the worker thread; the mutex
/// around it exists so the task can be shared with wakers on any thread.
pub(crate) struct Task<T, E> {
    id: u64,

    /// The computation, taken out while it is being polled.
    future: Mutex<Option<BoxFuture<T, E>>>,

    /// Scheduling state (`IDLE`, `QUEUED`, ...).
    state: AtomicUsize,

    /// Slot in the worker registry.
    key: AtomicUsize,

    /// Admission queue of the owning scheduler, used to requeue on wake.
    injector: InjectorHandle,

    /// Outcome cell shared with the handle.
    pub(crate) completion: Completion<T, E>,
}

impl<T, E> Task<T, E> {
    pub(crate) fn id(&self) -> u64 {
        self.id
    }
}

impl<T, E> Task<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Creates a task in the `QUEUED` state.
    ///
    /// The caller is expected to push it through the admission queue
    /// right away.
    pub(crate) fn new<F>(future: F, injector: InjectorHandle) -> Self
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
    {
        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            future: Mutex::new(Some(Box::pin(future))),
            state: AtomicUsize::new(QUEUED),
            key: AtomicUsize::new(usize::MAX),
            injector,
            completion: Completion::new(),
        }
    }

    /// Polls the future once on the worker thread.
    ///
    /// A pending cancellation is honoured before the poll when the task
    /// has not run yet, and after the poll when it has just suspended.
    pub(crate) fn poll_once(self: Arc<Self>) -> Poll<()> {
        if self
            .state
            .compare_exchange(QUEUED, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Poll::Pending;
        }

        let Some(mut future) = lock(&self.future).take() else {
            self.state.store(FINISHED, Ordering::Release);
            return Poll::Ready(());
        };

        if !self.completion.start() {
            drop(future);
            self.finish(Err(TaskError::Cancelled));
            return Poll::Ready(());
        }

        let waker = make_waker(self.clone());
        let mut cx = Context::from_waker(&waker);

        let poll = panic::catch_unwind(AssertUnwindSafe(|| future.as_mut().poll(&mut cx)));

        match poll {
            Ok(Poll::Pending) => {
                if self.completion.is_cancel_requested() {
                    drop(future);
                    self.finish(Err(TaskError::Cancelled));
                    return Poll::Ready(());
                }

                *lock(&self.future) = Some(future);

                // Back to IDLE unless a wake-up arrived during the poll.
                if self
                    .state
                    .compare_exchange(RUNNING, IDLE, Ordering::AcqRel, Ordering::Acquire)
                    .is_err()
                {
                    self.state.store(QUEUED, Ordering::Release);
                    self.injector.schedule(self.clone());
                }

                Poll::Pending
            }
            Ok(Poll::Ready(result)) => {
                drop(future);
                self.finish(result.map_err(TaskError::Failed));
                Poll::Ready(())
            }
            Err(payload) => {
                drop(future);

                let message = panic_message(payload.as_ref());
                tracing::error!(task = self.id, panic = %message, "computation panicked");

                self.finish(Err(TaskError::Panicked(message)));
                Poll::Ready(())
            }
        }
    }

    /// Reschedules the task after a wake-up.
    ///
    /// An `IDLE` task moves to `QUEUED` and goes back through the
    /// admission queue. A `RUNNING` task moves to `NOTIFIED` and is
    /// requeued once its current poll returns.
    pub(crate) fn wake(self: Arc<Self>) {
        loop {
            match self.state.load(Ordering::Acquire) {
                IDLE => {
                    if self
                        .state
                        .compare_exchange(IDLE, QUEUED, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                    {
                        self.injector.schedule(self.clone());
                        return;
                    }
                }
                RUNNING => {
                    if self
                        .state
                        .compare_exchange(RUNNING, NOTIFIED, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                    {
                        return;
                    }
                }
                _ => return,
            }
        }
    }

    /// Requests cancellation.
    ///
    /// Returns `false` if the computation had already finished.
    pub(crate) fn cancel(self: &Arc<Self>) -> bool {
        match self.completion.request_cancel() {
            CancelRequest::Rejected => false,
            CancelRequest::Resolved | CancelRequest::Deferred => {
                // A suspended task has to be polled for the worker to
                // notice the request and release it.
                self.clone().wake();
                true
            }
        }
    }

    fn finish(&self, outcome: Outcome<T, E>) {
        self.state.store(FINISHED, Ordering::Release);
        self.completion.resolve(outcome);
    }
}

impl<T, E> Runnable for Task<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn run(self: Arc<Self>) -> Poll<()> {
        tracing::trace!(task = self.id, "polling task");
        self.poll_once()
    }

    fn bind(&self, key: usize) {
        self.key.store(key, Ordering::Relaxed);
    }

    fn key(&self) -> usize {
        self.key.load(Ordering::Relaxed)
    }

    fn abort(&self) {
        let future = lock(&self.future).take();
        drop(future);

        self.finish(Err(TaskError::Cancelled));
    }
}
