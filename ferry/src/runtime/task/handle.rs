use super::core::Task;
use super::state::TaskState;
use crate::error::TaskError;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

/// A cross-thread handle to the outcome of a submitted computation.
///
/// The computation runs on the worker thread; the handle can live on
/// any thread. It offers several ways of getting at the outcome:
///
/// - [`wait`](Self::wait) and [`wait_timeout`](Self::wait_timeout) block
///   the calling thread,
/// - [`try_take`](Self::try_take) and [`state`](Self::state) never block,
/// - `.await` suspends the calling task instead of blocking a thread,
/// - [`on_complete`](Self::on_complete) hands the outcome to a callback.
///
/// The outcome can be retrieved once. Later retrievals report
/// [`TaskError::Consumed`].
///
/// Dropping the handle does **not** cancel the computation; use
/// [`cancel`](Self::cancel) for that.
///
/// Blocking on a handle from inside a computation running on the same
/// worker deadlocks that worker. Await the handle there instead.
pub struct ResultHandle<T, E> {
    task: Arc<Task<T, E>>,
}

impl<T, E> ResultHandle<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    pub(crate) fn new(task: Arc<Task<T, E>>) -> Self {
        Self { task }
    }

    /// A process-unique identifier of the computation.
    pub fn id(&self) -> u64 {
        self.task.id()
    }

    /// The current lifecycle state.
    pub fn state(&self) -> TaskState {
        self.task.completion.state()
    }

    /// Returns `true` once the computation reached a terminal state.
    pub fn is_finished(&self) -> bool {
        self.state().is_terminal()
    }

    /// Blocks the calling thread until the computation finishes.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let scheduler = ferry::start_worker()?;
    /// let handle = scheduler.submit(async { Ok::<_, Infallible>(21 * 2) })?;
    ///
    /// assert_eq!(handle.wait(), Ok(42));
    /// ```
    pub fn wait(self) -> Result<T, TaskError<E>> {
        self.task.completion.wait(None)
    }

    /// Blocks for at most `timeout`.
    ///
    /// Returns [`TaskError::Timeout`] if the computation is still going;
    /// it keeps running and the handle can be waited on again. A zero
    /// timeout only checks for an outcome.
    pub fn wait_timeout(&mut self, timeout: Duration) -> Result<T, TaskError<E>> {
        let deadline = Instant::now().checked_add(timeout);
        self.task.completion.wait(deadline)
    }

    /// Takes the outcome if it is available, without blocking.
    pub fn try_take(&mut self) -> Option<Result<T, TaskError<E>>> {
        self.task.completion.try_take()
    }

    /// Requests cancellation of the computation.
    ///
    /// A computation that has not started yet is cancelled on the spot
    /// and will never run. A running computation is cancelled when it
    /// next suspends; the code between its current suspension point and
    /// the next one still runs to completion, and if it finishes in that
    /// window its outcome stands.
    ///
    /// Returns `false` if the computation had already finished.
    pub fn cancel(&self) -> bool {
        let accepted = self.task.cancel();

        if accepted {
            tracing::trace!(task = self.task.id(), "cancellation requested");
        }

        accepted
    }

    /// Hands the outcome to `f` once it is known.
    ///
    /// If the computation already finished `f` runs immediately on the
    /// calling thread; otherwise it runs on the worker thread right
    /// after the computation finishes. A panic inside `f` is caught and
    /// logged.
    pub fn on_complete<F>(self, f: F)
    where
        F: FnOnce(Result<T, TaskError<E>>) + Send + 'static,
    {
        self.task.completion.on_complete(Box::new(f));
    }
}

impl<T, E> Future for ResultHandle<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    type Output = Result<T, TaskError<E>>;

    /// Resolves with the outcome without blocking the polling thread.
    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.task.completion.poll(cx)
    }
}

impl<T, E> fmt::Debug for ResultHandle<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultHandle")
            .field("id", &self.task.id())
            .field("state", &self.task.completion.state())
            .finish()
    }
}
