use std::io;

use thiserror::Error;

/// Errors raised at the worker and submission boundary.
///
/// These are returned synchronously by [`start_worker`](crate::start_worker),
/// [`Scheduler::submit`](crate::Scheduler::submit) and
/// [`logging::setup`](crate::logging::setup). Failures of the submitted
/// computation itself never show up here; they are captured on the
/// [`ResultHandle`](crate::task::ResultHandle) as a [`TaskError`].
#[derive(Debug, Error)]
pub enum Error {
    /// The background thread could not be created.
    #[error("failed to spawn background thread: {0}")]
    ResourceExhausted(#[source] io::Error),

    /// The target scheduler has been stopped and no longer admits work.
    #[error("worker is unavailable: the scheduler has been stopped")]
    WorkerUnavailable,

    /// The computation has already been handed to a scheduler.
    #[error("computation was already submitted")]
    InvalidState,

    /// A global log subscriber is already installed.
    #[error("failed to install log subscriber: {0}")]
    Logging(#[from] tracing_subscriber::util::TryInitError),
}

/// The ways a submitted computation can end without a value.
///
/// Returned by the retrieval methods of
/// [`ResultHandle`](crate::task::ResultHandle).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaskError<E> {
    /// The computation returned `Err`.
    #[error("computation failed: {0}")]
    Failed(E),

    /// The computation panicked on the worker thread.
    #[error("computation panicked: {0}")]
    Panicked(String),

    /// The computation was cancelled before it produced an outcome.
    #[error("computation was cancelled")]
    Cancelled,

    /// A bounded wait elapsed before the computation finished.
    ///
    /// The computation is unaffected and keeps running.
    #[error("timed out waiting for the computation")]
    Timeout,

    /// The outcome was already taken from this handle.
    #[error("outcome was already retrieved")]
    Consumed,
}

impl<E> TaskError<E> {
    /// Returns `true` for [`TaskError::Cancelled`].
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TaskError::Cancelled)
    }

    /// Returns `true` for [`TaskError::Timeout`].
    pub fn is_timeout(&self) -> bool {
        matches!(self, TaskError::Timeout)
    }

    /// Returns the error produced by the computation, if it failed with one.
    pub fn into_failure(self) -> Option<E> {
        match self {
            TaskError::Failed(err) => Some(err),
            _ => None,
        }
    }
}
