use super::Scheduler;
use super::executor::worker::Worker;
use super::injector::Injector;
use crate::error::Error;

use std::sync::Arc;
use std::thread;

use tracing::Dispatch;

/// Default name of worker threads.
const DEFAULT_THREAD_NAME: &str = "ferry-worker";

/// Builder for configuring and starting a background worker.
///
/// # Examples
///
/// ```rust,ignore
/// let scheduler = WorkerBuilder::new()
///     .name("ingest")
///     .stack_size(4 * 1024 * 1024)
///     .start()?;
/// ```
pub struct WorkerBuilder {
    /// Name given to the worker thread.
    name: String,

    /// Stack size of the worker thread, platform default if unset.
    stack_size: Option<usize>,

    /// Dispatcher the worker reports through, global default if unset.
    dispatch: Option<Dispatch>,
}

impl WorkerBuilder {
    /// Creates a builder with the default configuration.
    pub fn new() -> Self {
        Self {
            name: DEFAULT_THREAD_NAME.to_owned(),
            stack_size: None,
            dispatch: None,
        }
    }

    /// Sets the name of the worker thread.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the stack size of the worker thread, in bytes.
    pub fn stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }

    /// Injects the logger used by this worker.
    ///
    /// The worker thread runs with `dispatch` as its default
    /// dispatcher, and failures at the `start`/`submit` boundary are
    /// reported through it.
    pub fn dispatch(mut self, dispatch: Dispatch) -> Self {
        self.dispatch = Some(dispatch);
        self
    }

    /// Starts the worker thread and returns a handle to its scheduler.
    ///
    /// The scheduler accepts submissions as soon as this returns, even
    /// if the thread has not been scheduled by the OS yet.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ResourceExhausted`] if the thread cannot be
    /// created; nothing is left running in that case.
    pub fn start(self) -> Result<Scheduler, Error> {
        let injector = Arc::new(Injector::new());
        let worker = Worker::new(injector.clone(), self.dispatch.clone());

        let mut builder = thread::Builder::new().name(self.name.clone());
        if let Some(bytes) = self.stack_size {
            builder = builder.stack_size(bytes);
        }

        let handle = match builder.spawn(move || worker.run()) {
            Ok(handle) => handle,
            Err(err) => {
                report(self.dispatch.as_ref(), || {
                    tracing::error!(worker = %self.name, error = %err, "failed to start worker");
                });
                return Err(Error::ResourceExhausted(err));
            }
        };

        Ok(Scheduler::new(injector, handle, self.name, self.dispatch))
    }
}

impl Default for WorkerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs `f` under the injected dispatcher, or the ambient one.
pub(crate) fn report(dispatch: Option<&Dispatch>, f: impl FnOnce()) {
    match dispatch {
        Some(dispatch) => tracing::dispatcher::with_default(dispatch, f),
        None => f(),
    }
}
