use super::builder::{WorkerBuilder, report};
use super::injector::InjectorHandle;
use super::task::{Computation, ResultHandle, Task};
use crate::error::Error;
use crate::time::{Sleep, Timeout};
use crate::utils::lock;

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

use tracing::Dispatch;

/// Name of the worker started by [`submit`] when no scheduler is given.
const DEFAULT_WORKER_NAME: &str = "ferry-default";

/// Shared default worker used by [`submit`].
static DEFAULT_SCHEDULER: Mutex<Option<Scheduler>> = Mutex::new(None);

/// A handle to a running scheduler.
///
/// `Scheduler` is cheap to clone and can be sent to any thread. It is
/// the only way to reach the worker: every method goes through the
/// scheduler's admission queue, never through the worker's own queues.
///
/// Dropping every handle does not stop the worker; the thread is
/// detached and lives until [`stop`](Self::stop) or process exit.
#[derive(Clone)]
pub struct Scheduler {
    shared: Arc<Shared>,
}

struct Shared {
    /// Admission queue of the worker.
    injector: InjectorHandle,

    /// Name of the worker thread.
    name: String,

    /// Identifier of the worker thread.
    thread_id: ThreadId,

    /// Join handle, taken by the first `stop()` that joins.
    thread: Mutex<Option<JoinHandle<()>>>,

    /// Injected logger for boundary failures.
    dispatch: Option<Dispatch>,
}

impl Scheduler {
    pub(crate) fn new(
        injector: InjectorHandle,
        thread: JoinHandle<()>,
        name: String,
        dispatch: Option<Dispatch>,
    ) -> Self {
        let thread_id = thread.thread().id();

        Self {
            shared: Arc::new(Shared {
                injector,
                name,
                thread_id,
                thread: Mutex::new(Some(thread)),
                dispatch,
            }),
        }
    }

    /// Name of the worker thread.
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Returns `true` until [`stop`](Self::stop) is called.
    pub fn is_running(&self) -> bool {
        self.shared.injector.is_open()
    }

    /// Returns `true` when called from the worker thread itself.
    pub fn is_worker_thread(&self) -> bool {
        thread::current().id() == self.shared.thread_id
    }

    /// Submits a computation to this scheduler.
    ///
    /// Never blocks. The computation starts later on the worker thread;
    /// its outcome, including a failure or a panic, is delivered through
    /// the returned handle only.
    ///
    /// # Errors
    ///
    /// - [`Error::WorkerUnavailable`] if the scheduler has been stopped.
    /// - [`Error::InvalidState`] if the computation was already submitted.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let scheduler = ferry::start_worker()?;
    ///
    /// let handle = scheduler.submit(async { Ok::<_, Infallible>("done") })?;
    /// assert_eq!(handle.wait(), Ok("done"));
    /// ```
    pub fn submit<C>(&self, computation: C) -> Result<ResultHandle<C::Output, C::Error>, Error>
    where
        C: Computation,
    {
        let injector = &self.shared.injector;

        let task = injector
            .spawn(|| {
                let future = computation.claim()?;
                Ok(Arc::new(Task::new(future, injector.clone())))
            })
            .map_err(|err| self.rejected(err))?;

        tracing::trace!(worker = %self.shared.name, task = task.id(), "computation submitted");

        Ok(ResultHandle::new(task))
    }

    /// Returns a future that completes after `duration`.
    ///
    /// The timer is driven by this scheduler's worker. A sleep cannot be
    /// armed once the scheduler stops; a computation suspended on one is
    /// cancelled by [`stop`](Self::stop).
    pub fn sleep(&self, duration: Duration) -> Sleep {
        Sleep::new(self.shared.injector.clone(), duration)
    }

    /// Bounds `future` by `duration`, using this scheduler's timers.
    pub fn timeout<F>(&self, duration: Duration, future: F) -> Timeout<F>
    where
        F: Future,
    {
        Timeout::new(future, self.sleep(duration))
    }

    /// Stops the worker.
    ///
    /// Admission closes immediately. The worker then runs whatever is
    /// ready, without waiting for timers, cancels every computation that
    /// is still suspended and exits. Called from any thread but the
    /// worker, this also waits for the thread to finish.
    ///
    /// Calling it more than once is harmless; never calling it is fine.
    pub fn stop(&self) {
        if self.shared.injector.shutdown() {
            tracing::debug!(worker = %self.shared.name, "stop requested");
        }

        if self.is_worker_thread() {
            return;
        }

        let thread = lock(&self.shared.thread).take();

        if let Some(thread) = thread
            && thread.join().is_err()
        {
            tracing::error!(worker = %self.shared.name, "worker thread panicked");
        }
    }

    fn rejected(&self, err: Error) -> Error {
        report(self.shared.dispatch.as_ref(), || {
            tracing::warn!(worker = %self.shared.name, error = %err, "submission rejected");
        });

        err
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("name", &self.shared.name)
            .field("running", &self.is_running())
            .finish()
    }
}

/// Starts a new background worker with the default configuration.
///
/// Shorthand for `WorkerBuilder::new().start()`.
pub fn start_worker() -> Result<Scheduler, Error> {
    WorkerBuilder::new().start()
}

/// Returns the shared default scheduler, starting it if needed.
///
/// The default worker is started on first use and restarted if it has
/// been stopped, so repeated calls share one thread.
pub fn default_scheduler() -> Result<Scheduler, Error> {
    let mut slot = lock(&DEFAULT_SCHEDULER);

    if let Some(scheduler) = slot.as_ref()
        && scheduler.is_running()
    {
        return Ok(scheduler.clone());
    }

    let scheduler = WorkerBuilder::new().name(DEFAULT_WORKER_NAME).start()?;
    *slot = Some(scheduler.clone());

    Ok(scheduler)
}

/// Submits a computation to the shared default scheduler.
///
/// See [`Scheduler::submit`] and [`default_scheduler`].
pub fn submit<C>(computation: C) -> Result<ResultHandle<C::Output, C::Error>, Error>
where
    C: Computation,
{
    default_scheduler()?.submit(computation)
}
