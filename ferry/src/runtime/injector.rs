use super::command::Command;
use super::task::Runnable;
use super::timer::TimerEntry;
use crate::error::Error;
use crate::utils::lock;

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Instant;

/// Shared handle to a scheduler's admission queue.
pub(crate) type InjectorHandle = Arc<Injector>;

/// Admission state of the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Accepting submissions.
    Open,

    /// `stop()` was called; runnable work is being drained.
    Closing,

    /// The run loop has exited.
    Terminated,
}

struct Admission {
    queue: VecDeque<Command>,
    phase: Phase,
}

/// The admission queue of a scheduler.
///
/// This is the only structure a scheduler shares with other threads.
/// Submissions, wake-ups and timer registrations from any thread are
/// pushed here under a lock; the worker thread moves them into its own
/// ready queue and timer heap, which nothing else can reach.
///
/// It also parks the worker with a condition variable while there is
/// nothing to do.
pub(crate) struct Injector {
    state: Mutex<Admission>,
    condvar: Condvar,
}

impl Injector {
    /// Creates an open, empty admission queue.
    pub(crate) fn new() -> Self {
        Injector {
            state: Mutex::new(Admission {
                queue: VecDeque::new(),
                phase: Phase::Open,
            }),
            condvar: Condvar::new(),
        }
    }

    /// Returns `true` while new submissions are accepted.
    pub(crate) fn is_open(&self) -> bool {
        lock(&self.state).phase == Phase::Open
    }

    /// Admits a newly submitted task.
    ///
    /// `make` builds the task while the admission lock is held, so it
    /// only runs if the task is actually admitted: a computation is never
    /// consumed by a submission that shutdown turns away.
    ///
    /// Fails with [`Error::WorkerUnavailable`] once shutdown has begun,
    /// or with whatever `make` returns.
    pub(crate) fn spawn<R, F>(&self, make: F) -> Result<Arc<R>, Error>
    where
        R: Runnable + 'static,
        F: FnOnce() -> Result<Arc<R>, Error>,
    {
        let mut state = lock(&self.state);

        if state.phase != Phase::Open {
            return Err(Error::WorkerUnavailable);
        }

        let task = make()?;
        state.queue.push_back(Command::Spawn(task.clone()));
        drop(state);

        self.condvar.notify_one();
        Ok(task)
    }

    /// Requeues a woken task.
    ///
    /// Accepted until the run loop exits, so that tasks can keep making
    /// progress while the scheduler drains.
    pub(crate) fn schedule(&self, task: Arc<dyn Runnable>) -> bool {
        self.push_if(|phase| phase != Phase::Terminated, Command::Schedule(task))
    }

    /// Arms a timer. Rejected once shutdown has begun.
    pub(crate) fn set_timer(&self, entry: TimerEntry) -> bool {
        self.push_if(|phase| phase == Phase::Open, Command::SetTimer(entry))
    }

    /// Closes admission and asks the worker to drain and exit.
    ///
    /// Returns `true` for the call that initiated shutdown.
    pub(crate) fn shutdown(&self) -> bool {
        self.push_if(|phase| phase == Phase::Open, Command::Shutdown)
    }

    /// Moves every pending command into `out` without blocking.
    pub(crate) fn drain(&self, out: &mut VecDeque<Command>) {
        out.extend(lock(&self.state).queue.drain(..));
    }

    /// Returns `true` if no command is waiting.
    pub(crate) fn is_empty(&self) -> bool {
        lock(&self.state).queue.is_empty()
    }

    /// Parks the worker until a command arrives or `deadline` passes,
    /// then moves every pending command into `out`.
    pub(crate) fn park(&self, deadline: Option<Instant>, out: &mut VecDeque<Command>) {
        let mut state = lock(&self.state);

        while state.queue.is_empty() {
            state = match deadline {
                None => self
                    .condvar
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        break;
                    }

                    self.condvar
                        .wait_timeout(state, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
            };
        }

        out.extend(state.queue.drain(..));
    }

    /// Marks the run loop as exited and returns what was still queued.
    pub(crate) fn terminate(&self) -> VecDeque<Command> {
        let mut state = lock(&self.state);
        state.phase = Phase::Terminated;

        std::mem::take(&mut state.queue)
    }

    fn push_if(&self, accept: impl FnOnce(Phase) -> bool, command: Command) -> bool {
        let mut state = lock(&self.state);

        if !accept(state.phase) {
            return false;
        }

        if let Command::Shutdown = command {
            state.phase = Phase::Closing;
        }

        state.queue.push_back(command);
        drop(state);

        self.condvar.notify_one();
        true
    }
}
