//! # Ferry
//!
//! **Ferry** carries asynchronous work across threads. It starts a
//! dedicated background worker that owns a single cooperative scheduler,
//! and lets any other thread hand computations to that scheduler and
//! collect their outcome later, without ever stalling the worker.
//!
//! It is part of the **Nebula** ecosystem and provides:
//!
//! - A **background worker** that drives one cooperative scheduler until
//!   it is stopped or the process exits
//! - A **submission bridge**: [`Scheduler::submit`] enqueues work from any
//!   thread through a single locked admission queue and returns at once
//! - **Result handles** that can be blocked on, polled, awaited, or given
//!   a continuation, and that resolve exactly once
//! - **Cooperative cancellation** that takes effect at suspension points
//! - **Timers** driven by the worker: [`Scheduler::sleep`] and
//!   [`Scheduler::timeout`]
//! - A structured, queue-backed [`logging`] pipeline
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::convert::Infallible;
//! use std::time::Duration;
//!
//! fn main() -> Result<(), ferry::Error> {
//!     let scheduler = ferry::start_worker()?;
//!
//!     let timer = scheduler.clone();
//!     let handle = scheduler.submit(async move {
//!         timer.sleep(Duration::from_millis(10)).await;
//!         Ok::<_, Infallible>(42)
//!     })?;
//!
//!     assert_eq!(handle.wait(), Ok(42));
//!
//!     scheduler.stop();
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`task`]: Result handles, deferred computations and task states
//! - [`time`]: Worker-driven sleep and timeout
//! - [`logging`]: JSON logging through a queue-backed sink

mod error;
mod runtime;
mod utils;

pub mod logging;
pub mod time;

pub use error::{Error, TaskError};
pub use runtime::builder::WorkerBuilder;
pub use runtime::task;
pub use runtime::yield_now::yield_now;
pub use runtime::{Scheduler, default_scheduler, start_worker, submit};

pub use ferry_macros::{main, test};
