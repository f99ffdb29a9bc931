//! Core runtime components.
//!
//! This module contains the background worker and everything it needs
//! to run submitted computations.
//!
//! It is responsible for:
//! - starting and stopping the worker thread,
//! - admitting work from other threads through a single locked queue,
//! - driving tasks cooperatively on the worker thread,
//! - delivering outcomes back to result handles.
//!
//! Most users only interact with [`Scheduler`], [`WorkerBuilder`] and
//! the types re-exported from [`task`].

mod command;
mod core;
mod executor;

pub(crate) mod builder;
pub(crate) mod injector;
pub(crate) mod timer;
pub(crate) mod yield_now;

pub mod task;

pub use self::core::{Scheduler, default_scheduler, start_worker, submit};
