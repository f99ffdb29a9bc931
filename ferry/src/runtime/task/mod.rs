//! Submitted computations and their handles.
//!
//! This module defines how a computation travels from the submitting
//! thread to the worker and how its outcome travels back.
//!
//! It includes:
//! - [`Computation`] and [`Deferred`], what can be submitted,
//! - [`ResultHandle`], the cross-thread view of the outcome,
//! - [`TaskState`], the lifecycle observed through the handle,
//! - the internal task, its waker and its completion cell, used by the
//!   worker run loop.

mod completion;
mod deferred;
mod handle;
mod waker;

pub(crate) mod core;
pub(crate) mod state;

pub(crate) use self::core::{Runnable, Task};

pub use deferred::{Computation, Deferred};
pub use handle::ResultHandle;
pub use state::TaskState;
