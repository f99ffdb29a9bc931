//! Timers driven by a scheduler's worker.
//!
//! There is no ambient timer: every timer belongs to the scheduler it
//! was created from.
//!
//! It includes:
//! - [`Sleep`], from [`Scheduler::sleep`](crate::Scheduler::sleep),
//! - [`Timeout`], from [`Scheduler::timeout`](crate::Scheduler::timeout).

mod sleep;
mod timeout;

pub use sleep::Sleep;
pub use timeout::{Elapsed, Timeout};
