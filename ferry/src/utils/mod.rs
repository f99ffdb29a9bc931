//! Internal data structures.
//!
//! This module provides low-level utilities used by the worker run loop.
//! In particular, it exposes a [`Slab`] used as the registry of live
//! tasks, with fast indexed storage and reuse of freed slots.

mod slab;

pub(crate) use slab::Slab;

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Locks `mutex`, recovering the guard if a previous holder panicked.
///
/// Ferry never runs user code while holding one of its own locks, so the
/// protected data is consistent even after a poisoning panic.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
