use super::core::Task;

use std::mem::ManuallyDrop;
use std::sync::Arc;
use std::task::{RawWaker, RawWakerVTable, Waker};

/// Returns the `RawWakerVTable` for a task with output `Result<T, E>`.
///
/// # Safety
///
/// Every function in the vtable expects a pointer produced by
/// `Arc::into_raw` on an `Arc<Task<T, E>>` and keeps the reference
/// count balanced.
fn vtable<T: Send + 'static, E: Send + 'static>() -> &'static RawWakerVTable {
    &RawWakerVTable::new(
        clone_raw::<T, E>,
        wake_raw::<T, E>,
        wake_by_ref_raw::<T, E>,
        drop_raw::<T, E>,
    )
}

/// Creates a [`Waker`] that requeues `task` on its scheduler.
///
/// Waking is safe from any thread: the task goes back through the
/// scheduler's admission queue.
pub(crate) fn make_waker<T: Send + 'static, E: Send + 'static>(task: Arc<Task<T, E>>) -> Waker {
    let raw = RawWaker::new(Arc::into_raw(task) as *const (), vtable::<T, E>());

    // SAFETY: the pointer comes from `Arc::into_raw` and the vtable
    // manages exactly that reference.
    unsafe { Waker::from_raw(raw) }
}

fn clone_raw<T: Send + 'static, E: Send + 'static>(ptr: *const ()) -> RawWaker {
    // SAFETY: `ptr` was produced by `Arc::into_raw` for this task type.
    let task = ManuallyDrop::new(unsafe { Arc::from_raw(ptr as *const Task<T, E>) });
    let cloned = Arc::clone(&task);

    RawWaker::new(Arc::into_raw(cloned) as *const (), vtable::<T, E>())
}

/// Consumes the waker's reference.
fn wake_raw<T: Send + 'static, E: Send + 'static>(ptr: *const ()) {
    // SAFETY: ownership of the reference moves back into the `Arc`.
    let task = unsafe { Arc::from_raw(ptr as *const Task<T, E>) };
    task.wake();
}

fn wake_by_ref_raw<T: Send + 'static, E: Send + 'static>(ptr: *const ()) {
    // SAFETY: the waker keeps its reference, so the `Arc` is not dropped.
    let task = ManuallyDrop::new(unsafe { Arc::from_raw(ptr as *const Task<T, E>) });
    Arc::clone(&task).wake();
}

fn drop_raw<T: Send + 'static, E: Send + 'static>(ptr: *const ()) {
    // SAFETY: releases the reference held by the waker.
    drop(unsafe { Arc::from_raw(ptr as *const Task<T, E>) });
}
