use super::sleep::Sleep;

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use thiserror::Error;

/// Error returned by [`Timeout`] when the deadline passes first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("deadline has elapsed")]
pub struct Elapsed;

/// A future bounded by a deadline.
///
/// Created by [`Scheduler::timeout`](crate::Scheduler::timeout). The
/// inner future is polled first, so a future that is ready at the
/// deadline still wins. When the deadline passes first the inner future
/// is dropped with the `Timeout`.
pub struct Timeout<F> {
    future: F,
    sleep: Sleep,
}

impl<F> Timeout<F> {
    pub(crate) fn new(future: F, sleep: Sleep) -> Self {
        Self { future, sleep }
    }

    /// Consumes the timeout, returning the inner future.
    pub fn into_inner(self) -> F {
        self.future
    }
}

impl<F> Future for Timeout<F>
where
    F: Future,
{
    type Output = Result<F::Output, Elapsed>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        // SAFETY: `future` is never moved out of a pinned `Timeout`;
        // `into_inner` takes `self` by value, which requires `Unpin` or
        // an unpinned value.
        let this = unsafe { self.get_unchecked_mut() };

        // SAFETY: structural pinning of `future`, see above.
        let future = unsafe { Pin::new_unchecked(&mut this.future) };
        if let Poll::Ready(value) = future.poll(cx) {
            return Poll::Ready(Ok(value));
        }

        if let Poll::Ready(()) = Pin::new(&mut this.sleep).poll(cx) {
            return Poll::Ready(Err(Elapsed));
        }

        Poll::Pending
    }
}
