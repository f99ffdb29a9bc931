use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Future returned by [`yield_now`].
struct YieldNow {
    yielded: bool,
}

impl Future for YieldNow {
    type Output = ();

    /// Wakes itself and returns `Pending` on the first poll, so the
    /// scheduler requeues the task behind the work that is already ready.
    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            return Poll::Ready(());
        }

        self.yielded = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}

/// Suspends the current computation once.
///
/// This is the cheapest suspension point: other ready computations on
/// the same worker get to run, and a pending cancellation takes effect.
///
/// # Examples
///
/// ```rust,ignore
/// scheduler.submit(async {
///     first_half();
///     yield_now().await;
///     second_half();
///     Ok::<_, Infallible>(())
/// })?;
/// ```
pub async fn yield_now() {
    YieldNow { yielded: false }.await
}
