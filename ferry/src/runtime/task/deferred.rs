use crate::error::Error;
use crate::utils::lock;

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex};

/// Something that can be submitted to a scheduler.
///
/// Every `Send + 'static` future producing a `Result` is a computation:
/// ownership guarantees it is submitted at most once. [`Deferred`]
/// covers the case where several parties share one computation and only
/// the first submission may succeed.
pub trait Computation: Send + 'static {
    /// Value produced on success.
    type Output: Send + 'static;

    /// Error produced on failure.
    type Error: Send + 'static;

    /// The future driven by the worker.
    type Future: Future<Output = Result<Self::Output, Self::Error>> + Send + 'static;

    /// Hands over the future.
    ///
    /// Fails with [`Error::InvalidState`] if it was already handed over.
    fn claim(self) -> Result<Self::Future, Error>;
}

impl<F, T, E> Computation for F
where
    F: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    type Output = T;
    type Error = E;
    type Future = F;

    fn claim(self) -> Result<F, Error> {
        Ok(self)
    }
}

/// A shareable, not-yet-started computation.
///
/// Clones refer to the same computation. The first submission takes it;
/// any later submission of a clone fails with
/// [`Error::InvalidState`].
///
/// # Examples
///
/// ```rust,ignore
/// let job = Deferred::new(async { Ok::<_, Infallible>(1) });
///
/// let handle = scheduler.submit(job.clone())?;
/// assert!(matches!(scheduler.submit(job), Err(Error::InvalidState)));
/// ```
pub struct Deferred<F> {
    slot: Arc<Mutex<Option<F>>>,
}

impl<F> Deferred<F> {
    /// Wraps `future` without starting it.
    pub fn new(future: F) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(future))),
        }
    }

    /// Returns `true` once the computation has been claimed.
    pub fn is_submitted(&self) -> bool {
        lock(&self.slot).is_none()
    }
}

impl<F> Clone for Deferred<F> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<F> fmt::Debug for Deferred<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("submitted", &self.is_submitted())
            .finish()
    }
}

impl<F, T, E> Computation for Deferred<F>
where
    F: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    type Output = T;
    type Error = E;
    type Future = F;

    fn claim(self) -> Result<F, Error> {
        let future = lock(&self.slot).take();
        future.ok_or(Error::InvalidState)
    }
}
