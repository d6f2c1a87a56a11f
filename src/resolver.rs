//! Write handles for futures that are resolved from outside, e.g. by a
//! callback-based API.
use crate::{slot::Slot, Abandoned, Error};
use std::sync::Arc;
use tracing::warn;

struct Completer<T>
where
    T: Send + Sync + 'static,
{
    slot: Arc<Slot<T>>,
}

impl<T> Drop for Completer<T>
where
    T: Send + Sync + 'static,
{
    /// If nothing resolved the slot, wake every waiter with an error.
    fn drop(&mut self) {
        if self.slot.abandon(Abandoned::Dropped) {
            warn!("resolver dropped without resolving its future");
        }
    }
}

/// Writes the value of a [`Future`](crate::Future).
///
/// Clones share the same future. Only the first write takes effect. When the
/// last clone is dropped before any write, the future is abandoned and
/// [`Future::wait`](crate::Future::wait) panics instead of blocking forever.
///
/// # Examples
///
/// ```
/// use promise_slot::{Executor, Future};
/// use std::thread;
/// let executor = Executor::inline();
/// let (resolver, future) = Future::<String>::pair(&executor);
/// let task = thread::spawn(move || future.wait());
/// resolver.put("🍓".into());
/// assert_eq!(task.join().expect("The task thread has panicked"), "🍓");
/// ```
pub struct Resolver<T>
where
    T: Send + Sync + 'static,
{
    completer: Arc<Completer<T>>,
}

impl<T> Clone for Resolver<T>
where
    T: Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            completer: self.completer.clone(),
        }
    }
}

impl<T> Resolver<T>
where
    T: Send + Sync + 'static,
{
    pub(crate) fn new(slot: Arc<Slot<T>>) -> Self {
        Self {
            completer: Arc::new(Completer { slot }),
        }
    }

    /// Returns `true` if this write resolved the future.
    pub fn put(&self, value: T) -> bool {
        self.completer.slot.publish(Ok(value))
    }

    pub fn is_resolved(&self) -> bool {
        self.completer.slot.is_resolved()
    }
}

/// Writes the outcome of a [`FailableFuture`](crate::FailableFuture).
///
/// Dropping the last clone before any write fails the future with
/// [`Abandoned::Dropped`].
pub struct FailableResolver<T>
where
    T: Send + Sync + 'static,
{
    inner: Resolver<Result<T, Error>>,
}

impl<T> Clone for FailableResolver<T>
where
    T: Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> FailableResolver<T>
where
    T: Send + Sync + 'static,
{
    pub(crate) fn new(slot: Arc<Slot<Result<T, Error>>>) -> Self {
        Self {
            inner: Resolver::new(slot),
        }
    }

    pub fn put(&self, value: T) -> bool {
        self.inner.put(Ok(value))
    }

    pub fn fail(&self, error: Error) -> bool {
        self.inner.put(Err(error))
    }

    pub fn put_result(&self, result: Result<T, Error>) -> bool {
        self.inner.put(result)
    }

    /// Writes a result carrying any error type.
    pub fn complete<E>(&self, result: Result<T, E>) -> bool
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.inner.put(result.map_err(Error::new))
    }

    pub fn is_resolved(&self) -> bool {
        self.inner.is_resolved()
    }
}
