//! A future that cannot fail.
use crate::{
    failable::FailableFuture,
    queue::Queue,
    resolver::Resolver,
    slot::{Outcome, Slot},
    Error, Executor,
};
use std::{
    future::{Future as StdFuture, IntoFuture},
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};
use tracing::warn;

/// A `T` that will eventually exist. Obtaining it never fails.
///
/// Cloning a `Future` shares the underlying value; every clone observes the
/// same first write.
///
/// # Examples
///
/// ```
/// use promise_slot::{Executor, Future};
/// let executor = Executor::inline();
/// let answer = Future::new(&executor, || 21).map(|v| v * 2);
/// assert_eq!(answer.wait(), 42);
/// ```
pub struct Future<T>
where
    T: Send + Sync + 'static,
{
    pub(crate) slot: Arc<Slot<T>>,
    pub(crate) executor: Executor,
}

impl<T> Clone for Future<T>
where
    T: Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
            executor: self.executor.clone(),
        }
    }
}

impl<T> Future<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub(crate) fn from_slot(executor: &Executor, slot: Arc<Slot<T>>) -> Self {
        Self {
            slot,
            executor: executor.clone(),
        }
    }

    /// A lazy future: `producer` runs on the default queue the first time
    /// the future is started, waited on or observed with `then`.
    pub fn new<F>(executor: &Executor, producer: F) -> Self
    where
        F: FnOnce() -> T + Send + 'static,
    {
        let slot = Slot::with_producer(executor.default_queue().clone(), producer);
        Self::from_slot(executor, slot)
    }

    pub fn value(executor: &Executor, value: T) -> Self {
        Self::from_slot(executor, Slot::resolved(value))
    }

    /// An unresolved future and the handle that resolves it.
    pub fn pair(executor: &Executor) -> (Resolver<T>, Self) {
        let slot = Slot::pending();
        (Resolver::new(slot.clone()), Self::from_slot(executor, slot))
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    pub fn start(&self) {
        self.slot.start()
    }

    pub fn is_resolved(&self) -> bool {
        self.slot.is_resolved()
    }

    /// The value, if the future has resolved.
    pub fn peek(&self) -> Option<T> {
        match self.slot.peek() {
            Some(Ok(value)) => Some(value.clone()),
            _ => None,
        }
    }

    /// Resolves the future. Returns `false` if it already had a value.
    pub fn put(&self, value: T) -> bool {
        self.slot.publish(Ok(value))
    }

    /// Blocks the calling thread until the value exists.
    ///
    /// Never call this from a serial queue the value itself depends on.
    ///
    /// # Panics
    ///
    /// Panics if the producer panicked or the future's [`Resolver`] was
    /// dropped without writing.
    pub fn wait(&self) -> T {
        settle(self.slot.wait())
    }

    pub fn map<R, F>(&self, transform: F) -> Future<R>
    where
        R: Clone + Send + Sync + 'static,
        F: FnOnce(T) -> R + Send + 'static,
    {
        let slot = self.slot.derive(self.executor.default_queue().clone(), move |outcome| {
            outcome.map(transform)
        });
        Future::from_slot(&self.executor, slot)
    }

    /// Like [`map`](Self::map) with a transform that can fail.
    pub fn try_map<R, F>(&self, transform: F) -> FailableFuture<R>
    where
        R: Clone + Send + Sync + 'static,
        F: FnOnce(T) -> Result<R, Error> + Send + 'static,
    {
        let slot = self.slot.derive(self.executor.default_queue().clone(), move |outcome| {
            Ok(outcome.map_err(Error::from).and_then(transform))
        });
        FailableFuture::from_slot(&self.executor, slot)
    }

    /// Calls `on_value` on the default queue once the value exists.
    pub fn then<F>(&self, on_value: F)
    where
        F: FnOnce(T) + Send + 'static,
    {
        let queue = self.executor.default_queue().clone();
        self.then_on(&queue, on_value)
    }

    /// Calls `on_value` on `queue` once the value exists.
    pub fn then_on<F>(&self, queue: &Arc<dyn Queue>, on_value: F)
    where
        F: FnOnce(T) + Send + 'static,
    {
        let queue = queue.clone();
        self.slot.start();
        self.slot.subscribe(move |outcome| match outcome {
            Ok(value) => {
                let value = value.clone();
                queue.submit(Box::new(move || on_value(value)));
            }
            Err(reason) => warn!(%reason, "future abandoned, callback skipped"),
        });
    }

    pub fn then_on_main<F>(&self, on_value: F)
    where
        F: FnOnce(T) + Send + 'static,
    {
        let queue = self.executor.main_queue().clone();
        self.then_on(&queue, on_value)
    }

    /// A future with the same value that runs `on_value` whenever this one
    /// resolves, whether or not the returned future is ever used.
    pub fn tap<F>(&self, on_value: F) -> Future<T>
    where
        F: FnOnce(&T) + Send + 'static,
    {
        let slot = self.slot.observe(self.executor.default_queue().clone(), move |outcome| {
            if let Ok(value) = &outcome {
                on_value(value);
            }
            outcome
        });
        Future::from_slot(&self.executor, slot)
    }
}

fn settle<T>(outcome: Outcome<T>) -> T {
    match outcome {
        Ok(value) => value,
        Err(reason) => panic!("{reason}"),
    }
}

/// Resolves to the value of a [`Future`] without blocking a thread.
pub struct Wait<T>
where
    T: Send + Sync + 'static,
{
    slot: Arc<Slot<T>>,
}

impl<T> StdFuture for Wait<T>
where
    T: Clone + Send + Sync + 'static,
{
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.slot.poll_wait(cx).map(settle)
    }
}

impl<T> IntoFuture for Future<T>
where
    T: Clone + Send + Sync + 'static,
{
    type Output = T;
    type IntoFuture = Wait<T>;

    fn into_future(self) -> Self::IntoFuture {
        Wait { slot: self.slot }
    }
}
