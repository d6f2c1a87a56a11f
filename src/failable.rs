//! A future whose production can fail.
use crate::{
    catch::{Catch, Router},
    future::Future,
    queue::Queue,
    resolver::FailableResolver,
    slot::{Outcome, Slot},
    Error, Executor,
};
use std::{
    future::{Future as StdFuture, IntoFuture},
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

/// A `T` that will eventually exist, or an [`Error`] explaining why it
/// won't.
///
/// The success-or-error result is written once, as a whole.
///
/// # Examples
///
/// ```
/// use promise_slot::{Error, Executor, FailableFuture};
/// let executor = Executor::inline();
/// let failed = FailableFuture::<i32>::new(&executor, || Err(Error::NoElements));
/// assert!(failed.map(|v| Ok(v + 1)).wait().is_err());
/// assert_eq!(failed.recover(7).wait(), 7);
/// ```
pub struct FailableFuture<T>
where
    T: Send + Sync + 'static,
{
    slot: Arc<Slot<Result<T, Error>>>,
    executor: Executor,
}

impl<T> Clone for FailableFuture<T>
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

impl<T> FailableFuture<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub(crate) fn from_slot(executor: &Executor, slot: Arc<Slot<Result<T, Error>>>) -> Self {
        Self {
            slot,
            executor: executor.clone(),
        }
    }

    /// A lazy future. An error returned, or a panic raised, by `producer` is
    /// captured as the future's error.
    pub fn new<F>(executor: &Executor, producer: F) -> Self
    where
        F: FnOnce() -> Result<T, Error> + Send + 'static,
    {
        let slot = Slot::with_producer(executor.default_queue().clone(), producer);
        Self::from_slot(executor, slot)
    }

    pub fn value(executor: &Executor, value: T) -> Self {
        Self::from_slot(executor, Slot::resolved(Ok(value)))
    }

    pub fn error(executor: &Executor, error: Error) -> Self {
        Self::from_slot(executor, Slot::resolved(Err(error)))
    }

    pub fn pair(executor: &Executor) -> (FailableResolver<T>, Self) {
        let slot = Slot::pending();
        (
            FailableResolver::new(slot.clone()),
            Self::from_slot(executor, slot),
        )
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

    pub fn peek(&self) -> Option<Result<T, Error>> {
        self.slot.peek().cloned().map(flatten)
    }

    pub fn put(&self, value: T) -> bool {
        self.put_result(Ok(value))
    }

    pub fn fail(&self, error: Error) -> bool {
        self.put_result(Err(error))
    }

    /// Returns `false` if the future was already resolved.
    pub fn put_result(&self, result: Result<T, Error>) -> bool {
        self.slot.publish(Ok(result))
    }

    /// Blocks the calling thread until the future resolves.
    pub fn wait(&self) -> Result<T, Error> {
        flatten(self.slot.wait())
    }

    /// Errors pass through untouched; `transform` only sees values.
    pub fn map<R, F>(&self, transform: F) -> FailableFuture<R>
    where
        R: Clone + Send + Sync + 'static,
        F: FnOnce(T) -> Result<R, Error> + Send + 'static,
    {
        let slot = self.slot.derive(self.executor.default_queue().clone(), move |outcome| {
            Ok(flatten(outcome).and_then(transform))
        });
        FailableFuture::from_slot(&self.executor, slot)
    }

    /// Replaces an error with `default`.
    pub fn recover(&self, default: T) -> Future<T> {
        self.recover_with(move |_| default)
    }

    pub fn recover_with<F>(&self, recovery: F) -> Future<T>
    where
        F: FnOnce(Error) -> T + Send + 'static,
    {
        let slot = self.slot.derive(self.executor.default_queue().clone(), move |outcome| {
            Ok(flatten(outcome).unwrap_or_else(recovery))
        });
        Future::from_slot(&self.executor, slot)
    }

    /// Calls `on_value` on the default queue once the value exists. The
    /// future's error, or the one `on_value` returns, goes to the returned
    /// [`Catch`].
    pub fn then<F>(&self, on_value: F) -> Catch
    where
        F: FnOnce(T) -> Result<(), Error> + Send + 'static,
    {
        let (router, catch) = Catch::pair(None);
        let queue = self.executor.default_queue().clone();
        self.deliver(queue, router, on_value);
        catch
    }

    /// Calls `on_value` on `queue`. Errors are delivered on `queue` too.
    pub fn then_on<F>(&self, queue: &Arc<dyn Queue>, on_value: F) -> Catch
    where
        F: FnOnce(T) -> Result<(), Error> + Send + 'static,
    {
        let (router, catch) = Catch::pair(Some(queue.clone()));
        self.deliver(queue.clone(), router, on_value);
        catch
    }

    pub fn then_on_main<F>(&self, on_value: F) -> Catch
    where
        F: FnOnce(T) -> Result<(), Error> + Send + 'static,
    {
        let queue = self.executor.main_queue().clone();
        self.then_on(&queue, on_value)
    }

    fn deliver<F>(&self, queue: Arc<dyn Queue>, router: Router, on_value: F)
    where
        F: FnOnce(T) -> Result<(), Error> + Send + 'static,
    {
        self.slot.start();
        self.slot.subscribe(move |outcome| match flatten(outcome.clone()) {
            Ok(value) => queue.submit(Box::new(move || {
                let result = crate::slot::catch(move || on_value(value));
                router.route(result.map_err(Error::from).and_then(|result| result));
            })),
            Err(error) => router.route(Err(error)),
        });
    }

    /// A future with the same result that runs `on_success` or `on_error`
    /// whenever this one resolves.
    pub fn inspect<S, E>(&self, on_success: S, on_error: E) -> FailableFuture<T>
    where
        S: FnOnce(&T) + Send + 'static,
        E: FnOnce(&Error) + Send + 'static,
    {
        let slot = self.slot.observe(self.executor.default_queue().clone(), move |outcome| {
            match &outcome {
                Ok(Ok(value)) => on_success(value),
                Ok(Err(error)) => on_error(error),
                Err(reason) => on_error(&Error::from(reason.clone())),
            }
            outcome
        });
        FailableFuture::from_slot(&self.executor, slot)
    }
}

fn flatten<T>(outcome: Outcome<Result<T, Error>>) -> Result<T, Error> {
    outcome.map_err(Error::from).and_then(|result| result)
}

/// Resolves to the result of a [`FailableFuture`] without blocking a thread.
pub struct TryWait<T>
where
    T: Send + Sync + 'static,
{
    slot: Arc<Slot<Result<T, Error>>>,
}

impl<T> StdFuture for TryWait<T>
where
    T: Clone + Send + Sync + 'static,
{
    type Output = Result<T, Error>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.slot.poll_wait(cx).map(flatten)
    }
}

impl<T> IntoFuture for FailableFuture<T>
where
    T: Clone + Send + Sync + 'static,
{
    type Output = Result<T, Error>;
    type IntoFuture = TryWait<T>;

    fn into_future(self) -> Self::IntoFuture {
        TryWait { slot: self.slot }
    }
}
