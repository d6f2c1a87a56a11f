//! Deferred error handling for fire-and-forget work.
//!
//! A [`Catch`] is a one-shot future of `Option<Error>`: it resolves to `None`
//! when the work succeeded and to `Some(error)` when it failed. Callbacks
//! attached with [`Catch::on_error`] fire exactly once each, whether they were
//! attached before or after the failure.
use crate::{
    queue::Queue,
    resolver::Resolver,
    slot::{Outcome, Slot},
    Error,
};
use std::{
    future::{Future as StdFuture, IntoFuture},
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};
use tracing::debug;

/// Handle for observing the failure of work that has no other way to report
/// it.
///
/// If no callback is ever attached and nobody waits, a routed error is
/// dropped.
///
/// # Examples
///
/// ```
/// use promise_slot::{Error, Executor, FailableFuture};
/// use std::sync::mpsc::channel;
/// let executor = Executor::inline();
/// let (tx, rx) = channel();
/// FailableFuture::<i32>::error(&executor, Error::NoElements)
///     .then(|_| Ok(()))
///     .on_error(move |e| tx.send(e.to_string()).unwrap());
/// assert_eq!(rx.recv().unwrap(), "completion fired with neither a value nor an error");
/// ```
#[derive(Clone)]
pub struct Catch {
    slot: Arc<Slot<Option<Error>>>,
    target: Option<Arc<dyn Queue>>,
}

/// The routing end of a [`Catch`].
pub(crate) struct Router {
    resolver: Resolver<Option<Error>>,
}

impl Router {
    pub(crate) fn route(self, result: Result<(), Error>) {
        if let Err(error) = &result {
            debug!(%error, "routing async failure");
        }
        self.resolver.put(result.err());
    }
}

impl Catch {
    /// Callbacks fire on `target` when set, otherwise on whichever thread
    /// routes the error or attaches the callback.
    pub(crate) fn pair(target: Option<Arc<dyn Queue>>) -> (Router, Catch) {
        let slot = Slot::pending();
        let router = Router {
            resolver: Resolver::new(slot.clone()),
        };
        (router, Catch { slot, target })
    }

    pub fn on_error<F>(&self, callback: F) -> &Self
    where
        F: FnOnce(Error) + Send + 'static,
    {
        let target = self.target.clone();
        self.slot.subscribe(move |outcome| {
            let Some(error) = failure(outcome) else {
                return;
            };
            match target {
                Some(queue) => queue.submit(Box::new(move || callback(error))),
                None => callback(error),
            }
        });
        self
    }

    /// Blocks until the work has finished, returning its error if it failed.
    pub fn wait(&self) -> Option<Error> {
        failure(&self.slot.wait())
    }

    /// `true` once the work has finished, successfully or not.
    pub fn is_settled(&self) -> bool {
        self.slot.is_resolved()
    }
}

fn failure(outcome: &Outcome<Option<Error>>) -> Option<Error> {
    match outcome {
        Ok(error) => error.clone(),
        Err(reason) => Some(Error::from(reason.clone())),
    }
}

pub struct CatchWait {
    slot: Arc<Slot<Option<Error>>>,
}

impl StdFuture for CatchWait {
    type Output = Option<Error>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.slot.poll_wait(cx).map(|outcome| failure(&outcome))
    }
}

impl IntoFuture for Catch {
    type Output = Option<Error>;
    type IntoFuture = CatchWait;

    fn into_future(self) -> Self::IntoFuture {
        CatchWait { slot: self.slot }
    }
}
