//! Builders turning callback-style producers into futures.
//!
//! Each builder hands `block` one or two callbacks and returns a future that
//! resolves the first time one of them fires. Callbacks may be called from
//! any thread, synchronously inside `block` or later. Calls after the first
//! are ignored. If every callback is dropped uncalled, the future is
//! abandoned.
use crate::{
    resolver::{FailableResolver, Resolver},
    Error, Executor, FailableFuture, Future,
};
use std::error::Error as StdError;

pub type Callback<A> = Box<dyn Fn(A) + Send + Sync + 'static>;

/// A callback taking an optional value and an optional error.
pub type OptionalCallback<T, E> = Box<dyn Fn(Option<T>, Option<E>) + Send + Sync + 'static>;

/// `(T) -> ()`
pub fn promise<T, B>(executor: &Executor, block: B) -> Future<T>
where
    T: Clone + Send + Sync + 'static,
    B: FnOnce(Callback<T>),
{
    let (resolver, future) = Future::pair(executor);
    block(put(resolver));
    future
}

fn put<T>(resolver: Resolver<T>) -> Callback<T>
where
    T: Send + Sync + 'static,
{
    Box::new(move |value| {
        resolver.put(value);
    })
}

/// `(Result<T, E>) -> ()`
pub fn promise_result<T, E, B>(executor: &Executor, block: B) -> FailableFuture<T>
where
    T: Clone + Send + Sync + 'static,
    E: StdError + Send + Sync + 'static,
    B: FnOnce(Callback<Result<T, E>>),
{
    let (resolver, future) = FailableFuture::pair(executor);
    block(Box::new(move |result| {
        resolver.complete(result);
    }));
    future
}

/// `(success: (T) -> (), failure: (Error) -> ()) -> ()`
pub fn promise_split<T, B>(executor: &Executor, block: B) -> FailableFuture<T>
where
    T: Clone + Send + Sync + 'static,
    B: FnOnce(Callback<T>, Callback<Error>),
{
    let (resolver, future) = FailableFuture::pair(executor);
    let failure = resolver.clone();
    block(
        Box::new(move |value| {
            resolver.put(value);
        }),
        Box::new(move |error| {
            failure.fail(error);
        }),
    );
    future
}

/// `(T?, Error?) -> ()`
///
/// A value wins over an error when both are present. Neither resolves the
/// future to [`Error::NoElements`].
pub fn promise_optional<T, E, B>(executor: &Executor, block: B) -> FailableFuture<T>
where
    T: Clone + Send + Sync + 'static,
    E: StdError + Send + Sync + 'static,
    B: FnOnce(OptionalCallback<T, E>),
{
    let (resolver, future) = FailableFuture::pair(executor);
    block(Box::new(move |value, error| {
        complete_optional(&resolver, value, error);
    }));
    future
}

fn complete_optional<T, E>(resolver: &FailableResolver<T>, value: Option<T>, error: Option<E>)
where
    T: Send + Sync + 'static,
    E: StdError + Send + Sync + 'static,
{
    match (value, error) {
        (Some(value), _) => resolver.put(value),
        (None, Some(error)) => resolver.fail(Error::new(error)),
        (None, None) => resolver.fail(Error::NoElements),
    };
}

/// `(Error?) -> ()` for work that produces no value.
pub fn promise_completion<E, B>(executor: &Executor, block: B) -> FailableFuture<()>
where
    E: StdError + Send + Sync + 'static,
    B: FnOnce(Callback<Option<E>>),
{
    let (resolver, future) = FailableFuture::pair(executor);
    block(Box::new(move |error| {
        match error {
            Some(error) => resolver.fail(Error::new(error)),
            None => resolver.put(()),
        };
    }));
    future
}
