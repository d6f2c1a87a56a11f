//! Write-once futures that any number of threads can block on.
//!
//! A [`Future`] or [`FailableFuture`] is resolved exactly once, either by a
//! producer closure run on a worker queue or from outside through a
//! [`Resolver`]. Readers block with `wait`, compose with `map`, react with
//! `then`, or `.await` the handle from async code.
//!
//! ```
//! use promise_slot::{Config, Error, Executor, FailableFuture, Future};
//! use std::sync::mpsc::channel;
//!
//! let executor = Executor::new(&Config::default()).unwrap();
//! assert_eq!(Future::new(&executor, || 21).map(|v| v * 2).wait(), 42);
//!
//! let (tx, rx) = channel();
//! FailableFuture::value(&executor, 5)
//!     .then_on(executor.main_queue(), move |v| Ok(tx.send(v).unwrap()));
//! assert_eq!(rx.recv().unwrap(), 5);
//!
//! let failed = FailableFuture::<i32>::new(&executor, || Err(Error::NoElements));
//! assert!(failed.map(|v| Ok(v * 2)).wait().is_err());
//! ```
mod catch;
mod config;
pub mod continuation;
mod error;
mod executor;
mod failable;
mod future;
pub mod queue;
mod resolver;
mod slot;

pub use catch::{Catch, CatchWait};
pub use config::Config;
pub use error::{Abandoned, Error};
pub use executor::Executor;
pub use failable::{FailableFuture, TryWait};
pub use future::{Future, Wait};
pub use queue::Queue;
pub use resolver::{FailableResolver, Resolver};
