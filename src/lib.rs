//! Callback-based promise chaining.
//!
//! A [`Promise`] is a read-only handle to a single eventual outcome; its
//! paired [`Resolver`] is the write capability that settles it exactly once.
//! Handlers registered through the chaining operators (`map`, `then`,
//! `recover`, `catch`, `finally`) each fire exactly once, always through an
//! [`ExecutionContext`] rather than inline on the settling or attaching
//! thread, so callers never observe sometimes-synchronous dispatch.
//!
//! # Examples
//!
//! ```
//! use promise_chain::Promise;
//! use futures::executor::block_on;
//! use std::thread;
//!
//! let (promise, resolver) = Promise::<i32, String>::pair();
//! let doubled = promise.map(|n| Ok(n * 2));
//!
//! thread::spawn(move || resolver.fulfill(21));
//! assert_eq!(block_on(doubled), Ok(Ok(42)));
//! ```
//!
//! Settlement can race from any number of producer threads; the first call
//! wins and every later one is a silent no-op:
//!
//! ```
//! use promise_chain::Promise;
//! use futures::executor::block_on;
//!
//! let (promise, resolver) = Promise::<&str, &str>::pair();
//! let loser = resolver.clone();
//! resolver.fulfill("first");
//! loser.reject("too late");
//! assert_eq!(block_on(promise), Ok(Ok("first")));
//! ```

use thiserror::Error;

mod cell;
mod combinators;
pub mod config;
pub mod context;
mod promise;

pub use config::Config;
pub use context::{ExecutionContext, ThreadPool};
pub use promise::{Promise, Resolver};

/// Every [`Resolver`] clone was dropped before the promise settled.
///
/// Awaiting such a promise yields this instead of blocking forever; any
/// handlers attached to it are dropped unfired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("every resolver was dropped before the promise settled")]
pub struct Unfulfilled;
