//! Default execution contexts for the two handler categories.

use std::sync::{Arc, OnceLock};

use crate::context::{ExecutionContext, ThreadPool};

/// Selects where each category of handler runs.
///
/// Transform handlers (`map`, `then`, `recover`) and terminal handlers
/// (`catch`, `finally`, `on_settled`) are configured independently. A
/// `Config` is passed into chain-construction entry points such as
/// [`Promise::pair_with`](crate::Promise::pair_with) and inherited by every
/// dependent promise in the chain; there is no mutable global to poke.
#[derive(Clone)]
pub struct Config {
    /// Context for `map`, `then` and `recover` handlers.
    pub transform: ExecutionContext,
    /// Context for `catch`, `finally` and `on_settled` handlers.
    pub terminal: ExecutionContext,
}

impl Config {
    pub fn new(transform: ExecutionContext, terminal: ExecutionContext) -> Self {
        Self {
            transform,
            terminal,
        }
    }

    /// Both categories inline, for deterministic tests.
    ///
    /// This defeats the asynchrony guarantee documented on
    /// [`ExecutionContext::Immediate`]; production chains should stick with
    /// [`Config::default`].
    pub fn immediate() -> Self {
        Self::new(ExecutionContext::Immediate, ExecutionContext::Immediate)
    }
}

impl Default for Config {
    /// Both categories on one process-shared serial pool, so handlers on a
    /// given promise fire in attachment order.
    fn default() -> Self {
        let pool = shared_pool();
        Self::new(
            ExecutionContext::Pool(Arc::clone(&pool)),
            ExecutionContext::Pool(pool),
        )
    }
}

fn shared_pool() -> Arc<ThreadPool> {
    static POOL: OnceLock<Arc<ThreadPool>> = OnceLock::new();
    Arc::clone(POOL.get_or_init(ThreadPool::serial))
}
