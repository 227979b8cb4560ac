//! The settle-once cell shared by a promise and its resolvers.

use std::mem;
use std::sync::{Arc, Mutex};
use std::task::Waker;

use crate::config::Config;
use crate::context::ExecutionContext;

/// Outcome state of one promise. Leaves `Pending` at most once and is
/// immutable from then on.
#[derive(Debug)]
pub(crate) enum Settlement<T, E> {
    Pending,
    Fulfilled(T),
    Rejected(E),
}

impl<T, E> Settlement<T, E> {
    pub(crate) fn is_pending(&self) -> bool {
        matches!(self, Settlement::Pending)
    }
}

/// A registered observer: the callback plus the context it must run on.
pub(crate) struct Handler<T, E> {
    run: Box<dyn FnOnce(Result<T, E>) + Send>,
    context: ExecutionContext,
}

impl<T, E> Handler<T, E> {
    pub(crate) fn new<F>(context: ExecutionContext, run: F) -> Self
    where
        F: FnOnce(Result<T, E>) + Send + 'static,
    {
        Self {
            run: Box::new(run),
            context,
        }
    }

    fn dispatch(self, result: Result<T, E>)
    where
        T: Send + 'static,
        E: Send + 'static,
    {
        let Handler { run, context } = self;
        context.dispatch(Box::new(move || run(result)));
    }
}

/// Jointly owned by the resolver side and every promise handle; the mutex is
/// the sole mutation gate.
pub(crate) struct Cell<T, E> {
    pub(crate) state: Settlement<T, E>,
    handlers: Vec<Handler<T, E>>,
    wakers: Vec<Waker>,
    resolvers: usize,
    pub(crate) abandoned: bool,
    pub(crate) config: Config,
}

pub(crate) type Shared<T, E> = Arc<Mutex<Cell<T, E>>>;

impl<T, E> Cell<T, E> {
    pub(crate) fn shared(config: Config) -> Shared<T, E> {
        Arc::new(Mutex::new(Cell {
            state: Settlement::Pending,
            handlers: Vec::new(),
            wakers: Vec::new(),
            resolvers: 1,
            abandoned: false,
            config,
        }))
    }

    pub(crate) fn add_resolver(&mut self) {
        self.resolvers += 1;
    }

    pub(crate) fn push_waker(&mut self, waker: Waker) {
        self.wakers.push(waker);
    }
}

/// First call transitions the cell and drains its observers; every later
/// call finds the cell settled and returns without effect. Handlers are
/// dispatched in registration order, each with its own clone of the outcome,
/// after the lock is released.
pub(crate) fn settle<T, E>(shared: &Shared<T, E>, result: Result<T, E>)
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    let (handlers, wakers) = {
        let mut cell = shared.lock().unwrap();
        if !cell.state.is_pending() {
            return;
        }
        cell.state = match result.clone() {
            Ok(value) => Settlement::Fulfilled(value),
            Err(error) => Settlement::Rejected(error),
        };
        (mem::take(&mut cell.handlers), mem::take(&mut cell.wakers))
    };
    for handler in handlers {
        handler.dispatch(result.clone());
    }
    for waker in wakers {
        waker.wake();
    }
}

/// Registers an observer. On a pending cell the handler is queued; on a
/// settled cell it is scheduled right away, but still through its execution
/// context rather than on the caller's stack; on an abandoned cell it is
/// dropped unfired. Either way the handler leaves the lock's critical
/// section before it runs or drops.
pub(crate) fn observe<T, E>(shared: &Shared<T, E>, handler: Handler<T, E>)
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    let mut handler = Some(handler);
    let ready = {
        let mut cell = shared.lock().unwrap();
        match &cell.state {
            Settlement::Pending => {
                if !cell.abandoned {
                    if let Some(handler) = handler.take() {
                        cell.handlers.push(handler);
                    }
                }
                None
            }
            Settlement::Fulfilled(value) => Some(Ok(value.clone())),
            Settlement::Rejected(error) => Some(Err(error.clone())),
        }
    };
    match (handler.take(), ready) {
        (Some(handler), Some(result)) => handler.dispatch(result),
        // Queued while pending, or dropped unfired on an abandoned cell.
        _ => {}
    }
}

/// Called on every resolver drop. When the last live resolver goes away with
/// the cell still pending, the cell can never settle: pending handlers are
/// dropped unfired and awaiters are woken to observe the abandonment.
pub(crate) fn abandon<T, E>(shared: &Shared<T, E>) {
    let (dropped, wakers) = {
        let mut cell = shared.lock().unwrap();
        cell.resolvers -= 1;
        if cell.resolvers > 0 || !cell.state.is_pending() || cell.abandoned {
            return;
        }
        cell.abandoned = true;
        (mem::take(&mut cell.handlers), mem::take(&mut cell.wakers))
    };
    // Dropping a handler can drop a dependent cell's resolver, which takes
    // that cell's lock; it must happen after this lock is released.
    drop(dropped);
    for waker in wakers {
        waker.wake();
    }
}
