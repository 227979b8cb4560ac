//! Promise and resolver handles plus the chaining operators.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use crate::cell::{self, Cell, Handler, Settlement, Shared};
use crate::config::Config;
use crate::context::ExecutionContext;
use crate::Unfulfilled;

/// Read-only handle to an eventual single outcome.
///
/// Cloning a `Promise` does not fork the computation; every clone observes
/// the same settlement. Registering two continuations on the same handle
/// forms a branch: both receive the settlement independently.
pub struct Promise<T, E> {
    shared: Shared<T, E>,
}

/// Write capability over one promise.
///
/// The first `fulfill`/`reject`/`settle` across all clones wins; later calls
/// are silent no-ops, so producers racing to settle the same promise are an
/// accepted, defused race rather than an error.
pub struct Resolver<T, E> {
    shared: Shared<T, E>,
}

impl<T, E> Clone for Promise<T, E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T, E> Clone for Resolver<T, E> {
    fn clone(&self) -> Self {
        self.shared.lock().unwrap().add_resolver();
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T, E> Drop for Resolver<T, E> {
    /// When the last clone drops without settling, the promise is abandoned:
    /// handlers are discarded and awaiters observe [`Unfulfilled`].
    fn drop(&mut self) {
        cell::abandon(&self.shared);
    }
}

impl<T, E> Promise<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// A fresh pending promise and its resolver, on the default [`Config`].
    ///
    /// # Examples
    ///
    /// ```
    /// use promise_chain::Promise;
    /// use futures::executor::block_on;
    /// use std::thread;
    ///
    /// let (promise, resolver) = Promise::<String, String>::pair();
    /// thread::spawn(move || resolver.fulfill("🍓".into()));
    /// assert_eq!(block_on(promise), Ok(Ok("🍓".into())));
    /// ```
    pub fn pair() -> (Self, Resolver<T, E>) {
        Self::pair_with(Config::default())
    }

    /// A fresh pending pair on an explicit [`Config`]; every dependent
    /// promise created by the operators below inherits it.
    pub fn pair_with(config: Config) -> (Self, Resolver<T, E>) {
        let shared = Cell::shared(config);
        (
            Self {
                shared: Arc::clone(&shared),
            },
            Resolver { shared },
        )
    }

    /// A promise already fulfilled with `value`.
    pub fn fulfilled(value: T) -> Self {
        Self::settled(Ok(value))
    }

    /// A promise already rejected with `error`.
    pub fn rejected(error: E) -> Self {
        Self::settled(Err(error))
    }

    /// Lifts a ready `Result` into a settled promise.
    pub fn settled(result: Result<T, E>) -> Self {
        let (promise, resolver) = Self::pair();
        resolver.settle(result);
        promise
    }

    fn config(&self) -> Config {
        self.shared.lock().unwrap().config.clone()
    }

    fn observe(&self, handler: Handler<T, E>) {
        cell::observe(&self.shared, handler);
    }

    /// Forwards this promise's eventual settlement into `resolver`. The
    /// forwarding hop runs inline inside whichever dispatch settles this
    /// promise; only user handlers get the asynchrony guarantee.
    fn pipe(&self, resolver: Resolver<T, E>) {
        self.observe(Handler::new(ExecutionContext::Immediate, move |result| {
            resolver.settle(result)
        }));
    }

    /// Transforms the fulfillment value, creating a dependent promise.
    ///
    /// `f` runs on the transform context; an `Err` return rejects the
    /// dependent promise. A rejection of this promise skips `f` entirely and
    /// is forwarded unchanged.
    ///
    /// # Examples
    ///
    /// ```
    /// use promise_chain::Promise;
    /// use futures::executor::block_on;
    ///
    /// let halved = Promise::<i32, String>::fulfilled(10)
    ///     .map(|n| if n % 2 == 0 { Ok(n / 2) } else { Err("odd".into()) });
    /// assert_eq!(block_on(halved), Ok(Ok(5)));
    /// ```
    pub fn map<U, F>(&self, f: F) -> Promise<U, E>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> Result<U, E> + Send + 'static,
    {
        let config = self.config();
        let (next, resolver) = Promise::pair_with(config.clone());
        self.observe(Handler::new(config.transform, move |result| match result {
            Ok(value) => resolver.settle(f(value)),
            Err(error) => resolver.reject(error),
        }));
        next
    }

    /// Chains an asynchronous continuation, flattening its promise.
    ///
    /// The dependent promise settles with the settlement of the promise `f`
    /// returns, never with the promise object itself.
    ///
    /// # Examples
    ///
    /// ```
    /// use promise_chain::Promise;
    /// use futures::executor::block_on;
    ///
    /// let chained = Promise::<i32, String>::fulfilled(2)
    ///     .then(|n| Promise::fulfilled(n + 1));
    /// assert_eq!(block_on(chained), Ok(Ok(3)));
    /// ```
    pub fn then<U, F>(&self, f: F) -> Promise<U, E>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> Promise<U, E> + Send + 'static,
    {
        let config = self.config();
        let (next, resolver) = Promise::pair_with(config.clone());
        self.observe(Handler::new(config.transform, move |result| match result {
            Ok(value) => f(value).pipe(resolver),
            Err(error) => resolver.reject(error),
        }));
        next
    }

    /// Continues the chain past a rejection.
    ///
    /// `f` is invoked only when this promise rejects, and its returned
    /// promise drives the dependent settlement; fulfillment passes through
    /// untouched. Unlike [`catch`](Self::catch) the chain keeps going.
    pub fn recover<F>(&self, f: F) -> Promise<T, E>
    where
        F: FnOnce(E) -> Promise<T, E> + Send + 'static,
    {
        let config = self.config();
        let (next, resolver) = Promise::pair_with(config.clone());
        self.observe(Handler::new(config.transform, move |result| match result {
            Ok(value) => resolver.fulfill(value),
            Err(error) => f(error).pipe(resolver),
        }));
        next
    }

    /// Terminal rejection observer.
    ///
    /// `f` runs on the terminal context when this promise rejects and the
    /// error goes no further. Several independent `catch` registrations on
    /// one promise all fire.
    ///
    /// # Examples
    ///
    /// ```
    /// use promise_chain::Promise;
    /// use std::sync::mpsc::channel;
    ///
    /// let (tx, rx) = channel();
    /// Promise::<i32, String>::rejected("boom".into())
    ///     .catch(move |error| tx.send(error).unwrap());
    /// assert_eq!(rx.recv().unwrap(), "boom");
    /// ```
    pub fn catch<F>(&self, f: F)
    where
        F: FnOnce(E) + Send + 'static,
    {
        let config = self.config();
        self.observe(Handler::new(config.terminal, move |result| {
            if let Err(error) = result {
                f(error);
            }
        }));
    }

    /// Runs `f` on either outcome and passes the settlement through
    /// unchanged.
    pub fn finally<F>(&self, f: F) -> Promise<T, E>
    where
        F: FnOnce() + Send + 'static,
    {
        let config = self.config();
        let (next, resolver) = Promise::pair_with(config.clone());
        self.observe(Handler::new(config.terminal, move |result| {
            f();
            resolver.settle(result);
        }));
        next
    }

    /// Terminal leaf observer for the whole settlement.
    ///
    /// Runs on the terminal context; this is the primitive the combinators
    /// are built on.
    pub fn on_settled<F>(&self, f: F)
    where
        F: FnOnce(Result<T, E>) + Send + 'static,
    {
        let config = self.config();
        self.observe(Handler::new(config.terminal, f));
    }
}

impl<T, E> Resolver<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    pub fn fulfill(self, value: T) {
        self.settle(Ok(value));
    }

    pub fn reject(self, error: E) {
        self.settle(Err(error));
    }

    /// Settles the promise. Only the first effective call across all clones
    /// has any effect.
    pub fn settle(self, result: Result<T, E>) {
        cell::settle(&self.shared, result);
    }
}

impl<T, E> Future for Promise<T, E>
where
    T: Clone,
    E: Clone,
{
    type Output = Result<Result<T, E>, Unfulfilled>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut cell = self.shared.lock().unwrap();
        match &cell.state {
            Settlement::Fulfilled(value) => Poll::Ready(Ok(Ok(value.clone()))),
            Settlement::Rejected(error) => Poll::Ready(Ok(Err(error.clone()))),
            Settlement::Pending if cell.abandoned => Poll::Ready(Err(Unfulfilled)),
            Settlement::Pending => {
                cell.push_waker(cx.waker().clone());
                Poll::Pending
            }
        }
    }
}
