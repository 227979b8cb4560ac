//! Aggregation over groups of promises.
//!
//! Both combinators are built purely from promise handles and resolver
//! clones; the settle-once cell is what makes fail-fast and
//! first-settlement-wins fall out without extra bookkeeping.

use std::sync::{Arc, Mutex};

use crate::config::Config;
use crate::promise::Promise;

struct Gather<T> {
    slots: Vec<Option<T>>,
    remaining: usize,
}

impl<T, E> Promise<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Fulfills with every input's value in input order once all have
    /// fulfilled, or rejects with the first error observed.
    ///
    /// Later errors lose the race against the settle-once cell and are
    /// dropped. An empty input fulfills immediately with an empty `Vec`.
    ///
    /// # Examples
    ///
    /// ```
    /// use promise_chain::Promise;
    /// use futures::executor::block_on;
    ///
    /// let all = Promise::all(vec![
    ///     Promise::<i32, String>::fulfilled(1),
    ///     Promise::fulfilled(2),
    ///     Promise::fulfilled(3),
    /// ]);
    /// assert_eq!(block_on(all), Ok(Ok(vec![1, 2, 3])));
    /// ```
    pub fn all<I>(promises: I) -> Promise<Vec<T>, E>
    where
        I: IntoIterator<Item = Promise<T, E>>,
    {
        Self::all_with(promises, Config::default())
    }

    /// [`all`](Self::all) with an explicit [`Config`] for the output promise.
    pub fn all_with<I>(promises: I, config: Config) -> Promise<Vec<T>, E>
    where
        I: IntoIterator<Item = Promise<T, E>>,
    {
        let promises: Vec<_> = promises.into_iter().collect();
        let (all, resolver) = Promise::pair_with(config);
        if promises.is_empty() {
            resolver.fulfill(Vec::new());
            return all;
        }

        let gather = Arc::new(Mutex::new(Gather {
            slots: vec![None; promises.len()],
            remaining: promises.len(),
        }));
        for (index, promise) in promises.iter().enumerate() {
            let gather = Arc::clone(&gather);
            let resolver = resolver.clone();
            promise.on_settled(move |result| match result {
                Ok(value) => {
                    let finished = {
                        let mut gather = gather.lock().unwrap();
                        gather.slots[index] = Some(value);
                        gather.remaining -= 1;
                        if gather.remaining == 0 {
                            Some(gather.slots.drain(..).flatten().collect::<Vec<_>>())
                        } else {
                            None
                        }
                    };
                    if let Some(values) = finished {
                        resolver.fulfill(values);
                    }
                }
                // Fail fast: the first rejection settles the output and
                // everything after it is a no-op.
                Err(error) => resolver.reject(error),
            });
        }
        all
    }

    /// Settles with the first input to settle, success or failure.
    ///
    /// All later settlements are ignored. Racing an empty set leaves the
    /// output with no resolver at all, so awaiting it reports
    /// [`Unfulfilled`](crate::Unfulfilled) rather than hanging.
    ///
    /// # Examples
    ///
    /// ```
    /// use promise_chain::Promise;
    /// use futures::executor::block_on;
    ///
    /// let (slow, _keep) = Promise::<i32, String>::pair();
    /// let winner = Promise::race(vec![slow, Promise::fulfilled(2)]);
    /// assert_eq!(block_on(winner), Ok(Ok(2)));
    /// ```
    pub fn race<I>(promises: I) -> Promise<T, E>
    where
        I: IntoIterator<Item = Promise<T, E>>,
    {
        Self::race_with(promises, Config::default())
    }

    /// [`race`](Self::race) with an explicit [`Config`] for the output
    /// promise.
    pub fn race_with<I>(promises: I, config: Config) -> Promise<T, E>
    where
        I: IntoIterator<Item = Promise<T, E>>,
    {
        let (winner, resolver) = Promise::pair_with(config);
        for promise in promises {
            let resolver = resolver.clone();
            promise.on_settled(move |result| resolver.settle(result));
        }
        winner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Unfulfilled;
    use futures::executor::block_on;
    use std::thread;
    use std::time::{Duration, Instant};

    fn fulfill_after(value: i32, delay: Duration) -> Promise<i32, String> {
        let (promise, resolver) = Promise::pair();
        thread::spawn(move || {
            thread::sleep(delay);
            resolver.fulfill(value);
        });
        promise
    }

    #[test]
    fn all_preserves_input_order() {
        let all = Promise::all(vec![
            fulfill_after(1, Duration::from_millis(30)),
            fulfill_after(2, Duration::from_millis(10)),
        ]);
        assert_eq!(block_on(all), Ok(Ok(vec![1, 2])));
    }

    #[test]
    fn all_rejects_with_the_first_error_without_waiting() {
        let all = Promise::all(vec![
            Promise::<i32, String>::rejected("X".into()),
            fulfill_after(1, Duration::from_millis(300)),
        ]);
        let start = Instant::now();
        assert_eq!(block_on(all), Ok(Err("X".to_string())));
        assert!(start.elapsed() < Duration::from_millis(200));
    }

    #[test]
    fn all_of_nothing_fulfills_with_an_empty_vec() {
        let all = Promise::<i32, String>::all(Vec::new());
        assert_eq!(block_on(all), Ok(Ok(Vec::new())));
    }

    #[test]
    fn all_drops_errors_after_the_first() {
        let all = Promise::all(vec![
            Promise::<i32, String>::rejected("first".into()),
            Promise::<i32, String>::rejected("second".into()),
        ]);
        assert_eq!(block_on(all), Ok(Err("first".to_string())));
    }

    #[test]
    fn race_takes_the_first_settlement() {
        let winner = Promise::race(vec![
            fulfill_after(1, Duration::from_millis(10)),
            fulfill_after(2, Duration::from_millis(80)),
        ]);
        assert_eq!(block_on(winner), Ok(Ok(1)));
    }

    #[test]
    fn race_propagates_an_early_rejection() {
        let winner = Promise::race(vec![
            fulfill_after(1, Duration::from_millis(80)),
            Promise::<i32, String>::rejected("lost".into()),
        ]);
        assert_eq!(block_on(winner), Ok(Err("lost".to_string())));
    }

    #[test]
    fn empty_race_is_abandoned() {
        let winner = Promise::<i32, String>::race(Vec::new());
        assert_eq!(block_on(winner), Err(Unfulfilled));
    }
}
