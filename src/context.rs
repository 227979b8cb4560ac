//! Where handlers run once a promise settles.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;

pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

/// Scheduling capability for handler invocation.
///
/// The set of dispatch modes is closed: handlers either run inline or get
/// queued onto a [`ThreadPool`].
#[derive(Clone)]
pub enum ExecutionContext {
    /// Runs jobs synchronously on whichever thread triggers them.
    ///
    /// This gives up the uniform-asynchrony guarantee: a handler attached to
    /// an already-settled promise fires inside the attaching call, and a
    /// handler attached to a pending promise fires inside `settle` on the
    /// producer's stack. Reserved for deterministic tests.
    Immediate,
    /// Queues jobs onto a pool, in submission order.
    Pool(Arc<ThreadPool>),
}

impl ExecutionContext {
    pub(crate) fn dispatch(&self, job: Job) {
        match self {
            ExecutionContext::Immediate => job(),
            ExecutionContext::Pool(pool) => pool.submit(job),
        }
    }
}

/// A fixed set of detached worker threads draining one FIFO job queue.
///
/// With a single worker the pool behaves as a serial queue: jobs run in
/// submission order, which is what preserves per-promise handler ordering.
/// Workers exit once the pool is dropped and the queue runs dry.
pub struct ThreadPool {
    sender: Sender<Job>,
}

impl ThreadPool {
    pub fn new(workers: usize) -> Arc<Self> {
        let (sender, receiver) = channel::<Job>();
        let receiver = Arc::new(Mutex::new(receiver));
        for i in 0..workers.max(1) {
            let receiver = Arc::clone(&receiver);
            thread::Builder::new()
                .name(format!("promise-worker-{i}"))
                .spawn(move || worker_loop(receiver))
                .expect("failed to spawn promise worker");
        }
        Arc::new(Self { sender })
    }

    /// One worker: a serial queue.
    pub fn serial() -> Arc<Self> {
        Self::new(1)
    }

    fn submit(&self, job: Job) {
        // The receiver only disconnects when every worker has exited, which
        // cannot happen while the pool itself is alive.
        let _ = self.sender.send(job);
    }
}

fn worker_loop(receiver: Arc<Mutex<Receiver<Job>>>) {
    loop {
        let job = match receiver.lock().unwrap().recv() {
            Ok(job) => job,
            Err(_) => break,
        };
        // A panicking handler must not take the worker down with it; the
        // panic unwinds the job's captured state and the queue keeps going.
        let _ = catch_unwind(AssertUnwindSafe(job));
    }
}
