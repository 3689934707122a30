//! Fixed-size worker pool.
//!
//! Workers share a single FIFO queue guarded by a mutex and a wake condition.
//! Each submission gets a one-shot result channel; the returned [`TaskHandle`]
//! blocks until the work has run and yields its result or failure.
//!
//! Shutdown marks the pool as stopping, drops every queued item that has not
//! been handed to a worker yet, wakes all workers and joins them. Items already
//! running always finish. Handles of dropped items resolve to
//! [`Error::PoolStopped`].

use crate::error::{Error, Result};
use crossbeam_channel::{Receiver, bounded};
use std::any::Any;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use tracing::debug;

type Job = Box<dyn FnOnce() + Send + 'static>;

#[derive(Default)]
struct Queue {
    jobs: VecDeque<Job>,
    stopping: bool,
}

#[derive(Default)]
struct Shared {
    queue: Mutex<Queue>,
    wake: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Queue> {
        // Jobs run outside the lock and panics are caught, so a poisoned
        // queue still holds consistent state.
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Resolve a requested worker count: `0` means the detected hardware parallelism.
pub fn resolve_worker_count(requested: usize) -> usize {
    if requested == 0 {
        num_cpus::get().max(1)
    } else {
        requested
    }
}

/// A fixed pool of long-lived worker threads.
pub struct TaskPool {
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    worker_count: usize,
}

impl TaskPool {
    /// Spawn a pool with `requested` workers (`0` = hardware parallelism).
    pub fn new(requested: usize) -> Result<Self> {
        let worker_count = resolve_worker_count(requested);
        let shared = Arc::new(Shared::default());

        let mut workers = Vec::with_capacity(worker_count);
        for index in 0..worker_count {
            let shared = Arc::clone(&shared);
            let handle = thread::Builder::new()
                .name(format!("kompakt-worker-{}", index))
                .spawn(move || worker_loop(&shared))?;
            workers.push(handle);
        }

        debug!(workers = worker_count, "task pool started");

        Ok(Self {
            shared,
            workers: Mutex::new(workers),
            worker_count,
        })
    }

    /// Number of worker threads.
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Queue a unit of work.
    ///
    /// Fails with [`Error::PoolStopped`] once shutdown has begun.
    pub fn submit<F, T>(&self, work: F) -> Result<TaskHandle<T>>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (sender, receiver) = bounded(1);
        let job: Job = Box::new(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(work))
                .unwrap_or_else(|payload| Err(Error::task_panicked(panic_message(&*payload))));
            // The submitter may have dropped its handle; nobody to tell.
            let _ = sender.send(outcome);
        });

        {
            let mut queue = self.shared.lock();
            if queue.stopping {
                return Err(Error::PoolStopped);
            }
            queue.jobs.push_back(job);
        }
        self.shared.wake.notify_one();

        Ok(TaskHandle { receiver })
    }

    /// Stop the pool: drop unstarted work, let running work finish, join workers.
    ///
    /// Calling this more than once is harmless.
    pub fn shutdown(&self) {
        let dropped = {
            let mut queue = self.shared.lock();
            queue.stopping = true;
            std::mem::take(&mut queue.jobs)
        };
        if !dropped.is_empty() {
            debug!(dropped = dropped.len(), "task pool dropping queued work");
        }
        // Dropping the jobs drops their result senders.
        drop(dropped);

        self.shared.wake.notify_all();

        let workers = std::mem::take(
            &mut *self
                .workers
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for worker in workers {
            // Task panics are caught inside the job, so a worker never panics.
            let _ = worker.join();
        }
    }
}

impl Drop for TaskPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for TaskPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskPool")
            .field("worker_count", &self.worker_count)
            .finish()
    }
}

fn worker_loop(shared: &Shared) {
    loop {
        let job = {
            let guard = shared.lock();
            let mut queue = shared
                .wake
                .wait_while(guard, |queue| !queue.stopping && queue.jobs.is_empty())
                .unwrap_or_else(PoisonError::into_inner);

            match queue.jobs.pop_front() {
                Some(job) => job,
                // Stopping and nothing left to run.
                None => return,
            }
        };

        job();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Awaitable result of one submitted unit of work.
#[derive(Debug)]
pub struct TaskHandle<T> {
    receiver: Receiver<Result<T>>,
}

impl<T> TaskHandle<T> {
    /// Block until the work has run and return its result.
    ///
    /// Returns [`Error::PoolStopped`] if the pool shut down before the work
    /// was picked up.
    pub fn wait(self) -> Result<T> {
        self.receiver.recv().unwrap_or(Err(Error::PoolStopped))
    }
}

/// Await handles in submission order, stopping at the first failure.
pub fn wait_in_order<T>(handles: Vec<TaskHandle<T>>) -> Result<Vec<T>> {
    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        results.push(handle.wait()?);
    }
    Ok(results)
}
