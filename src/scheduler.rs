//! Bounded-concurrency task scheduler with per-call memoization.
//!
//! Every piece of blocking work the pipelines do (directory creation,
//! metadata reads, file digests, resizes) is submitted here as a job
//! identified by an [`Operation`] plus a canonical JSON rendering of its
//! arguments.
//!
//! # Execution
//!
//! Jobs run on a dedicated rayon pool of `C` threads. They are submitted with
//! `spawn_fifo`, so when all workers are busy, waiting jobs start in the order
//! they were enqueued. The result comes back over a oneshot channel and is
//! wrapped in a [`Shared`] future.
//!
//! # Memoization
//!
//! The map from job key to shared future uses `DashMap::entry`, so the first
//! caller for a key atomically inserts and spawns; every later caller, while
//! the job is in flight or after it finished, receives a clone of the same
//! future. A job therefore executes at most once per scheduler lifetime.
//!
//! Failures are memoized too. A failed key stays failed until the process
//! exits; callers that need a retry must issue a distinguishable job.

use crate::error::DeriveError;
use dashmap::DashMap;
use futures::channel::oneshot;
use futures::future::{BoxFuture, FutureExt, Shared};
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::Serialize;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, error};

/// Caller-declared identity of a job kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Operation {
    EnsureDir,
    ReadMetadata,
    FileDigest,
    Resize,
    ResizeToBuffer,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::EnsureDir => "ensure_dir",
            Operation::ReadMetadata => "read_metadata",
            Operation::FileDigest => "file_digest",
            Operation::Resize => "resize",
            Operation::ResizeToBuffer => "resize_to_buffer",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A memoized job result, shared by every caller of the same key.
pub type JobFuture<T> = Shared<BoxFuture<'static, Result<T, DeriveError>>>;

pub struct Scheduler {
    pool: ThreadPool,
    concurrency: usize,
    // Values are `JobFuture<T>` for the `T` the key was first enqueued with.
    jobs: DashMap<String, Arc<dyn Any + Send + Sync>>,
    started: AtomicUsize,
}

impl Scheduler {
    /// Build a scheduler running at most `concurrency` jobs at once.
    pub fn new(concurrency: usize) -> Result<Self, DeriveError> {
        let concurrency = concurrency.max(1);
        let pool = ThreadPoolBuilder::new()
            .num_threads(concurrency)
            .thread_name(|i| format!("srcset-worker-{i}"))
            .panic_handler(|_| error!("scheduler job panicked"))
            .build()
            .map_err(|e| DeriveError::Scheduler(e.to_string()))?;
        Ok(Self {
            pool,
            concurrency,
            jobs: DashMap::new(),
            started: AtomicUsize::new(0),
        })
    }

    /// Build a scheduler sized to the host's available parallelism.
    pub fn with_available_parallelism() -> Result<Self, DeriveError> {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self::new(cores)
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Number of distinct jobs that have been started.
    pub fn jobs_started(&self) -> usize {
        self.started.load(Ordering::Relaxed)
    }

    /// Memo key: operation identity plus canonical JSON of the arguments.
    ///
    /// Arguments go through `serde_json::Value`, whose objects are ordered by
    /// key, so the rendering is structural and deterministic.
    pub fn job_key<A>(op: Operation, args: &A) -> Result<String, DeriveError>
    where
        A: Serialize + ?Sized,
    {
        let canonical = serde_json::to_value(args)?;
        Ok(format!("{op}:{canonical}"))
    }

    /// Enqueue `job` under `(op, args)`, or join the existing job for that key.
    ///
    /// Key derivation failures are reported synchronously, before anything is
    /// scheduled. The returned future resolves to the job's (possibly cached)
    /// result.
    pub fn enqueue<A, T, F>(
        &self,
        op: Operation,
        args: &A,
        job: F,
    ) -> Result<JobFuture<T>, DeriveError>
    where
        A: Serialize + ?Sized,
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Result<T, DeriveError> + Send + 'static,
    {
        let key = Self::job_key(op, args)?;
        let stored = {
            let entry = self.jobs.entry(key).or_insert_with(|| {
                self.started.fetch_add(1, Ordering::Relaxed);
                let job: Arc<dyn Any + Send + Sync> = Arc::new(self.spawn(op, job));
                job
            });
            Arc::clone(entry.value())
        };
        stored
            .downcast_ref::<JobFuture<T>>()
            .cloned()
            .ok_or(DeriveError::JobTypeMismatch(op))
    }

    fn spawn<T, F>(&self, op: Operation, job: F) -> JobFuture<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Result<T, DeriveError> + Send + 'static,
    {
        debug!(operation = %op, "job queued");
        let (tx, rx) = oneshot::channel();
        self.pool.spawn_fifo(move || {
            // The receiver is gone only if every waiter dropped its future.
            let _ = tx.send(job());
        });
        async move {
            match rx.await {
                Ok(result) => result,
                Err(_) => Err(DeriveError::JobAborted(op)),
            }
        }
        .boxed()
        .shared()
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("concurrency", &self.concurrency)
            .field("jobs", &self.jobs.len())
            .finish()
    }
}
