//! Per-request memoization in front of the pipelines.
//!
//! Where the [`Scheduler`](crate::scheduler::Scheduler) deduplicates individual
//! jobs by their raw arguments, a [`RequestCache`] deduplicates whole logical
//! requests by a semantic key. One cached request may fan out into many
//! scheduler jobs.
//!
//! The cache is built from two functions: `key_of` derives the key (each
//! pipeline hashes its own normalized request) and `run` performs the work.
//! For a given key at most one computation is ever started; concurrent and
//! later callers share its result, success or failure. Entries are never
//! evicted, which is fine for one build over a bounded image set.

use crate::error::DeriveError;
use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::fmt;
use tracing::debug;

type KeyFn<Req> = Box<dyn Fn(&Req) -> Result<String, DeriveError> + Send + Sync>;
type RunFn<Req, Res> =
    Box<dyn Fn(Req) -> BoxFuture<'static, Result<Res, DeriveError>> + Send + Sync>;

pub struct RequestCache<Req, Res> {
    name: &'static str,
    key_of: KeyFn<Req>,
    run: RunFn<Req, Res>,
    entries: DashMap<String, Shared<BoxFuture<'static, Result<Res, DeriveError>>>>,
}

impl<Req, Res> RequestCache<Req, Res>
where
    Res: Clone + Send + Sync + 'static,
{
    pub fn new<K, R>(name: &'static str, key_of: K, run: R) -> Self
    where
        K: Fn(&Req) -> Result<String, DeriveError> + Send + Sync + 'static,
        R: Fn(Req) -> BoxFuture<'static, Result<Res, DeriveError>> + Send + Sync + 'static,
    {
        Self {
            name,
            key_of: Box::new(key_of),
            run: Box::new(run),
            entries: DashMap::new(),
        }
    }

    /// Run `request`, or join the computation already registered for its key.
    pub async fn process(&self, request: Req) -> Result<Res, DeriveError> {
        let key = (self.key_of)(&request)?;
        let shared = {
            let entry = self.entries.entry(key).or_insert_with(|| {
                debug!(cache = self.name, "request computed");
                (self.run)(request).shared()
            });
            entry.value().clone()
        };
        shared.await
    }

    /// Number of distinct requests seen.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<Req, Res> fmt::Debug for RequestCache<Req, Res> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestCache")
            .field("name", &self.name)
            .field("entries", &self.entries.len())
            .finish()
    }
}
