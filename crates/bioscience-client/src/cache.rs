//! Request cache keyed by request fingerprint.
//!
//! Structure:
//! - one `CacheEntry` per fingerprint (SHA-256 of operation + canonical params)
//! - an entry holds the last good value, when it was fetched, the last error
//!   and the shared future of any request currently in flight
//!
//! Rules:
//! - a value younger than the policy's stale time is served without a request
//! - concurrent reads of one key share a single in-flight request
//! - fetches run on spawned tasks, so a caller going away never aborts the
//!   request; the result still lands in the cache
//! - errors never displace the last good value
//! - entries live in an `LruCache`; past `max_entries`, idle entries are
//!   evicted from the least recently used end until the cache is back under
//!   its limit (entries with a request in flight are never evicted)

use futures_util::future::{BoxFuture, FutureExt, Shared};
use lru::LruCache;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use bioscience_common::error::ApiError;

use crate::retry::{with_retry, RetryPolicy};

pub const DEFAULT_MAX_ENTRIES: usize = 256;

/// Operation name plus parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryKey {
    pub operation: String,
    pub params: serde_json::Value,
}

impl QueryKey {
    pub fn new(operation: impl Into<String>) -> Self {
        Self { operation: operation.into(), params: serde_json::Value::Null }
    }

    /// Fails when `params` cannot be represented as JSON, so two parameter
    /// sets never collapse onto one entry.
    pub fn with_params<P: Serialize>(operation: impl Into<String>, params: &P) -> Result<Self, ApiError> {
        Ok(Self {
            operation: operation.into(),
            params: serde_json::to_value(params)?,
        })
    }

    /// Stable hex digest of the key. Object keys are ordered by serde_json's
    /// map, so equal params always hash alike.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.operation.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.params.to_string().as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

/// Freshness, retry and polling rules for one read operation.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPolicy {
    pub stale_time: Duration,
    pub retry: RetryPolicy,
    pub refetch_interval: Option<Duration>,
}

impl QueryPolicy {
    pub fn health() -> Self {
        Self {
            stale_time: Duration::ZERO,
            retry: RetryPolicy::with_retries(3).retry_all_errors(),
            refetch_interval: Some(Duration::from_secs(30)),
        }
    }

    pub fn publications() -> Self {
        Self {
            stale_time: Duration::from_secs(5 * 60),
            retry: RetryPolicy::none(),
            refetch_interval: None,
        }
    }

    pub fn publication() -> Self {
        Self::publications()
    }

    pub fn publication_stats() -> Self {
        Self {
            stale_time: Duration::from_secs(10 * 60),
            ..Self::publications()
        }
    }
}

type SharedFetch = Shared<BoxFuture<'static, Result<serde_json::Value, ApiError>>>;

struct InFlight {
    id: u64,
    future: SharedFetch,
}

struct CacheEntry {
    key: QueryKey,
    value: Option<serde_json::Value>,
    fetched_at: Option<Instant>,
    error: Option<ApiError>,
    in_flight: Option<InFlight>,
    invalidated: bool,
}

impl CacheEntry {
    fn new(key: QueryKey) -> Self {
        Self {
            key,
            value: None,
            fetched_at: None,
            error: None,
            in_flight: None,
            invalidated: false,
        }
    }

    fn fresh_value(&self, stale_time: Duration, now: Instant) -> Option<&serde_json::Value> {
        if self.invalidated {
            return None;
        }
        match (self.value.as_ref(), self.fetched_at) {
            (Some(v), Some(at)) if now.duration_since(at) < stale_time => Some(v),
            _ => None,
        }
    }
}

struct Inner {
    // Unbounded: in-flight entries may push past `max_entries` until they settle.
    entries: LruCache<String, CacheEntry>,
    max_entries: usize,
    next_fetch_id: u64,
}

impl Inner {
    /// Makes room for one new entry by evicting idle entries, least recently
    /// used first.
    fn make_room(&mut self) {
        while self.entries.len() >= self.max_entries {
            let idle = self
                .entries
                .iter()
                .rev()
                .find(|(_, e)| e.in_flight.is_none())
                .map(|(fp, _)| fp.clone());
            let Some(fp) = idle else { break };
            if let Some(evicted) = self.entries.pop(&fp) {
                debug!(operation = %evicted.key.operation, "Evicted least recently used cache entry");
            }
        }
    }
}

/// Snapshot of one entry, for display and tests.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryStatus {
    pub has_value: bool,
    pub age: Option<Duration>,
    pub error: Option<ApiError>,
    pub fetching: bool,
    pub invalidated: bool,
}

#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<Mutex<Inner>>,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

impl QueryCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                entries: LruCache::unbounded(),
                max_entries: max_entries.max(1),
                next_fetch_id: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns the cached value when fresh, otherwise joins or starts a fetch.
    pub async fn fetch<T, F, Fut>(&self, key: QueryKey, policy: &QueryPolicy, fetcher: F) -> Result<T, ApiError>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        let fingerprint = key.fingerprint();

        let pending = {
            let mut inner = self.lock();
            let now = Instant::now();

            let existing = match inner.entries.get_mut(&fingerprint) {
                Some(entry) => {
                    if let Some(v) = entry.fresh_value(policy.stale_time, now) {
                        debug!(operation = %key.operation, "Cache hit");
                        return Ok(serde_json::from_value(v.clone())?);
                    }
                    entry.in_flight.as_ref().map(|f| f.future.clone())
                }
                None => None,
            };

            match existing {
                Some(future) => {
                    debug!(operation = %key.operation, "Joining in-flight request");
                    future
                }
                None => {
                    inner.next_fetch_id += 1;
                    let id = inner.next_fetch_id;
                    let future = self.spawn_fetch(fingerprint.clone(), id, policy.retry.clone(), fetcher);

                    if !inner.entries.contains(&fingerprint) {
                        inner.make_room();
                        inner.entries.put(fingerprint.clone(), CacheEntry::new(key.clone()));
                    }
                    if let Some(entry) = inner.entries.get_mut(&fingerprint) {
                        entry.in_flight = Some(InFlight { id, future: future.clone() });
                    }
                    debug!(operation = %key.operation, "Cache miss, fetching");
                    future
                }
            }
        };

        let value = pending.await?;
        Ok(serde_json::from_value(value)?)
    }

    fn spawn_fetch<T, F, Fut>(&self, fingerprint: String, id: u64, retry: RetryPolicy, fetcher: F) -> SharedFetch
    where
        T: Serialize + Send + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        let cache = self.clone();
        let handle = tokio::spawn(async move {
            let result = with_retry(&retry, &fetcher)
                .await
                .and_then(|v| serde_json::to_value(v).map_err(ApiError::from));
            cache.complete(&fingerprint, id, &result);
            result
        });

        async move {
            handle
                .await
                .unwrap_or_else(|e| Err(ApiError::Transport(format!("Fetch task failed: {}", e))))
        }
        .boxed()
        .shared()
    }

    fn complete(&self, fingerprint: &str, id: u64, result: &Result<serde_json::Value, ApiError>) {
        let mut inner = self.lock();
        let Some(entry) = inner.entries.peek_mut(fingerprint) else {
            debug!("Discarding result for a removed cache entry");
            return;
        };
        if entry.in_flight.as_ref().map(|f| f.id) != Some(id) {
            debug!(operation = %entry.key.operation, "Discarding superseded result");
            return;
        }
        entry.in_flight = None;
        match result {
            Ok(value) => {
                entry.value = Some(value.clone());
                entry.fetched_at = Some(Instant::now());
                entry.error = None;
                entry.invalidated = false;
            }
            Err(e) => {
                warn!(operation = %entry.key.operation, error = %e, "Query failed");
                entry.error = Some(e.clone());
            }
        }
    }

    /// Last good value regardless of age.
    pub fn peek<T: DeserializeOwned>(&self, key: &QueryKey) -> Option<T> {
        let inner = self.lock();
        inner
            .entries
            .peek(&key.fingerprint())
            .and_then(|e| e.value.clone())
            .and_then(|v| serde_json::from_value(v).ok())
    }

    pub fn status(&self, key: &QueryKey) -> Option<EntryStatus> {
        let inner = self.lock();
        let now = Instant::now();
        inner.entries.peek(&key.fingerprint()).map(|e| EntryStatus {
            has_value: e.value.is_some(),
            age: e.fetched_at.map(|at| now.duration_since(at)),
            error: e.error.clone(),
            fetching: e.in_flight.is_some(),
            invalidated: e.invalidated,
        })
    }

    /// Marks every entry of `operation` stale. Returns how many were marked.
    pub fn invalidate(&self, operation: &str) -> usize {
        let mut inner = self.lock();
        let mut n = 0;
        for (_, entry) in inner.entries.iter_mut().filter(|(_, e)| e.key.operation == operation) {
            entry.invalidated = true;
            n += 1;
        }
        debug!(operation, invalidated = n, "Invalidated queries");
        n
    }

    pub fn remove(&self, key: &QueryKey) -> bool {
        self.lock().entries.pop(&key.fingerprint()).is_some()
    }

    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }
}
