//! Session-scoped query cache.
//!
//! The cache holds the last result of every query key, deduplicates
//! concurrent fetches of the same key, and tracks staleness and
//! invalidation. It is an explicit service: create one per session, share
//! it by cloning, and call [`QueryCache::clear`] when the session ends.
//!
//! Each fetch runs in its own task and is tagged with the key's generation
//! counter. Only the fetch holding the latest generation may write its
//! result, so a slow response can never overwrite a newer one.

use crate::config::{CacheConfig, QueryOptions};
use crate::error::{ErrorShape, QueryError};
use crate::key::CacheKey;
use crate::subscription::QuerySubscription;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::time::Instant;

/// Produces a fresh request for a key each time it is called.
pub type Fetcher = Arc<dyn Fn() -> BoxFuture<'static, Result<Value, QueryError>> + Send + Sync>;

type SharedFetch = Shared<BoxFuture<'static, Result<Value, QueryError>>>;

type Entries = Arc<Mutex<HashMap<CacheKey, CacheEntry>>>;

/// State of a query as seen by a reader.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult<T> {
    /// Last successfully fetched value. Kept when a later fetch fails.
    pub data: Option<T>,
    pub is_loading: bool,
    pub error: Option<ErrorShape>,
}

impl<T> QueryResult<T> {
    /// Nothing fetched and nothing in flight.
    pub fn idle() -> Self {
        Self {
            data: None,
            is_loading: false,
            error: None,
        }
    }

    pub fn failed(error: &QueryError) -> Self {
        Self {
            data: None,
            is_loading: false,
            error: Some(error.shape()),
        }
    }

    pub fn is_success(&self) -> bool {
        !self.is_loading && self.error.is_none() && self.data.is_some()
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Settled either way: not loading and holding data or an error.
    pub fn is_settled(&self) -> bool {
        !self.is_loading && (self.data.is_some() || self.error.is_some())
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> QueryResult<U> {
        QueryResult {
            data: self.data.map(f),
            is_loading: self.is_loading,
            error: self.error,
        }
    }

    /// Like [`map`](Self::map) for fallible conversions. A conversion
    /// failure clears `data` and is reported unless an error is already set.
    pub fn try_map<U>(
        self,
        f: impl FnOnce(T) -> Result<U, QueryError>,
    ) -> QueryResult<U> {
        let QueryResult {
            data,
            is_loading,
            error,
        } = self;
        match data.map(f).transpose() {
            Ok(data) => QueryResult {
                data,
                is_loading,
                error,
            },
            Err(err) => QueryResult {
                data: None,
                is_loading,
                error: error.or_else(|| Some(err.shape())),
            },
        }
    }
}

struct CacheEntry {
    data: Option<Value>,
    error: Option<QueryError>,
    updated_at: Option<Instant>,
    invalidated: bool,
    generation: u64,
    in_flight: Option<SharedFetch>,
    fetcher: Option<Fetcher>,
    stale_time: Duration,
    refetch_on_focus: bool,
    updates_tx: watch::Sender<QueryResult<Value>>,
}

impl CacheEntry {
    fn new(stale_time: Duration) -> Self {
        let (updates_tx, _) = watch::channel(QueryResult::idle());
        Self {
            data: None,
            error: None,
            updated_at: None,
            invalidated: false,
            generation: 0,
            in_flight: None,
            fetcher: None,
            stale_time,
            refetch_on_focus: true,
            updates_tx,
        }
    }

    fn snapshot(&self) -> QueryResult<Value> {
        QueryResult {
            data: self.data.clone(),
            is_loading: self.in_flight.is_some(),
            error: self.error.as_ref().map(QueryError::shape),
        }
    }

    fn is_fresh(&self, stale_time: Duration, now: Instant) -> bool {
        if self.invalidated || self.error.is_some() || self.data.is_none() {
            return false;
        }
        self.updated_at
            .is_some_and(|at| now.saturating_duration_since(at) < stale_time)
    }

    fn has_subscribers(&self) -> bool {
        self.updates_tx.receiver_count() > 0
    }

    fn is_idle(&self) -> bool {
        self.in_flight.is_none() && !self.has_subscribers()
    }

    fn publish(&self) {
        self.updates_tx.send_replace(self.snapshot());
    }
}

/// Shared, cheaply cloneable query cache.
#[derive(Clone)]
pub struct QueryCache {
    entries: Entries,
    config: CacheConfig,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    pub fn with_config(config: CacheConfig) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            config,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Reads `key`, fetching with `fetcher` when there is no fresh result.
    ///
    /// Concurrent reads of a key share one fetch. A disabled read returns
    /// the cached state without fetching.
    pub async fn fetch(
        &self,
        key: CacheKey,
        fetcher: Fetcher,
        options: QueryOptions,
    ) -> QueryResult<Value> {
        if !options.enabled {
            tracing::debug!(%key, "query disabled; returning cached state");
            return self.peek(&key).await.unwrap_or_else(QueryResult::idle);
        }

        let stale_time = options.stale_time.unwrap_or(self.config.stale_time);
        let pending = {
            let mut entries = self.entries.lock().await;
            if !entries.contains_key(&key) {
                self.make_room(&mut entries);
            }
            let entry = entries
                .entry(key.clone())
                .or_insert_with(|| CacheEntry::new(stale_time));
            entry.stale_time = stale_time;
            entry.refetch_on_focus = options.refetch_on_focus;
            entry.fetcher = Some(fetcher.clone());

            if let Some(pending) = &entry.in_flight {
                tracing::debug!(%key, "joining in-flight fetch");
                pending.clone()
            } else if entry.is_fresh(stale_time, Instant::now())
                || (!options.refetch_on_mount && !entry.invalidated && entry.data.is_some())
            {
                tracing::debug!(%key, "cache hit");
                return entry.snapshot();
            } else {
                tracing::debug!(%key, generation = entry.generation + 1, "cache miss; fetching");
                self.start_fetch(&key, entry, fetcher)
            }
        };

        self.await_settled(&key, pending).await
    }

    /// Fetches `key` even if a fetch is already in flight. The older fetch
    /// is superseded and its response discarded.
    pub async fn refetch(
        &self,
        key: CacheKey,
        fetcher: Fetcher,
        options: QueryOptions,
    ) -> QueryResult<Value> {
        if !options.enabled {
            return self.peek(&key).await.unwrap_or_else(QueryResult::idle);
        }

        let stale_time = options.stale_time.unwrap_or(self.config.stale_time);
        let pending = {
            let mut entries = self.entries.lock().await;
            if !entries.contains_key(&key) {
                self.make_room(&mut entries);
            }
            let entry = entries
                .entry(key.clone())
                .or_insert_with(|| CacheEntry::new(stale_time));
            entry.stale_time = stale_time;
            entry.refetch_on_focus = options.refetch_on_focus;
            entry.fetcher = Some(fetcher.clone());
            tracing::debug!(%key, generation = entry.generation + 1, "forced refetch");
            self.start_fetch(&key, entry, fetcher)
        };

        self.await_settled(&key, pending).await
    }

    /// Current state of `key` without fetching.
    pub async fn peek(&self, key: &CacheKey) -> Option<QueryResult<Value>> {
        self.entries.lock().await.get(key).map(CacheEntry::snapshot)
    }

    /// Subscribes to every state change of `key`. Dropping the subscription
    /// stops delivery; nothing is sent to a dropped subscriber.
    pub async fn subscribe(&self, key: CacheKey) -> QuerySubscription {
        let mut entries = self.entries.lock().await;
        if !entries.contains_key(&key) {
            self.make_room(&mut entries);
        }
        let entry = entries
            .entry(key.clone())
            .or_insert_with(|| CacheEntry::new(self.config.stale_time));
        let rx = entry.updates_tx.subscribe();
        QuerySubscription::new(key, rx)
    }

    /// Marks every entry of `resource` stale.
    ///
    /// Entries with a fetch in flight are refetched immediately so a
    /// response issued before the invalidation can never be applied.
    pub async fn invalidate_resource(&self, resource: &str) -> usize {
        let mut entries = self.entries.lock().await;
        let mut count = 0;
        for (key, entry) in entries.iter_mut() {
            if key.resource() != resource {
                continue;
            }
            self.invalidate_entry(key, entry);
            count += 1;
        }
        tracing::info!(resource, count, "invalidated cached queries");
        count
    }

    /// Marks a single key stale.
    pub async fn invalidate_key(&self, key: &CacheKey) -> bool {
        let mut entries = self.entries.lock().await;
        match entries.get_mut(key) {
            Some(entry) => {
                self.invalidate_entry(key, entry);
                true
            }
            None => false,
        }
    }

    /// Refetches stale entries that have live subscribers and opted into
    /// refetch on focus. Returns the number of fetches started.
    pub async fn focus(&self) -> usize {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        let mut started = 0;
        for (key, entry) in entries.iter_mut() {
            if !entry.refetch_on_focus || entry.in_flight.is_some() || !entry.has_subscribers() {
                continue;
            }
            if entry.is_fresh(entry.stale_time, now) {
                continue;
            }
            let Some(fetcher) = entry.fetcher.clone() else {
                continue;
            };
            let _ = self.start_fetch(key, entry, fetcher);
            started += 1;
        }
        tracing::debug!(started, "focus refetch");
        started
    }

    /// Drops every entry. In-flight fetches finish without writing.
    pub async fn clear(&self) {
        let mut entries = self.entries.lock().await;
        let count = entries.len();
        entries.clear();
        tracing::info!(count, "query cache cleared");
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    fn invalidate_entry(&self, key: &CacheKey, entry: &mut CacheEntry) {
        entry.invalidated = true;
        match (entry.in_flight.is_some(), entry.fetcher.clone()) {
            (true, Some(fetcher)) => {
                tracing::debug!(%key, "superseding in-flight fetch after invalidation");
                let _ = self.start_fetch(key, entry, fetcher);
            }
            _ => entry.publish(),
        }
    }

    fn start_fetch(&self, key: &CacheKey, entry: &mut CacheEntry, fetcher: Fetcher) -> SharedFetch {
        entry.generation += 1;
        let generation = entry.generation;

        let entries = Arc::clone(&self.entries);
        let task_key = key.clone();
        let task = tokio::spawn(async move {
            let outcome = fetcher().await;
            apply_outcome(&entries, &task_key, generation, outcome).await
        });

        let entries = Arc::clone(&self.entries);
        let join_key = key.clone();
        let pending = async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(err) => {
                    let failure = QueryError::Network(format!("fetch task failed: {}", err));
                    apply_outcome(&entries, &join_key, generation, Err(failure)).await
                }
            }
        }
        .boxed()
        .shared();

        entry.in_flight = Some(pending.clone());
        entry.publish();
        pending
    }

    async fn await_settled(&self, key: &CacheKey, mut pending: SharedFetch) -> QueryResult<Value> {
        loop {
            let outcome = pending.await;
            let entries = self.entries.lock().await;
            let Some(entry) = entries.get(key) else {
                return match outcome {
                    Ok(value) => QueryResult {
                        data: Some(value),
                        is_loading: false,
                        error: None,
                    },
                    Err(QueryError::Cancelled) => QueryResult::idle(),
                    Err(err) => QueryResult::failed(&err),
                };
            };

            match (outcome, &entry.in_flight) {
                (Err(QueryError::Cancelled), Some(next)) => {
                    pending = next.clone();
                }
                _ => {
                    return QueryResult {
                        is_loading: false,
                        ..entry.snapshot()
                    };
                }
            }
        }
    }

    /// Evicts idle entries, least recently updated first, until a new key fits.
    fn make_room(&self, entries: &mut HashMap<CacheKey, CacheEntry>) {
        let Some(max) = self.config.max_entries else {
            return;
        };
        while entries.len() >= max.max(1) {
            let oldest = entries
                .iter()
                .filter(|(_, entry)| entry.is_idle())
                .min_by_key(|(_, entry)| entry.updated_at)
                .map(|(key, _)| key.clone());
            match oldest {
                Some(key) => {
                    entries.remove(&key);
                    tracing::debug!(%key, "evicted idle cache entry");
                }
                None => break,
            }
        }
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}

async fn apply_outcome(
    entries: &Mutex<HashMap<CacheKey, CacheEntry>>,
    key: &CacheKey,
    generation: u64,
    outcome: Result<Value, QueryError>,
) -> Result<Value, QueryError> {
    let mut entries = entries.lock().await;
    let Some(entry) = entries.get_mut(key) else {
        tracing::debug!(%key, "entry gone before fetch settled; dropping response");
        return Err(QueryError::Cancelled);
    };
    if entry.generation != generation {
        tracing::debug!(
            %key,
            generation,
            latest = entry.generation,
            "discarding superseded response"
        );
        return Err(QueryError::Cancelled);
    }

    entry.in_flight = None;
    entry.updated_at = Some(Instant::now());
    match &outcome {
        Ok(value) => {
            entry.data = Some(value.clone());
            entry.error = None;
            entry.invalidated = false;
        }
        Err(err) => {
            tracing::warn!(%key, error = %err, "query fetch failed");
            entry.error = Some(err.clone());
        }
    }
    entry.publish();
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_STALE_TIME;
    use crate::filter::Filters;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_fetcher(calls: Arc<AtomicUsize>, value: Value) -> Fetcher {
        Arc::new(move || {
            let calls = Arc::clone(&calls);
            let value = value.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(value)
            }
            .boxed()
        })
    }

    fn failing_fetcher(status_code: u16) -> Fetcher {
        Arc::new(move || {
            async move {
                Err(QueryError::Http {
                    status_code,
                    message: "Internal Server Error".to_string(),
                })
            }
            .boxed()
        })
    }

    fn rooms_key() -> CacheKey {
        CacheKey::list("rooms", Filters::new().with("Active", true).normalize())
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_result_is_reused_until_stale() {
        let cache = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let fetcher = counting_fetcher(calls.clone(), json!([{"id": 1}]));
        let options = QueryOptions::new().stale_time(Duration::from_secs(30));

        let first = cache.fetch(rooms_key(), fetcher.clone(), options).await;
        assert!(first.is_success());
        assert_eq!(first.data, Some(json!([{"id": 1}])));

        tokio::time::advance(Duration::from_secs(10)).await;
        cache.fetch(rooms_key(), fetcher.clone(), options).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(30)).await;
        cache.fetch(rooms_key(), fetcher, options).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_stale_time_serves_sequential_reads() {
        let cache = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let fetcher = counting_fetcher(calls.clone(), json!([]));

        cache.fetch(rooms_key(), fetcher.clone(), QueryOptions::new()).await;
        let second = cache.fetch(rooms_key(), fetcher.clone(), QueryOptions::new()).await;
        assert!(second.is_success());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(DEFAULT_STALE_TIME).await;
        cache.fetch(rooms_key(), fetcher, QueryOptions::new()).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_zero_stale_time_refetches_every_read() {
        let cache = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let fetcher = counting_fetcher(calls.clone(), json!([]));
        let options = QueryOptions::new().stale_time(Duration::ZERO);

        cache.fetch(rooms_key(), fetcher.clone(), options).await;
        cache.fetch(rooms_key(), fetcher, options).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_refetch_on_mount_false_reuses_stale_entry() {
        let cache = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let fetcher = counting_fetcher(calls.clone(), json!([1]));
        let options = QueryOptions::new().stale_time(Duration::ZERO);

        cache.fetch(rooms_key(), fetcher.clone(), options).await;
        let again = cache
            .fetch(rooms_key(), fetcher, options.refetch_on_mount(false))
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(again.data, Some(json!([1])));
    }

    #[tokio::test]
    async fn test_disabled_read_never_fetches() {
        let cache = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let fetcher = counting_fetcher(calls.clone(), json!([]));

        let result = cache
            .fetch(rooms_key(), fetcher, QueryOptions::new().enabled(false))
            .await;

        assert_eq!(result, QueryResult::idle());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_failure_keeps_last_known_data() {
        let cache = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let options = QueryOptions::new().stale_time(Duration::ZERO);

        cache
            .fetch(rooms_key(), counting_fetcher(calls, json!([{"id": 1}])), options)
            .await;
        let failed = cache.fetch(rooms_key(), failing_fetcher(500), options).await;

        assert!(!failed.is_loading);
        assert_eq!(failed.data, Some(json!([{"id": 1}])));
        assert_eq!(failed.error.unwrap().status_code, Some(500));
    }

    #[tokio::test]
    async fn test_invalidate_marks_only_matching_resource() {
        let cache = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let fetcher = counting_fetcher(calls.clone(), json!([]));
        let options = QueryOptions::new().stale_time(Duration::from_secs(300));
        let rooms_detail = CacheKey::detail("rooms", &crate::FilterValue::Integer(4));
        let roles = CacheKey::list("roles", Filters::new().normalize());

        cache.fetch(rooms_key(), fetcher.clone(), options).await;
        cache.fetch(rooms_detail.clone(), fetcher.clone(), options).await;
        cache.fetch(roles.clone(), fetcher.clone(), options).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        assert_eq!(cache.invalidate_resource("rooms").await, 2);

        cache.fetch(roles, fetcher.clone(), options).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        cache.fetch(rooms_key(), fetcher.clone(), options).await;
        cache.fetch(rooms_detail, fetcher, options).await;
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_eviction_skips_subscribed_entries() {
        let cache = QueryCache::with_config(CacheConfig::default().with_max_entries(Some(2)));
        let calls = Arc::new(AtomicUsize::new(0));
        let fetcher = counting_fetcher(calls, json!([]));
        let watched = CacheKey::list("tasks", Filters::new().normalize());

        let _subscription = cache.subscribe(watched.clone()).await;
        for name in ["rooms", "roles", "councils"] {
            let key = CacheKey::list(name, Filters::new().normalize());
            cache.fetch(key, fetcher.clone(), QueryOptions::new()).await;
        }

        assert_eq!(cache.len().await, 2);
        assert!(cache.peek(&watched).await.is_some());
        assert!(cache
            .peek(&CacheKey::list("councils", Filters::new().normalize()))
            .await
            .is_some());
    }

    #[tokio::test]
    async fn test_clear_drops_everything() {
        let cache = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        cache
            .fetch(rooms_key(), counting_fetcher(calls, json!([])), QueryOptions::new())
            .await;

        cache.clear().await;
        assert!(cache.is_empty().await);
        assert!(cache.peek(&rooms_key()).await.is_none());
    }

    #[test]
    fn test_try_map_reports_conversion_failure() {
        let result: QueryResult<Value> = QueryResult {
            data: Some(json!({"id": 1})),
            is_loading: false,
            error: None,
        };

        let mapped = result.try_map(|v| crate::response::decode_list::<Value>(v));
        assert!(mapped.data.is_none());
        assert!(mapped.error.unwrap().message.contains("expected a list"));
    }
}
