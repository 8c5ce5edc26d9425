use std::{
    collections::HashMap,
    fmt,
    future::Future,
    panic::AssertUnwindSafe,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
};

use futures::FutureExt;
use serde::Serialize;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use super::{
    entry::{InFlight, Settled},
    CacheEntry, QueryFn, QueryKey, QueryOptions, QueryState, QueryStatus,
};
use crate::error::ApiError;

struct Inner<T> {
    name: &'static str,
    options: QueryOptions,
    entries: Mutex<HashMap<QueryKey, CacheEntry<T>>>,
    sequence: AtomicU64,
}

/// Keyed store of asynchronous fetch results for one value type.
///
/// Clones share the same entries. Fetches run as tokio tasks, so every
/// method that may start one must be called from inside a runtime.
pub struct QueryCache<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for QueryCache<T> {
    fn clone(&self) -> Self {
        QueryCache {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for QueryCache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryCache")
            .field("name", &self.inner.name)
            .field("options", &self.inner.options)
            .finish()
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub subscribers: usize,
    pub fetching: usize,
    pub errors: usize,
}

impl<T> QueryCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(name: &'static str, options: QueryOptions) -> Self {
        Self {
            inner: Arc::new(Inner {
                name,
                options,
                entries: Mutex::new(HashMap::new()),
                sequence: AtomicU64::new(0),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    pub fn options(&self) -> &QueryOptions {
        &self.inner.options
    }

    /// Subscribe to `key`.
    ///
    /// Missing or stale entries are fetched with `fetch` unless `enabled`
    /// is false; a fetch already running for the key is shared. The
    /// returned handle keeps the entry alive until dropped.
    pub fn use_query<F, Fut>(
        &self,
        key: QueryKey,
        fetch: F,
        enabled: bool,
    ) -> QueryHandle<T>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        let fetcher: QueryFn<T> = Arc::new(move || fetch().boxed());
        let now = Instant::now();

        let incarnation = {
            let mut entries = self.entries();
            let entry = self.entry_mut(&mut entries, &key, now);
            entry.attach();
            entry.fetcher = Some(fetcher.clone());

            if !enabled {
                debug!(cache = self.name(), key = %key, "query disabled");
            } else if entry.in_flight.is_some() {
                debug!(cache = self.name(), key = %key, "joining in-flight fetch");
            } else if entry.is_stale(now) {
                let _ = self.start_fetch(entry, &fetcher);
            } else {
                debug!(cache = self.name(), key = %key, "cache hit");
            }

            entry.incarnation
        };

        QueryHandle {
            cache: self.clone(),
            key,
            incarnation: AtomicU64::new(incarnation),
            fetcher,
            enabled,
        }
    }

    /// Fetch `key` if missing or stale without subscribing to it.
    pub async fn prefetch<F, Fut>(&self, key: QueryKey, fetch: F) -> QueryState<T>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        let fetcher: QueryFn<T> = Arc::new(move || fetch().boxed());
        let now = Instant::now();

        let settled = {
            let mut entries = self.entries();
            let entry = self.entry_mut(&mut entries, &key, now);
            entry.fetcher = Some(fetcher.clone());

            if entry.in_flight.is_some() || entry.is_stale(now) {
                Some(self.start_fetch(entry, &fetcher))
            } else {
                None
            }
        };

        if let Some(settled) = settled {
            settled.await;
        }

        self.get_state(&key).unwrap_or_else(|| empty_state(true))
    }

    pub fn get_query_data(&self, key: &QueryKey) -> Option<T> {
        let entries = self.entries();
        entries.get(key).and_then(|entry| entry.data.clone())
    }

    pub fn get_state(&self, key: &QueryKey) -> Option<QueryState<T>> {
        let entries = self.entries();
        entries.get(key).map(|entry| entry.snapshot(true))
    }

    /// Mark `key` stale; subscribed entries are refetched right away.
    pub fn invalidate(&self, key: &QueryKey) -> bool {
        let now = Instant::now();
        let mut entries = self.entries();

        let Some(entry) = entries.get_mut(key) else {
            return false;
        };

        entry.stale_at = Some(now);

        if entry.subscribers > 0 {
            if let Some(fetcher) = entry.fetcher.clone() {
                let _ = self.start_fetch(entry, &fetcher);
            }
        }

        true
    }

    /// Drop `key`; a fetch still running for it is discarded on arrival.
    pub fn remove(&self, key: &QueryKey) -> bool {
        self.entries().remove(key).is_some()
    }

    pub fn clear(&self) {
        let mut entries = self.entries();
        let count = entries.len();
        entries.clear();
        debug!(cache = self.name(), count, "cache cleared");
    }

    /// Evict entries that have had no subscribers for `gc_time`.
    pub fn collect_garbage(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries();
        let before = entries.len();

        entries.retain(|_, entry| !entry.is_expired(now));

        let evicted = before - entries.len();
        if evicted > 0 {
            info!(cache = self.name(), evicted, "evicted unused entries");
        }

        evicted
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self.entries();

        entries.values().fold(
            CacheStats {
                entries: entries.len(),
                ..CacheStats::default()
            },
            |mut stats, entry| {
                stats.subscribers += entry.subscribers;
                if entry.in_flight.is_some() {
                    stats.fetching += 1;
                }
                if entry.status == QueryStatus::Error {
                    stats.errors += 1;
                }
                stats
            },
        )
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<QueryKey, CacheEntry<T>>> {
        self.inner
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn next_id(&self) -> u64 {
        self.inner.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Entry for `key`, treating an expired one as absent.
    fn entry_mut<'a>(
        &self,
        entries: &'a mut HashMap<QueryKey, CacheEntry<T>>,
        key: &QueryKey,
        now: Instant,
    ) -> &'a mut CacheEntry<T> {
        if entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
            debug!(cache = self.name(), key = %key, "entry expired");
            entries.remove(key);
        }

        entries.entry(key.clone()).or_insert_with(|| {
            debug!(cache = self.name(), key = %key, "cache miss");
            CacheEntry::new(key.clone(), self.next_id())
        })
    }

    /// Start a fetch for `entry` unless one is already running.
    fn start_fetch(
        &self,
        entry: &mut CacheEntry<T>,
        fetcher: &QueryFn<T>,
    ) -> Settled {
        if let Some(in_flight) = &entry.in_flight {
            return in_flight.settled.clone();
        }

        let id = self.next_id();
        debug!(cache = self.name(), key = %entry.key, id, "fetching");

        let task = tokio::spawn(run_fetch(
            self.clone(),
            entry.key.clone(),
            entry.incarnation,
            id,
            fetcher.clone(),
        ));

        let name = self.name();
        let settled = async move {
            if let Err(e) = task.await {
                warn!(cache = name, "fetch task failed: {}", e);
            }
        }
        .boxed()
        .shared();

        entry.in_flight = Some(InFlight {
            id,
            settled: settled.clone(),
        });

        settled
    }

    fn record_failure(&self, key: &QueryKey, incarnation: u64) {
        let mut entries = self.entries();
        if let Some(entry) = entries.get_mut(key) {
            if entry.incarnation == incarnation {
                entry.failure_count += 1;
            }
        }
    }

    /// Apply a finished fetch, newest fetch id wins.
    fn settle(
        &self,
        key: &QueryKey,
        incarnation: u64,
        id: u64,
        outcome: Result<T, ApiError>,
    ) {
        let now = Instant::now();
        let options = &self.inner.options;
        let mut entries = self.entries();

        let Some(entry) = entries
            .get_mut(key)
            .filter(|entry| entry.incarnation == incarnation)
        else {
            debug!(cache = self.name(), key = %key, id, "entry gone, result dropped");
            return;
        };

        if entry.in_flight.as_ref().is_some_and(|f| f.id == id) {
            entry.in_flight = None;
        }

        if id <= entry.last_applied {
            debug!(cache = self.name(), key = %key, id, "older result dropped");
            return;
        }
        entry.last_applied = id;

        match outcome {
            Ok(value) => {
                entry.apply_success(value, now, options.stale_time);
            },
            Err(error) => {
                warn!(cache = self.name(), key = %key, "fetch failed: {}", error);
                entry.failure_count += 1;
                entry.apply_failure(error);
            },
        }

        if entry.subscribers == 0 {
            let floor = now + options.gc_time;
            if entry.expires_at.map_or(true, |at| at < floor) {
                entry.expires_at = Some(floor);
            }
        }
    }

    /// Only the entry the handle subscribed to loses a subscriber.
    fn detach(&self, key: &QueryKey, incarnation: u64) {
        let now = Instant::now();
        let mut entries = self.entries();
        if let Some(entry) = entries
            .get_mut(key)
            .filter(|entry| entry.incarnation == incarnation)
        {
            entry.detach(now, self.inner.options.gc_time);
        }
    }

    /// Entry for a live handle. If the one it subscribed to was removed,
    /// the handle subscribes to its replacement.
    fn handle_entry<'a>(
        &self,
        entries: &'a mut HashMap<QueryKey, CacheEntry<T>>,
        key: &QueryKey,
        incarnation: &AtomicU64,
        now: Instant,
    ) -> &'a mut CacheEntry<T> {
        let entry = self.entry_mut(entries, key, now);
        if entry.incarnation != incarnation.load(Ordering::SeqCst) {
            entry.attach();
            incarnation.store(entry.incarnation, Ordering::SeqCst);
        }
        entry
    }
}

async fn run_fetch<T>(
    cache: QueryCache<T>,
    key: QueryKey,
    incarnation: u64,
    id: u64,
    fetcher: QueryFn<T>,
) where
    T: Clone + Send + Sync + 'static,
{
    let outcome = AssertUnwindSafe(fetch_with_retry(
        &cache,
        &key,
        incarnation,
        &fetcher,
    ))
    .catch_unwind()
    .await
    .unwrap_or_else(|_| {
        warn!(cache = cache.name(), key = %key, id, "fetch panicked");
        Err(ApiError::Network("fetch panicked".to_string()))
    });

    cache.settle(&key, incarnation, id, outcome);
}

async fn fetch_with_retry<T>(
    cache: &QueryCache<T>,
    key: &QueryKey,
    incarnation: u64,
    fetcher: &QueryFn<T>,
) -> Result<T, ApiError>
where
    T: Clone + Send + Sync + 'static,
{
    let retry = cache.options().retry.clone();
    let mut attempt = 0;

    loop {
        match fetcher().await {
            Ok(value) => break Ok(value),
            Err(error) if retry.should_retry(attempt, &error) => {
                let delay = retry.delay(attempt);
                warn!(
                    cache = cache.name(),
                    key = %key,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    "fetch failed, retrying: {}",
                    error
                );
                cache.record_failure(key, incarnation);
                sleep(delay).await;
                attempt += 1;
            },
            Err(error) => break Err(error),
        }
    }
}

fn empty_state<T>(enabled: bool) -> QueryState<T> {
    QueryState {
        status: QueryStatus::Pending,
        data: None,
        error: None,
        is_fetching: false,
        failure_count: 0,
        fetched_at: None,
        enabled,
    }
}

/// A subscription to one key of a [`QueryCache`].
///
/// Dropping the handle detaches it; once an entry has no handles left its
/// garbage-collect window starts. A fetch that is still running keeps
/// going and its result stays in the cache.
pub struct QueryHandle<T>
where
    T: Clone + Send + Sync + 'static,
{
    cache: QueryCache<T>,
    key: QueryKey,
    incarnation: AtomicU64,
    fetcher: QueryFn<T>,
    enabled: bool,
}

impl<T> QueryHandle<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn state(&self) -> QueryState<T> {
        let entries = self.cache.entries();
        entries
            .get(&self.key)
            .map(|entry| entry.snapshot(self.enabled))
            .unwrap_or_else(|| empty_state(self.enabled))
    }

    /// Wait for the fetch running at call time, if any, then read the state.
    pub async fn wait(&self) -> QueryState<T> {
        let settled = {
            let entries = self.cache.entries();
            entries
                .get(&self.key)
                .and_then(|entry| entry.in_flight.as_ref())
                .map(|in_flight| in_flight.settled.clone())
        };

        if let Some(settled) = settled {
            settled.await;
        }

        self.state()
    }

    /// Fetch now regardless of freshness, joining a running fetch.
    pub async fn refetch(&self) -> QueryState<T> {
        let settled = {
            let mut entries = self.cache.entries();
            let entry = self.cache.handle_entry(
                &mut entries,
                &self.key,
                &self.incarnation,
                Instant::now(),
            );
            entry.fetcher = Some(self.fetcher.clone());
            self.cache.start_fetch(entry, &self.fetcher)
        };

        settled.await;
        self.state()
    }

    /// Enabling a disabled query fetches a missing or stale entry.
    pub fn set_enabled(&mut self, enabled: bool) {
        let was_enabled = self.enabled;
        self.enabled = enabled;

        if was_enabled || !enabled {
            return;
        }

        let now = Instant::now();
        let mut entries = self.cache.entries();
        let entry = self.cache.handle_entry(
            &mut entries,
            &self.key,
            &self.incarnation,
            now,
        );

        if entry.in_flight.is_none() && entry.is_stale(now) {
            let _ = self.cache.start_fetch(entry, &self.fetcher);
        }
    }
}

impl<T> Drop for QueryHandle<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn drop(&mut self) {
        self.cache
            .detach(&self.key, self.incarnation.load(Ordering::SeqCst));
    }
}

impl<T> fmt::Debug for QueryHandle<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryHandle")
            .field("cache", &self.cache.name())
            .field("key", &self.key)
            .field("enabled", &self.enabled)
            .finish()
    }
}
