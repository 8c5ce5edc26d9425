use std::{fmt, sync::Arc, time::Duration};

use futures::future::{BoxFuture, Shared};
use serde::Serialize;
use tokio::time::Instant;

use super::QueryKey;
use crate::error::ApiError;

/// Fetch function registered for a key.
pub type QueryFn<T> =
    Arc<dyn Fn() -> BoxFuture<'static, Result<T, ApiError>> + Send + Sync>;

/// Resolves when the in-flight fetch for an entry has settled.
pub(crate) type Settled = Shared<BoxFuture<'static, ()>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryStatus {
    Pending,
    Success,
    Error,
}

pub(crate) struct InFlight {
    pub id: u64,
    pub settled: Settled,
}

/// One keyed slot of a query cache.
pub struct CacheEntry<T> {
    pub(crate) key: QueryKey,
    pub(crate) incarnation: u64,
    pub(crate) status: QueryStatus,
    pub(crate) data: Option<T>,
    pub(crate) error: Option<ApiError>,
    pub(crate) failure_count: u32,
    pub(crate) fetched_at: Option<Instant>,
    pub(crate) stale_at: Option<Instant>,
    pub(crate) expires_at: Option<Instant>,
    pub(crate) subscribers: usize,
    pub(crate) last_applied: u64,
    pub(crate) in_flight: Option<InFlight>,
    pub(crate) fetcher: Option<QueryFn<T>>,
}

impl<T: Clone> CacheEntry<T> {
    pub(crate) fn new(key: QueryKey, incarnation: u64) -> Self {
        Self {
            key,
            incarnation,
            status: QueryStatus::Pending,
            data: None,
            error: None,
            failure_count: 0,
            fetched_at: None,
            stale_at: None,
            expires_at: None,
            subscribers: 0,
            last_applied: 0,
            in_flight: None,
            fetcher: None,
        }
    }

    /// Never fetched, or past its staleness window.
    pub(crate) fn is_stale(&self, now: Instant) -> bool {
        self.stale_at.map_or(true, |stale_at| now >= stale_at)
    }

    pub(crate) fn is_expired(&self, now: Instant) -> bool {
        self.subscribers == 0
            && self.in_flight.is_none()
            && self.expires_at.is_some_and(|expires_at| now >= expires_at)
    }

    pub(crate) fn attach(&mut self) {
        self.subscribers += 1;
        self.expires_at = None;
    }

    pub(crate) fn detach(&mut self, now: Instant, gc_time: Duration) {
        self.subscribers = self.subscribers.saturating_sub(1);
        if self.subscribers == 0 {
            self.expires_at = Some(now + gc_time);
        }
    }

    pub(crate) fn apply_success(
        &mut self,
        value: T,
        now: Instant,
        stale_time: Duration,
    ) {
        self.status = QueryStatus::Success;
        self.data = Some(value);
        self.error = None;
        self.failure_count = 0;
        self.fetched_at = Some(now);
        self.stale_at = Some(now + stale_time);
    }

    /// Keeps the previous value, if any, next to the error.
    pub(crate) fn apply_failure(&mut self, error: ApiError) {
        self.status = QueryStatus::Error;
        self.error = Some(error);
    }

    pub(crate) fn snapshot(&self, enabled: bool) -> QueryState<T> {
        QueryState {
            status: self.status,
            data: self.data.clone(),
            error: self.error.clone(),
            is_fetching: self.in_flight.is_some(),
            failure_count: self.failure_count,
            fetched_at: self.fetched_at,
            enabled,
        }
    }
}

impl<T> fmt::Debug for CacheEntry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEntry")
            .field("key", &self.key)
            .field("status", &self.status)
            .field("has_data", &self.data.is_some())
            .field("error", &self.error)
            .field("subscribers", &self.subscribers)
            .field("fetching", &self.in_flight.is_some())
            .finish()
    }
}

/// Point-in-time view of an entry as seen by one subscriber.
#[derive(Debug, Clone)]
pub struct QueryState<T> {
    pub status: QueryStatus,
    pub data: Option<T>,
    pub error: Option<ApiError>,
    pub is_fetching: bool,
    pub failure_count: u32,
    pub fetched_at: Option<Instant>,
    pub enabled: bool,
}

impl<T> QueryState<T> {
    /// First load: nothing to show yet and a fetch is running.
    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Pending && self.is_fetching
    }

    pub fn is_success(&self) -> bool {
        self.status == QueryStatus::Success
    }

    pub fn is_error(&self) -> bool {
        self.status == QueryStatus::Error
    }

    /// Failure with nothing cached to fall back on.
    pub fn is_hard_error(&self) -> bool {
        self.is_error() && self.data.is_none()
    }
}
