//! Keyed query cache
//!
//! Stale-while-revalidate store of asynchronous fetch results with
//! per-key single-flight, retry with exponential backoff and garbage
//! collection of entries nobody subscribes to.

pub use self::{
    cache::{CacheStats, QueryCache, QueryHandle},
    entry::{CacheEntry, QueryFn, QueryState, QueryStatus},
    key::{KeyPart, QueryKey},
    options::{QueryOptions, RetryMode, RetryPolicy},
};

mod cache;
mod entry;
mod key;
mod options;
