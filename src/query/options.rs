//! Query cache timing and retry configuration
//!
//! Presets per data kind:
//! - Coin list, coin details, charts: 5 min fresh, kept 10 min unobserved
//! - Search results: 2 min fresh, kept 5 min unobserved
//! - Default: 1 min fresh, kept 5 min unobserved

use std::time::Duration;

use crate::error::ApiError;

/// Which failures are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryMode {
    /// Every failure except local validation.
    All,
    /// Network failures, 5xx and 429 only.
    TransientOnly,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub mode: RetryMode,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(30_000),
            mode: RetryMode::All,
        }
    }

    pub fn transient_only(mut self) -> Self {
        self.mode = RetryMode::TransientOnly;
        self
    }

    /// Delay before retry number `attempt` (0-based):
    /// `min(base * 2^attempt, max)`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    pub fn should_retry(&self, attempt: u32, error: &ApiError) -> bool {
        if attempt >= self.max_retries {
            return false;
        }

        match (self.mode, error) {
            (_, ApiError::Validation(_)) => false,
            (RetryMode::All, _) => true,
            (RetryMode::TransientOnly, error) => error.is_transient(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOptions {
    /// How long after a successful fetch the value is served without
    /// revalidation.
    pub stale_time: Duration,

    /// How long an entry without subscribers survives.
    pub gc_time: Duration,

    pub retry: RetryPolicy,
}

impl QueryOptions {
    /// Paginated coin list (changes with the market, paging is cheap)
    pub fn coin_list() -> Self {
        Self {
            stale_time: Duration::from_secs(5 * 60),
            gc_time: Duration::from_secs(10 * 60),
            retry: RetryPolicy::new(2),
        }
    }

    /// Single coin record
    pub fn coin_details() -> Self {
        Self::coin_list()
    }

    /// Daily market chart
    pub fn market_chart() -> Self {
        Self::coin_list()
    }

    /// Free-text search (short-lived, typed interactively)
    pub fn search() -> Self {
        Self {
            stale_time: Duration::from_secs(2 * 60),
            gc_time: Duration::from_secs(5 * 60),
            retry: RetryPolicy::new(1),
        }
    }

    pub fn custom(stale_secs: u64, gc_secs: u64, max_retries: u32) -> Self {
        Self {
            stale_time: Duration::from_secs(stale_secs),
            gc_time: Duration::from_secs(gc_secs),
            retry: RetryPolicy::new(max_retries),
        }
    }
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            stale_time: Duration::from_secs(60),
            gc_time: Duration::from_secs(5 * 60),
            retry: RetryPolicy::new(3),
        }
    }
}
