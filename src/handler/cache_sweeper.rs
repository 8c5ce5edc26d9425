//! Background query cache maintenance
//!
//! Evicts entries nobody has subscribed to for their garbage-collect window
//! and, when enabled, warms the first coin page on startup so the first
//! dashboard visit is served from cache.

use std::time::Duration;

use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::{
    configuration::{AppState, Config, State},
    error::Error,
    queries::MarketQueries,
};

/// Main background task for cache maintenance.
/// Runs indefinitely, sweeping every `CACHE_SWEEP_INTERVAL_IN_SEC`.
pub async fn cache_sweep_task(app_state: AppState<State>) -> Result<(), Error> {
    info!("Starting cache sweep background task");

    if app_state.config.prefetch_on_start {
        warm_up(&app_state.queries, &app_state.config).await;
    }

    let period = Duration::from_secs(app_state.config.cache_sweep_interval.max(1));
    let mut sweep_interval = interval(period);

    loop {
        sweep_interval.tick().await;
        sweep(&app_state.queries);
    }
}

pub fn sweep(queries: &MarketQueries) -> usize {
    let evicted = queries.collect_garbage();
    let stats = queries.stats();

    debug!(
        "Cache sweep evicted {} entries, {} coin pages, {} coins, {} coin details, {} charts, {} searches left",
        evicted,
        stats.coins.entries,
        stats.coin.entries,
        stats.coin_details.entries,
        stats.coin_chart.entries,
        stats.search_coins.entries
    );

    evicted
}

/// Prefetch the default first coin page.
pub async fn warm_up(queries: &MarketQueries, config: &Config) -> bool {
    info!("Prefetching first coin page...");

    let state = queries
        .prefetch_coins(1, config.default_page_size, &config.default_currency)
        .await;

    match state.error {
        Some(e) => {
            warn!("Initial coin page prefetch failed: {}", e);
            false
        },
        None => {
            info!(
                "Initial coin page prefetch complete: {} coins",
                state.data.map(|coins| coins.len()).unwrap_or_default()
            );
            true
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::HTTP;
    use mockito::{Matcher, Server};
    use serde_json::json;

    #[tokio::test]
    async fn test_warm_up_populates_first_page() {
        let mut server = Server::new_async().await;
        let config = Config::with_api_url(&server.url());
        let queries = MarketQueries::new(HTTP::new(config.clone()).unwrap());

        let mock = server
            .mock("GET", "/coins/markets")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("page".into(), "1".into()),
                Matcher::UrlEncoded("per_page".into(), "20".into()),
                Matcher::UrlEncoded("vs_currency".into(), "brl".into()),
            ]))
            .with_status(200)
            .with_body(json!([{ "id": "bitcoin" }]).to_string())
            .create_async()
            .await;

        assert!(warm_up(&queries, &config).await);
        assert_eq!(queries.stats().coins.entries, 1);
        assert_eq!(queries.stats().coins.subscribers, 0);
        assert_eq!(sweep(&queries), 0);
        mock.assert_async().await;
    }
}
