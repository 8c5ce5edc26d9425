//! Query facade for the dashboard
//!
//! One [`QueryCache`] per record type, keyed the way the dashboard keys
//! its requests. Controllers, the command line and the cache sweeper all go
//! through [`MarketQueries`] so they share entries.

use std::sync::Arc;

use serde::Serialize;

use crate::{
    cache_keys::{COIN, COINS, COIN_CHART, COIN_DETAILS, SEARCH_COINS},
    model::{CoinDetail, CoinSummary, MarketChartSeries, SearchResult},
    provider::{is_searchable, HTTP},
    query::{CacheStats, QueryCache, QueryHandle, QueryKey, QueryOptions, QueryState},
};

pub fn coins_key(page: u32, per_page: u32, currency: &str) -> QueryKey {
    QueryKey::new(COINS)
        .with(page)
        .with(per_page)
        .with(currency.to_lowercase())
}

/// Currency a bare coin lookup is priced in.
pub const COIN_CURRENCY: &str = "usd";

pub fn coin_key(id: &str) -> QueryKey {
    QueryKey::new(COIN).with(id)
}

pub fn coin_details_key(id: &str, currency: &str) -> QueryKey {
    QueryKey::new(COIN_DETAILS)
        .with(id)
        .with(currency.to_lowercase())
}

pub fn coin_chart_key(id: &str, currency: &str, days: u32) -> QueryKey {
    QueryKey::new(COIN_CHART)
        .with(id)
        .with(currency.to_lowercase())
        .with(days)
}

pub fn search_coins_key(query: &str) -> QueryKey {
    QueryKey::new(SEARCH_COINS).with(query.trim())
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct QueriesStats {
    pub coins: CacheStats,
    pub coin: CacheStats,
    pub coin_details: CacheStats,
    pub coin_chart: CacheStats,
    pub search_coins: CacheStats,
}

#[derive(Debug, Clone)]
pub struct MarketQueries {
    http: Arc<HTTP>,
    coin_list: QueryCache<Vec<CoinSummary>>,
    coin: QueryCache<CoinSummary>,
    coin_detail: QueryCache<CoinDetail>,
    chart: QueryCache<MarketChartSeries>,
    search: QueryCache<SearchResult>,
}

impl MarketQueries {
    pub fn new(http: HTTP) -> Self {
        MarketQueries {
            http: Arc::new(http),
            coin_list: QueryCache::new(COINS, QueryOptions::coin_list()),
            coin: QueryCache::new(COIN, QueryOptions::coin_details()),
            coin_detail: QueryCache::new(
                COIN_DETAILS,
                QueryOptions::coin_details(),
            ),
            chart: QueryCache::new(COIN_CHART, QueryOptions::market_chart()),
            search: QueryCache::new(SEARCH_COINS, QueryOptions::search()),
        }
    }

    pub fn http(&self) -> &HTTP {
        &self.http
    }

    pub fn coins(
        &self,
        page: u32,
        per_page: u32,
        currency: &str,
    ) -> QueryHandle<Vec<CoinSummary>> {
        let currency = currency.to_lowercase();
        let key = coins_key(page, per_page, &currency);
        let http = self.http.clone();

        self.coin_list.use_query(
            key,
            move || {
                let http = http.clone();
                let currency = currency.clone();
                async move { http.list_coins(page, per_page, &currency).await }
            },
            true,
        )
    }

    /// Summary of one coin in [`COIN_CURRENCY`]. Disabled until `id` is
    /// non-empty.
    pub fn coin(&self, id: &str) -> QueryHandle<CoinSummary> {
        let id = id.trim().to_owned();
        let key = coin_key(&id);
        let enabled = !id.is_empty();
        let http = self.http.clone();

        self.coin.use_query(
            key,
            move || {
                let http = http.clone();
                let id = id.clone();
                async move {
                    http.get_coin_detail(&id, COIN_CURRENCY)
                        .await
                        .map(|detail| detail.summary)
                }
            },
            enabled,
        )
    }

    /// Disabled until `id` is non-empty.
    pub fn coin_details(
        &self,
        id: &str,
        currency: &str,
    ) -> QueryHandle<CoinDetail> {
        let id = id.trim().to_owned();
        let currency = currency.to_lowercase();
        let key = coin_details_key(&id, &currency);
        let enabled = !id.is_empty();
        let http = self.http.clone();

        self.coin_detail.use_query(
            key,
            move || {
                let http = http.clone();
                let id = id.clone();
                let currency = currency.clone();
                async move { http.get_coin_detail(&id, &currency).await }
            },
            enabled,
        )
    }

    /// Disabled until `id` is non-empty.
    pub fn coin_chart(
        &self,
        id: &str,
        currency: &str,
        days: u32,
    ) -> QueryHandle<MarketChartSeries> {
        let id = id.trim().to_owned();
        let currency = currency.to_lowercase();
        let key = coin_chart_key(&id, &currency, days);
        let enabled = !id.is_empty();
        let http = self.http.clone();

        self.chart.use_query(
            key,
            move || {
                let http = http.clone();
                let id = id.clone();
                let currency = currency.clone();
                async move { http.get_market_chart(&id, &currency, days).await }
            },
            enabled,
        )
    }

    /// Disabled while the query is too short to search for.
    pub fn search_coins(&self, query: &str) -> QueryHandle<SearchResult> {
        let query = query.trim().to_owned();
        let key = search_coins_key(&query);
        let enabled = is_searchable(&query);
        let http = self.http.clone();

        self.search.use_query(
            key,
            move || {
                let http = http.clone();
                let query = query.clone();
                async move { http.search_coins(&query).await }
            },
            enabled,
        )
    }

    /// Warm the coin list entry for a page without subscribing to it.
    pub async fn prefetch_coins(
        &self,
        page: u32,
        per_page: u32,
        currency: &str,
    ) -> QueryState<Vec<CoinSummary>> {
        let currency = currency.to_lowercase();
        let key = coins_key(page, per_page, &currency);
        let http = self.http.clone();

        self.coin_list
            .prefetch(key, move || {
                let http = http.clone();
                let currency = currency.clone();
                async move { http.list_coins(page, per_page, &currency).await }
            })
            .await
    }

    pub fn collect_garbage(&self) -> usize {
        self.coin_list.collect_garbage()
            + self.coin.collect_garbage()
            + self.coin_detail.collect_garbage()
            + self.chart.collect_garbage()
            + self.search.collect_garbage()
    }

    pub fn stats(&self) -> QueriesStats {
        QueriesStats {
            coins: self.coin_list.stats(),
            coin: self.coin.stats(),
            coin_details: self.coin_detail.stats(),
            coin_chart: self.chart.stats(),
            search_coins: self.search.stats(),
        }
    }

    /// Drop every entry; fetches still running are discarded on arrival.
    pub fn dispose(&self) {
        self.coin_list.clear();
        self.coin.clear();
        self.coin_detail.clear();
        self.chart.clear();
        self.search.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{configuration::Config, query::QueryStatus};
    use mockito::{Matcher, Server, ServerGuard};
    use serde_json::json;

    async fn create_server_and_queries() -> (ServerGuard, MarketQueries) {
        let server = Server::new_async().await;
        let http = HTTP::new(Config::with_api_url(&server.url())).unwrap();
        (server, MarketQueries::new(http))
    }

    #[test]
    fn test_key_equivalence() {
        assert_eq!(coins_key(2, 20, "BRL"), coins_key(2, 20, "brl"));
        assert_ne!(coins_key(2, 20, "BRL"), coins_key(2, 20, "USD"));
        assert_ne!(coins_key(2, 20, "brl"), coins_key(20, 2, "brl"));
        assert_ne!(
            coin_chart_key("bitcoin", "usd", 7),
            coin_chart_key("bitcoin", "usd", 30)
        );
        assert_eq!(search_coins_key(" doge "), search_coins_key("doge"));
    }

    #[tokio::test]
    async fn test_same_arguments_share_one_request() {
        let (mut server, queries) = create_server_and_queries().await;

        let brl = server
            .mock("GET", "/coins/markets")
            .match_query(Matcher::UrlEncoded("vs_currency".into(), "brl".into()))
            .with_status(200)
            .with_body(json!([{ "id": "bitcoin", "current_price": 1.0 }]).to_string())
            .expect(1)
            .create_async()
            .await;

        let usd = server
            .mock("GET", "/coins/markets")
            .match_query(Matcher::UrlEncoded("vs_currency".into(), "usd".into()))
            .with_status(200)
            .with_body(json!([{ "id": "bitcoin", "current_price": 2.0 }]).to_string())
            .expect(1)
            .create_async()
            .await;

        let first = queries.coins(2, 20, "BRL");
        let second = queries.coins(2, 20, "BRL");
        let other = queries.coins(2, 20, "USD");

        assert_eq!(first.key(), second.key());
        assert_ne!(first.key(), other.key());

        let (first, second, other) =
            tokio::join!(first.wait(), second.wait(), other.wait());

        assert_eq!(first.data, second.data);
        assert_eq!(first.data.unwrap()[0].current_price, 1.0);
        assert_eq!(other.data.unwrap()[0].current_price, 2.0);
        assert_eq!(queries.stats().coins.entries, 2);

        brl.assert_async().await;
        usd.assert_async().await;
    }

    #[tokio::test]
    async fn test_coin_summary_is_priced_in_usd() {
        let (mut server, queries) = create_server_and_queries().await;

        let mock = server
            .mock("GET", "/coins/bitcoin")
            .match_query(Matcher::UrlEncoded("market_data".into(), "true".into()))
            .with_status(200)
            .with_body(
                json!({
                    "id": "bitcoin",
                    "name": "Bitcoin",
                    "market_data": {
                        "current_price": { "brl": 300000.0, "usd": 60000.0 }
                    }
                })
                .to_string(),
            )
            .expect(1)
            .create_async()
            .await;

        let first = queries.coin(" bitcoin ");
        let second = queries.coin("bitcoin");
        assert_eq!(first.key(), &coin_key("bitcoin"));

        let (first, second) = tokio::join!(first.wait(), second.wait());
        let summary = first.data.unwrap();

        assert_eq!(summary.name, "Bitcoin");
        assert_eq!(summary.current_price, 60000.0);
        assert_eq!(second.data, Some(summary));
        assert_eq!(queries.stats().coin.entries, 1);
        assert!(!queries.coin("").is_enabled());

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_search_through_cache() {
        let (mut server, queries) = create_server_and_queries().await;

        server
            .mock("GET", "/search")
            .match_query(Matcher::UrlEncoded("query".into(), "doge".into()))
            .with_status(200)
            .with_body(json!({ "coins": [{ "id": "dogecoin" }] }).to_string())
            .create_async()
            .await;

        server
            .mock("GET", "/coins/markets")
            .match_query(Matcher::UrlEncoded("ids".into(), "dogecoin".into()))
            .with_status(200)
            .with_body(json!([{ "id": "dogecoin", "name": "Dogecoin" }]).to_string())
            .create_async()
            .await;

        let handle = queries.search_coins("doge");
        let state = handle.wait().await;

        assert!(state.is_success());
        let coins = state.data.unwrap().coins;
        assert_eq!(coins.len(), 1);
        assert_eq!(coins[0].name, "Dogecoin");
    }

    #[tokio::test]
    async fn test_short_search_is_disabled_not_failed() {
        let (mut server, queries) = create_server_and_queries().await;
        let mock = server
            .mock("GET", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let handle = queries.search_coins("d");
        let state = handle.wait().await;

        assert!(!state.enabled);
        assert_eq!(state.status, QueryStatus::Pending);
        assert!(state.error.is_none());
        assert!(!state.is_fetching);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_coin_id_is_disabled() {
        let (_server, queries) = create_server_and_queries().await;

        assert!(!queries.coin_details("", "usd").is_enabled());
        assert!(!queries.coin_chart(" ", "usd", 7).is_enabled());
        assert!(queries.coin_chart("bitcoin", "usd", 7).is_enabled());
    }

    #[tokio::test]
    async fn test_failed_fetch_is_hard_error() {
        let (mut server, queries) = create_server_and_queries().await;

        server
            .mock("GET", "/coins/missing")
            .match_query(Matcher::Any)
            .with_status(404)
            .expect_at_least(1)
            .create_async()
            .await;

        let handle = queries.coin_details("missing", "usd");
        let state = handle.wait().await;

        // two retries with 1s and 2s backoff
        assert!(state.is_hard_error());
        assert_eq!(state.failure_count, 3);
        assert_eq!(state.error.and_then(|e| e.status()), Some(404));
    }

    #[tokio::test]
    async fn test_dispose_clears_every_cache() {
        let (mut server, queries) = create_server_and_queries().await;

        server
            .mock("GET", "/coins/markets")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let state = queries.prefetch_coins(1, 20, "usd").await;
        assert!(state.is_success());
        assert_eq!(queries.stats().coins.entries, 1);

        queries.dispose();
        assert_eq!(queries.stats().coins.entries, 0);
    }
}
