use std::time::Duration;

use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, ACCEPT},
    Client,
};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::{
    configuration::Config,
    error::{ApiError, Error},
    model::{CoinDetail, CoinSummary, MarketChartSeries, SearchResult},
    types::{CoinGeckoInfo, CoinGeckoMarket, CoinGeckoMarketData, CoinGeckoSearch},
};

pub const MIN_SEARCH_LENGTH: usize = 2;
pub const MAX_SEARCH_RESULTS: usize = 20;

/// Whether `query` is long enough to be sent to the provider.
pub fn is_searchable(query: &str) -> bool {
    query.trim().chars().count() >= MIN_SEARCH_LENGTH
}

#[derive(Debug)]
pub struct HTTP {
    pub config: Config,
    client: Client,
}

impl HTTP {
    pub fn new(config: Config) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        if let Some(api_key) = &config.api_key {
            let name = HeaderName::from_bytes(config.api_key_header.as_bytes())?;
            let mut value = HeaderValue::from_str(api_key)?;
            value.set_sensitive(true);
            headers.insert(name, value);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .default_headers(headers)
            .build()?;

        Ok(HTTP { config, client })
    }

    pub async fn list_coins(
        &self,
        page: u32,
        page_size: u32,
        currency: &str,
    ) -> Result<Vec<CoinSummary>, ApiError> {
        if page == 0 {
            return Err(ApiError::Validation(String::from(
                "page must be at least 1",
            )));
        }

        if page_size == 0 {
            return Err(ApiError::Validation(String::from(
                "page size must be greater than 0",
            )));
        }

        let url = self.config.get_coins_markets_url(
            page,
            page_size,
            &currency.to_lowercase(),
        )?;
        let rows = self.get::<Vec<CoinGeckoMarket>>(url).await?;

        Ok(rows.into_iter().map(CoinSummary::from).collect())
    }

    pub async fn get_coin_detail(
        &self,
        id: &str,
        currency: &str,
    ) -> Result<CoinDetail, ApiError> {
        let id = require_id(id)?;
        let url = self.config.get_coin_info_url(id)?;
        let info = self.get::<CoinGeckoInfo>(url).await?;

        Ok(CoinDetail::from_info(info, currency))
    }

    pub async fn get_market_chart(
        &self,
        id: &str,
        currency: &str,
        days: u32,
    ) -> Result<MarketChartSeries, ApiError> {
        let id = require_id(id)?;

        if days == 0 {
            return Err(ApiError::Validation(String::from(
                "days must be greater than 0",
            )));
        }

        let currency = currency.to_lowercase();
        let url = self.config.get_market_chart_url(id, &currency, days)?;
        let data = self.get::<CoinGeckoMarketData>(url).await?;

        Ok(MarketChartSeries::from_market_data(id, &currency, days, data))
    }

    /// Free-text search followed by one market lookup for the first
    /// [`MAX_SEARCH_RESULTS`] hits.
    pub async fn search_coins(
        &self,
        query: &str,
    ) -> Result<SearchResult, ApiError> {
        if !is_searchable(query) {
            return Err(ApiError::Validation(format!(
                "search query must have at least {} characters",
                MIN_SEARCH_LENGTH
            )));
        }

        let url = self.config.get_search_url(query.trim())?;
        let search = self.get::<CoinGeckoSearch>(url).await?;

        let ids: Vec<String> = search
            .coins
            .into_iter()
            .take(MAX_SEARCH_RESULTS)
            .map(|coin| coin.id)
            .collect();

        if ids.is_empty() {
            debug!("no search hits for {}", query);
            return Ok(SearchResult::default());
        }

        let url = self
            .config
            .get_coins_markets_by_ids_url(&ids, &self.config.search_currency)?;
        let rows = self.get::<Vec<CoinGeckoMarket>>(url).await?;

        Ok(SearchResult {
            coins: rows.into_iter().map(CoinSummary::from).collect(),
        })
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        debug!("GET {}", url.path());

        let result = self.request::<T>(url.clone()).await;
        if let Err(e) = &result {
            warn!("GET {} failed: {}", url.path(), e);
        }

        result
    }

    async fn request<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(ApiError::Transport {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_owned(),
            });
        }

        let body = response.bytes().await?;
        let json = serde_json::from_slice::<T>(&body)?;

        Ok(json)
    }
}

fn require_id(id: &str) -> Result<&str, ApiError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(ApiError::Validation(String::from("coin id is required")));
    }

    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server, ServerGuard};
    use serde_json::json;

    async fn create_server_and_client() -> (ServerGuard, HTTP) {
        let server = Server::new_async().await;
        let http = HTTP::new(Config::with_api_url(&server.url())).unwrap();
        (server, http)
    }

    fn market_row(id: &str, price: f64) -> serde_json::Value {
        json!({
            "id": id,
            "symbol": &id[..3],
            "name": id,
            "image": format!("https://img/{}.png", id),
            "current_price": price,
            "market_cap": 1000.0,
            "market_cap_rank": 1,
            "price_change_percentage_24h": -1.5,
            "roi": null,
            "last_updated": "2024-05-01T12:00:00.000Z"
        })
    }

    #[tokio::test]
    async fn test_list_coins() {
        let (mut server, http) = create_server_and_client().await;

        let mock = server
            .mock("GET", "/coins/markets")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("vs_currency".into(), "brl".into()),
                Matcher::UrlEncoded("order".into(), "market_cap_desc".into()),
                Matcher::UrlEncoded("per_page".into(), "20".into()),
                Matcher::UrlEncoded("page".into(), "2".into()),
            ]))
            .match_header("accept", "application/json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!([market_row("bitcoin", 1.0), market_row("ethereum", 2.0)])
                    .to_string(),
            )
            .create_async()
            .await;

        let coins = http.list_coins(2, 20, "BRL").await.unwrap();

        assert_eq!(coins.len(), 2);
        assert_eq!(coins[0].id, "bitcoin");
        assert_eq!(coins[1].current_price, 2.0);
        assert_eq!(coins[1].price_change_percentage_24h, -1.5);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_api_key_header() {
        let mut server = Server::new_async().await;
        let mut config = Config::with_api_url(&server.url());
        config.api_key = Some(String::from("secret"));
        let http = HTTP::new(config).unwrap();

        let mock = server
            .mock("GET", "/coins/markets")
            .match_query(Matcher::Any)
            .match_header("x-cg-demo-api-key", "secret")
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        assert!(http.list_coins(1, 20, "usd").await.unwrap().is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_success_status_is_transport_error() {
        let (mut server, http) = create_server_and_client().await;

        server
            .mock("GET", "/coins/unknown")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body(json!({ "error": "coin not found" }).to_string())
            .create_async()
            .await;

        let error = http.get_coin_detail("unknown", "usd").await.unwrap_err();

        assert_eq!(
            error,
            ApiError::Transport {
                status: 404,
                status_text: String::from("Not Found"),
            }
        );
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_error() {
        let (mut server, http) = create_server_and_client().await;

        server
            .mock("GET", "/coins/markets")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(json!({ "unexpected": true }).to_string())
            .create_async()
            .await;

        let error = http.list_coins(1, 20, "usd").await.unwrap_err();
        assert!(matches!(error, ApiError::Decode(_)));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_network_error() {
        let http = HTTP::new(Config::with_api_url("http://127.0.0.1:1")).unwrap();

        let error = http.list_coins(1, 20, "usd").await.unwrap_err();
        assert!(matches!(error, ApiError::Network(_)));
    }

    #[tokio::test]
    async fn test_invalid_arguments_fail_before_request() {
        let (mut server, http) = create_server_and_client().await;
        let mock = server
            .mock("GET", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        for error in [
            http.list_coins(0, 20, "usd").await.unwrap_err(),
            http.list_coins(1, 0, "usd").await.unwrap_err(),
            http.get_market_chart("bitcoin", "usd", 0).await.unwrap_err(),
            http.get_coin_detail(" ", "usd").await.unwrap_err(),
            http.search_coins("d").await.unwrap_err(),
        ] {
            assert!(matches!(error, ApiError::Validation(_)));
        }

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_coin_detail_uses_lowercase_currency() {
        let (mut server, http) = create_server_and_client().await;

        server
            .mock("GET", "/coins/bitcoin")
            .match_query(Matcher::UrlEncoded("market_data".into(), "true".into()))
            .with_status(200)
            .with_body(
                json!({
                    "id": "bitcoin",
                    "symbol": "btc",
                    "name": "Bitcoin",
                    "image": { "large": "l.png", "small": "s.png" },
                    "market_data": {
                        "current_price": { "brl": 300000.0, "usd": 60000.0 },
                        "high_24h": { "brl": 310000.0 }
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let detail = http.get_coin_detail("bitcoin", "BRL").await.unwrap();

        assert_eq!(detail.summary.image, "l.png");
        assert_eq!(detail.summary.current_price, 300000.0);
        assert_eq!(detail.summary.high_24h, 310000.0);
        assert_eq!(detail.summary.low_24h, 0.0);
    }

    #[tokio::test]
    async fn test_market_chart_is_sorted() {
        let (mut server, http) = create_server_and_client().await;

        server
            .mock("GET", "/coins/bitcoin/market_chart")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("vs_currency".into(), "usd".into()),
                Matcher::UrlEncoded("days".into(), "7".into()),
                Matcher::UrlEncoded("interval".into(), "daily".into()),
            ]))
            .with_status(200)
            .with_body(
                json!({
                    "prices": [[2000, 2.0], [1000, 1.0]],
                    "market_caps": [[1000, 10.0]],
                    "total_volumes": [[1000, 5.0]]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let chart = http.get_market_chart("bitcoin", "usd", 7).await.unwrap();

        assert_eq!(chart.prices, vec![(1000, 1.0), (2000, 2.0)]);
        assert_eq!(chart.days, 7);
    }

    #[tokio::test]
    async fn test_search_resolves_hits_to_markets() {
        let (mut server, http) = create_server_and_client().await;

        let search = server
            .mock("GET", "/search")
            .match_query(Matcher::UrlEncoded("query".into(), "doge".into()))
            .with_status(200)
            .with_body(
                json!({ "coins": [{ "id": "dogecoin", "name": "Dogecoin" }] })
                    .to_string(),
            )
            .create_async()
            .await;

        let markets = server
            .mock("GET", "/coins/markets")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("ids".into(), "dogecoin".into()),
                Matcher::UrlEncoded("vs_currency".into(), "usd".into()),
            ]))
            .with_status(200)
            .with_body(json!([market_row("dogecoin", 0.15)]).to_string())
            .create_async()
            .await;

        let result = http.search_coins("doge").await.unwrap();

        assert_eq!(result.coins.len(), 1);
        assert_eq!(result.coins[0].id, "dogecoin");
        assert_eq!(result.coins[0].current_price, 0.15);
        search.assert_async().await;
        markets.assert_async().await;
    }

    #[tokio::test]
    async fn test_search_without_hits_skips_market_lookup() {
        let (mut server, http) = create_server_and_client().await;

        server
            .mock("GET", "/search")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(json!({ "coins": [] }).to_string())
            .create_async()
            .await;

        let markets = server
            .mock("GET", "/coins/markets")
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let result = http.search_coins("zzzznotarealcoin").await.unwrap();

        assert_eq!(result, SearchResult { coins: vec![] });
        markets.assert_async().await;
    }

    #[tokio::test]
    async fn test_search_keeps_first_twenty_hits() {
        let (mut server, http) = create_server_and_client().await;
        let hits: Vec<serde_json::Value> =
            (0..25).map(|i| json!({ "id": format!("coin-{}", i) })).collect();
        let expected_ids: Vec<String> =
            (0..20).map(|i| format!("coin-{}", i)).collect();

        server
            .mock("GET", "/search")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(json!({ "coins": hits }).to_string())
            .create_async()
            .await;

        let markets = server
            .mock("GET", "/coins/markets")
            .match_query(Matcher::UrlEncoded("ids".into(), expected_ids.join(",")))
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        http.search_coins("coin").await.unwrap();
        markets.assert_async().await;
    }
}
