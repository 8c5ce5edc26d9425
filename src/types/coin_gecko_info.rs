use std::collections::HashMap;

use serde::Deserialize;

use super::CoinGeckoRoi;

/// Per-currency figures keyed by lowercase currency code.
pub type CurrencyValues<T> = HashMap<String, Option<T>>;

/// `/coins/{id}` with market data and without tickers or community data.
#[derive(Debug, Deserialize)]
pub struct CoinGeckoInfo {
    pub id: String,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub image: Option<CoinGeckoImage>,
    #[serde(default)]
    pub market_cap_rank: Option<u32>,
    #[serde(default)]
    pub description: Option<HashMap<String, Option<String>>>,
    #[serde(default)]
    pub links: Option<CoinGeckoLinks>,
    #[serde(default)]
    pub market_data: Option<CoinGeckoInfoMarketData>,
    #[serde(default)]
    pub last_updated: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CoinGeckoImage {
    #[serde(default)]
    pub thumb: Option<String>,
    #[serde(default)]
    pub small: Option<String>,
    #[serde(default)]
    pub large: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CoinGeckoLinks {
    #[serde(default)]
    pub homepage: Vec<Option<String>>,
    #[serde(default)]
    pub blockchain_site: Vec<Option<String>>,
    #[serde(default)]
    pub official_forum_url: Vec<Option<String>>,
    #[serde(default)]
    pub subreddit_url: Option<String>,
    #[serde(default)]
    pub repos_url: Option<CoinGeckoRepos>,
}

#[derive(Debug, Deserialize)]
pub struct CoinGeckoRepos {
    #[serde(default)]
    pub github: Vec<Option<String>>,
}

#[derive(Debug, Deserialize, Default)]
pub struct CoinGeckoInfoMarketData {
    #[serde(default)]
    pub current_price: CurrencyValues<f64>,
    #[serde(default)]
    pub market_cap: CurrencyValues<f64>,
    #[serde(default)]
    pub fully_diluted_valuation: CurrencyValues<f64>,
    #[serde(default)]
    pub total_volume: CurrencyValues<f64>,
    #[serde(default)]
    pub high_24h: CurrencyValues<f64>,
    #[serde(default)]
    pub low_24h: CurrencyValues<f64>,
    #[serde(default)]
    pub price_change_24h_in_currency: CurrencyValues<f64>,
    #[serde(default)]
    pub price_change_percentage_24h_in_currency: CurrencyValues<f64>,
    #[serde(default)]
    pub price_change_percentage_7d_in_currency: CurrencyValues<f64>,
    #[serde(default)]
    pub price_change_percentage_30d_in_currency: CurrencyValues<f64>,
    #[serde(default)]
    pub market_cap_change_24h_in_currency: CurrencyValues<f64>,
    #[serde(default)]
    pub market_cap_change_percentage_24h: Option<f64>,
    #[serde(default)]
    pub circulating_supply: Option<f64>,
    #[serde(default)]
    pub total_supply: Option<f64>,
    #[serde(default)]
    pub max_supply: Option<f64>,
    #[serde(default)]
    pub ath: CurrencyValues<f64>,
    #[serde(default)]
    pub ath_change_percentage: CurrencyValues<f64>,
    #[serde(default)]
    pub ath_date: CurrencyValues<String>,
    #[serde(default)]
    pub atl: CurrencyValues<f64>,
    #[serde(default)]
    pub atl_change_percentage: CurrencyValues<f64>,
    #[serde(default)]
    pub atl_date: CurrencyValues<String>,
    #[serde(default)]
    pub roi: Option<CoinGeckoRoi>,
}
