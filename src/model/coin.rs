//! Coin market records
//!
//! Provider rows are decoded with every field optional; the conversions
//! here substitute neutral defaults (`0` for numbers, `""` for strings) so
//! one missing figure never fails a whole response.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{
    CoinGeckoInfo, CoinGeckoInfoMarketData, CoinGeckoLinks, CoinGeckoMarket,
    CoinGeckoRoi, CurrencyValues,
};

// -----------------------------------------------------------------------------
// Summary
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinSummary {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub image: String,
    pub current_price: f64,
    pub market_cap: f64,
    pub market_cap_rank: u32,
    pub fully_diluted_valuation: f64,
    pub total_volume: f64,
    pub high_24h: f64,
    pub low_24h: f64,
    pub price_change_24h: f64,
    pub price_change_percentage_24h: f64,
    pub market_cap_change_24h: f64,
    pub market_cap_change_percentage_24h: f64,
    pub circulating_supply: f64,
    pub total_supply: f64,
    pub max_supply: f64,
    pub ath: f64,
    pub ath_change_percentage: f64,
    pub ath_date: String,
    pub atl: f64,
    pub atl_change_percentage: f64,
    pub atl_date: String,
    pub roi: Option<Roi>,
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Roi {
    pub times: f64,
    pub currency: String,
    pub percentage: f64,
}

impl From<CoinGeckoRoi> for Roi {
    fn from(roi: CoinGeckoRoi) -> Self {
        Roi {
            times: roi.times.unwrap_or_default(),
            currency: roi.currency.unwrap_or_default(),
            percentage: roi.percentage.unwrap_or_default(),
        }
    }
}

impl From<CoinGeckoMarket> for CoinSummary {
    fn from(row: CoinGeckoMarket) -> Self {
        CoinSummary {
            id: row.id,
            symbol: row.symbol.unwrap_or_default(),
            name: row.name.unwrap_or_default(),
            image: row.image.unwrap_or_default(),
            current_price: row.current_price.unwrap_or_default(),
            market_cap: row.market_cap.unwrap_or_default(),
            market_cap_rank: row.market_cap_rank.unwrap_or_default(),
            fully_diluted_valuation: row
                .fully_diluted_valuation
                .unwrap_or_default(),
            total_volume: row.total_volume.unwrap_or_default(),
            high_24h: row.high_24h.unwrap_or_default(),
            low_24h: row.low_24h.unwrap_or_default(),
            price_change_24h: row.price_change_24h.unwrap_or_default(),
            price_change_percentage_24h: row
                .price_change_percentage_24h
                .unwrap_or_default(),
            market_cap_change_24h: row.market_cap_change_24h.unwrap_or_default(),
            market_cap_change_percentage_24h: row
                .market_cap_change_percentage_24h
                .unwrap_or_default(),
            circulating_supply: row.circulating_supply.unwrap_or_default(),
            total_supply: row.total_supply.unwrap_or_default(),
            max_supply: row.max_supply.unwrap_or_default(),
            ath: row.ath.unwrap_or_default(),
            ath_change_percentage: row.ath_change_percentage.unwrap_or_default(),
            ath_date: row.ath_date.unwrap_or_default(),
            atl: row.atl.unwrap_or_default(),
            atl_change_percentage: row.atl_change_percentage.unwrap_or_default(),
            atl_date: row.atl_date.unwrap_or_default(),
            roi: row.roi.map(Roi::from),
            last_updated: parse_timestamp(row.last_updated.as_deref()),
        }
    }
}

fn parse_timestamp(value: Option<&str>) -> Option<DateTime<Utc>> {
    value
        .and_then(|value| DateTime::parse_from_rfc3339(value).ok())
        .map(|value| value.with_timezone(&Utc))
}

// -----------------------------------------------------------------------------
// Detail
// -----------------------------------------------------------------------------

/// Figures keyed by lowercase currency code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrencyMarketData {
    pub current_price: HashMap<String, f64>,
    pub market_cap: HashMap<String, f64>,
    pub fully_diluted_valuation: HashMap<String, f64>,
    pub total_volume: HashMap<String, f64>,
    pub high_24h: HashMap<String, f64>,
    pub low_24h: HashMap<String, f64>,
    pub price_change_24h: HashMap<String, f64>,
    pub price_change_percentage_24h: HashMap<String, f64>,
    pub price_change_percentage_7d: HashMap<String, f64>,
    pub price_change_percentage_30d: HashMap<String, f64>,
    pub market_cap_change_24h: HashMap<String, f64>,
    pub ath: HashMap<String, f64>,
    pub ath_change_percentage: HashMap<String, f64>,
    pub ath_date: HashMap<String, String>,
    pub atl: HashMap<String, f64>,
    pub atl_change_percentage: HashMap<String, f64>,
    pub atl_date: HashMap<String, String>,
}

impl From<CoinGeckoInfoMarketData> for CurrencyMarketData {
    fn from(data: CoinGeckoInfoMarketData) -> Self {
        CurrencyMarketData {
            current_price: known(data.current_price),
            market_cap: known(data.market_cap),
            fully_diluted_valuation: known(data.fully_diluted_valuation),
            total_volume: known(data.total_volume),
            high_24h: known(data.high_24h),
            low_24h: known(data.low_24h),
            price_change_24h: known(data.price_change_24h_in_currency),
            price_change_percentage_24h: known(
                data.price_change_percentage_24h_in_currency,
            ),
            price_change_percentage_7d: known(
                data.price_change_percentage_7d_in_currency,
            ),
            price_change_percentage_30d: known(
                data.price_change_percentage_30d_in_currency,
            ),
            market_cap_change_24h: known(data.market_cap_change_24h_in_currency),
            ath: known(data.ath),
            ath_change_percentage: known(data.ath_change_percentage),
            ath_date: known(data.ath_date),
            atl: known(data.atl),
            atl_change_percentage: known(data.atl_change_percentage),
            atl_date: known(data.atl_date),
        }
    }
}

fn known<T>(values: CurrencyValues<T>) -> HashMap<String, T> {
    values
        .into_iter()
        .filter_map(|(code, value)| value.map(|v| (code.to_lowercase(), v)))
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Links {
    pub homepage: Vec<String>,
    pub blockchain_site: Vec<String>,
    pub official_forum_url: Vec<String>,
    pub subreddit_url: String,
    pub repos_github: Vec<String>,
}

impl From<CoinGeckoLinks> for Links {
    fn from(links: CoinGeckoLinks) -> Self {
        Links {
            homepage: non_empty(links.homepage),
            blockchain_site: non_empty(links.blockchain_site),
            official_forum_url: non_empty(links.official_forum_url),
            subreddit_url: links.subreddit_url.unwrap_or_default(),
            repos_github: links
                .repos_url
                .map(|repos| non_empty(repos.github))
                .unwrap_or_default(),
        }
    }
}

fn non_empty(values: Vec<Option<String>>) -> Vec<String> {
    values
        .into_iter()
        .flatten()
        .filter(|value| !value.trim().is_empty())
        .collect()
}

/// Full coin record flattened into `currency`, with the per-currency maps
/// kept so other currencies can be shown without refetching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinDetail {
    #[serde(flatten)]
    pub summary: CoinSummary,
    pub currency: String,
    pub description: String,
    pub links: Links,
    pub market_data: CurrencyMarketData,
}

impl CoinDetail {
    pub fn from_info(info: CoinGeckoInfo, currency: &str) -> Self {
        let currency = currency.to_lowercase();
        let market = info.market_data.unwrap_or_default();

        let image = info
            .image
            .and_then(|image| image.large.or(image.small).or(image.thumb))
            .unwrap_or_default();

        let description = info
            .description
            .and_then(|mut texts| texts.remove("en"))
            .flatten()
            .unwrap_or_default();

        let base = CoinSummary {
            id: info.id,
            symbol: info.symbol.unwrap_or_default(),
            name: info.name.unwrap_or_default(),
            image,
            current_price: 0.0,
            market_cap: 0.0,
            market_cap_rank: info.market_cap_rank.unwrap_or_default(),
            fully_diluted_valuation: 0.0,
            total_volume: 0.0,
            high_24h: 0.0,
            low_24h: 0.0,
            price_change_24h: 0.0,
            price_change_percentage_24h: 0.0,
            market_cap_change_24h: 0.0,
            market_cap_change_percentage_24h: market
                .market_cap_change_percentage_24h
                .unwrap_or_default(),
            circulating_supply: market.circulating_supply.unwrap_or_default(),
            total_supply: market.total_supply.unwrap_or_default(),
            max_supply: market.max_supply.unwrap_or_default(),
            ath: 0.0,
            ath_change_percentage: 0.0,
            ath_date: String::new(),
            atl: 0.0,
            atl_change_percentage: 0.0,
            atl_date: String::new(),
            roi: market.roi.clone().map(Roi::from),
            last_updated: parse_timestamp(info.last_updated.as_deref()),
        };

        let market_data = CurrencyMarketData::from(market);
        let summary = market_data.flatten(&base, &currency);

        CoinDetail {
            summary,
            currency,
            description,
            links: info.links.map(Links::from).unwrap_or_default(),
            market_data,
        }
    }

    /// The summary re-flattened for another currency code.
    pub fn in_currency(&self, currency: &str) -> CoinSummary {
        self.market_data.flatten(&self.summary, currency)
    }
}

impl CurrencyMarketData {
    fn flatten(&self, base: &CoinSummary, currency: &str) -> CoinSummary {
        let code = currency.to_lowercase();
        let number = |values: &HashMap<String, f64>| {
            values.get(&code).copied().unwrap_or_default()
        };
        let text = |values: &HashMap<String, String>| {
            values.get(&code).cloned().unwrap_or_default()
        };

        CoinSummary {
            current_price: number(&self.current_price),
            market_cap: number(&self.market_cap),
            fully_diluted_valuation: number(&self.fully_diluted_valuation),
            total_volume: number(&self.total_volume),
            high_24h: number(&self.high_24h),
            low_24h: number(&self.low_24h),
            price_change_24h: number(&self.price_change_24h),
            price_change_percentage_24h: number(
                &self.price_change_percentage_24h,
            ),
            market_cap_change_24h: number(&self.market_cap_change_24h),
            ath: number(&self.ath),
            ath_change_percentage: number(&self.ath_change_percentage),
            ath_date: text(&self.ath_date),
            atl: number(&self.atl),
            atl_change_percentage: number(&self.atl_change_percentage),
            atl_date: text(&self.atl_date),
            ..base.clone()
        }
    }
}

// -----------------------------------------------------------------------------
// Search
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub coins: Vec<CoinSummary>,
}
