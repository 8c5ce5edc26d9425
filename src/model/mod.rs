//! Market data records
//!
//! Typed records built from provider responses; these are what the query
//! caches store and the API serves.

mod coin;
mod market_chart;

pub use coin::{
    CoinDetail, CoinSummary, CurrencyMarketData, Links, Roi, SearchResult,
};
pub use market_chart::{ChartPoint, MarketChartSeries};
