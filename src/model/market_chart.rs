use serde::{Deserialize, Serialize};

use crate::types::{CoinGeckoMarketData, MarketData};

/// `(timestamp_ms, value)`
pub type ChartPoint = (i64, f64);

/// Daily price, market cap and volume series for one coin, each sorted by
/// ascending timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketChartSeries {
    pub id: String,
    pub currency: String,
    pub days: u32,
    pub prices: Vec<ChartPoint>,
    pub market_caps: Vec<ChartPoint>,
    pub total_volumes: Vec<ChartPoint>,
}

impl MarketChartSeries {
    pub fn from_market_data(
        id: &str,
        currency: &str,
        days: u32,
        data: CoinGeckoMarketData,
    ) -> Self {
        MarketChartSeries {
            id: id.to_owned(),
            currency: currency.to_lowercase(),
            days,
            prices: sorted(data.prices),
            market_caps: sorted(data.market_caps),
            total_volumes: sorted(data.total_volumes),
        }
    }
}

fn sorted(items: Vec<MarketData>) -> Vec<ChartPoint> {
    let mut points: Vec<ChartPoint> = items
        .into_iter()
        .map(|MarketData(timestamp, value)| (timestamp, value))
        .collect();
    points.sort_by_key(|(timestamp, _)| *timestamp);
    points
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_series_are_sorted_by_timestamp() {
        let data: CoinGeckoMarketData = serde_json::from_str(
            r#"{
                "prices": [[3000, 3.0], [1000, 1.0], [2000, 2.0]],
                "market_caps": [[2000, 20.0], [1000, 10.0]]
            }"#,
        )
        .expect("valid chart");

        let series = MarketChartSeries::from_market_data("bitcoin", "BRL", 7, data);

        assert_eq!(series.currency, "brl");
        assert_eq!(series.prices, vec![(1000, 1.0), (2000, 2.0), (3000, 3.0)]);
        assert_eq!(series.market_caps, vec![(1000, 10.0), (2000, 20.0)]);
        assert!(series.total_volumes.is_empty());
    }
}
