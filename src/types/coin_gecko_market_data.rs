use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct CoinGeckoMarketData {
    #[serde(default)]
    pub prices: Vec<MarketData>,
    #[serde(default)]
    pub market_caps: Vec<MarketData>,
    #[serde(default)]
    pub total_volumes: Vec<MarketData>,
}

#[derive(Deserialize, Debug, Clone, Copy)]
pub struct MarketData(pub i64, pub f64);
