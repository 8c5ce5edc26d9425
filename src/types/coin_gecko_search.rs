use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct CoinGeckoSearch {
    #[serde(default)]
    pub coins: Vec<CoinGeckoSearchCoin>,
}

#[derive(Debug, Deserialize)]
pub struct CoinGeckoSearchCoin {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub market_cap_rank: Option<u32>,
    #[serde(default)]
    pub thumb: Option<String>,
    #[serde(default)]
    pub large: Option<String>,
}
