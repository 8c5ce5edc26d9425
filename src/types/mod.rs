pub use self::{
    coin_gecko_info::{
        CoinGeckoImage, CoinGeckoInfo, CoinGeckoInfoMarketData,
        CoinGeckoLinks, CoinGeckoRepos, CurrencyValues,
    },
    coin_gecko_market::{CoinGeckoMarket, CoinGeckoRoi},
    coin_gecko_market_data::{CoinGeckoMarketData, MarketData},
    coin_gecko_search::{CoinGeckoSearch, CoinGeckoSearchCoin},
};

mod coin_gecko_info;
mod coin_gecko_market;
mod coin_gecko_market_data;
mod coin_gecko_search;
