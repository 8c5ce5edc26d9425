//! Centralized query key operation names
//!
//! All operation names used by the query facade, the controllers and the
//! cache sweeper are defined here so the three never drift apart.

/// `coins` + page, page size, currency
pub const COINS: &str = "coins";

/// `coin` + coin id (summary in the reference currency)
pub const COIN: &str = "coin";

/// `coin-details` + coin id, currency
pub const COIN_DETAILS: &str = "coin-details";

/// `coin-chart` + coin id, currency, days
pub const COIN_CHART: &str = "coin-chart";

/// `search-coins` + query text
pub const SEARCH_COINS: &str = "search-coins";
