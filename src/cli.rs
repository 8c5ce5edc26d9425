//! CLI module for the coinboard service
//!
//! Provides command-line access to the same cached market queries the
//! server uses, printing results as plain tables.

use clap::{Parser, Subcommand};

use crate::{
    chart::{ChartLayout, ChartSummary},
    configuration::{get_configuration, set_configuration, Config},
    controller::response::resolve,
    error::Error,
    helpers::{format_compact, format_day, format_percentage, format_price},
    provider::HTTP,
    queries::MarketQueries,
};

/// Coinboard market data service
#[derive(Parser)]
#[command(name = "coinboard")]
#[command(about = "Cryptocurrency market dashboard backend", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the API server (default if no command specified)
    Serve,

    /// List coins ranked by market cap
    Coins {
        #[arg(long, default_value = "1")]
        page: u32,

        /// Defaults to DEFAULT_PAGE_SIZE
        #[arg(long)]
        per_page: Option<u32>,

        /// Defaults to DEFAULT_CURRENCY
        #[arg(long)]
        currency: Option<String>,
    },

    /// Show one coin
    Coin {
        id: String,

        #[arg(long)]
        currency: Option<String>,
    },

    /// Show the daily price chart of a coin
    Chart {
        id: String,

        #[arg(long)]
        currency: Option<String>,

        /// Defaults to CHART_DAYS
        #[arg(long)]
        days: Option<u32>,
    },

    /// Search coins by name or symbol
    Search { query: String },
}

/// Initialize configuration and return Config
pub fn init_config() -> Result<Config, Error> {
    set_configuration()?;
    get_configuration()
}

fn init_queries() -> Result<(Config, MarketQueries), Error> {
    let config = init_config()?;
    let http = HTTP::new(config.clone())?;
    Ok((config, MarketQueries::new(http)))
}

fn currency(config: &Config, currency: Option<String>) -> String {
    currency
        .unwrap_or_else(|| config.default_currency.to_owned())
        .to_lowercase()
}

/// Print one page of the market list
pub async fn run_coins(
    page: u32,
    per_page: Option<u32>,
    currency_code: Option<String>,
) -> Result<(), Error> {
    let (config, queries) = init_queries()?;
    let per_page = per_page.unwrap_or(config.default_page_size);
    let currency = currency(&config, currency_code);

    let handle = queries.coins(page, per_page, &currency);
    let state = resolve(&handle).await?;

    println!(
        "{:>4}  {:<24} {:<8} {:>18} {:>10} {:>12}",
        "#", "NAME", "SYMBOL", "PRICE", "24H", "MARKET CAP"
    );

    for coin in state.data.unwrap_or_default() {
        println!(
            "{:>4}  {:<24} {:<8} {:>18} {:>10} {:>12}",
            coin.market_cap_rank,
            coin.name,
            coin.symbol.to_uppercase(),
            format_price(coin.current_price, &currency),
            format_percentage(coin.price_change_percentage_24h),
            format_compact(coin.market_cap)
        );
    }

    Ok(())
}

/// Print the detail of one coin
pub async fn run_coin(
    id: String,
    currency_code: Option<String>,
) -> Result<(), Error> {
    let (config, queries) = init_queries()?;
    let currency = currency(&config, currency_code);

    let handle = queries.coin_details(&id, &currency);
    let state = resolve(&handle).await?;
    let Some(detail) = state.data else {
        return Ok(());
    };
    let coin = &detail.summary;

    println!("{} ({})", coin.name, coin.symbol.to_uppercase());
    println!("Rank:          #{}", coin.market_cap_rank);
    println!("Price:         {}", format_price(coin.current_price, &currency));
    println!(
        "24h:           {}",
        format_percentage(coin.price_change_percentage_24h)
    );
    println!("24h high:      {}", format_price(coin.high_24h, &currency));
    println!("24h low:       {}", format_price(coin.low_24h, &currency));
    println!("Market cap:    {}", format_compact(coin.market_cap));
    println!("Volume:        {}", format_compact(coin.total_volume));
    println!("Circulating:   {:.0}", coin.circulating_supply);
    println!("ATH:           {}", format_price(coin.ath, &currency));

    if let Some(homepage) = detail.links.homepage.first() {
        println!("Homepage:      {}", homepage);
    }

    Ok(())
}

/// Print the daily price chart of one coin
pub async fn run_chart(
    id: String,
    currency_code: Option<String>,
    days: Option<u32>,
) -> Result<(), Error> {
    let (config, queries) = init_queries()?;
    let currency = currency(&config, currency_code);
    let days = days.unwrap_or(config.chart_days);

    let handle = queries.coin_chart(&id, &currency, days);
    let state = resolve(&handle).await?;
    let prices = state.data.map(|chart| chart.prices).unwrap_or_default();

    let Some(summary) = ChartSummary::from_series(&prices) else {
        println!("No chart data for {}", id);
        return Ok(());
    };

    for (timestamp, price) in &prices {
        println!("{:<8} {}", format_day(*timestamp), format_price(*price, &currency));
    }

    println!();
    println!(
        "{} -> {} ({})",
        format_price(summary.first, &currency),
        format_price(summary.last, &currency),
        format_percentage(summary.change_pct)
    );
    println!(
        "min {}  max {}",
        format_price(summary.min, &currency),
        format_price(summary.max, &currency)
    );
    println!("path {}", ChartLayout::default().line_path(&prices));

    Ok(())
}

/// Print search results
pub async fn run_search(query: String) -> Result<(), Error> {
    let (config, queries) = init_queries()?;

    let handle = queries.search_coins(&query);
    if !handle.is_enabled() {
        println!("Type at least 2 characters to search");
        return Ok(());
    }

    let state = resolve(&handle).await?;
    let coins = state.data.map(|result| result.coins).unwrap_or_default();

    if coins.is_empty() {
        println!("No coins found for \"{}\"", query);
    }

    for coin in coins {
        println!(
            "{:<24} {:<8} {:>18} {:>10}",
            coin.name,
            coin.symbol.to_uppercase(),
            format_price(coin.current_price, &config.search_currency),
            format_percentage(coin.price_change_percentage_24h)
        );
    }

    Ok(())
}
