use std::{env, fs, io::ErrorKind, ops::Deref, sync::Arc};

use anyhow::Context as _;
use url::Url;

use crate::{
    error::{ApiError, Error},
    helpers::parse_list,
    provider::HTTP,
    queries::MarketQueries,
};

#[derive(Debug)]
pub struct AppState<T>(Arc<T>);

impl<T> AppState<T> {
    pub fn new(state: T) -> AppState<T> {
        AppState(Arc::new(state))
    }
}

impl<T> Clone for AppState<T> {
    fn clone(&self) -> AppState<T> {
        AppState(Arc::clone(&self.0))
    }
}

impl<T> Deref for AppState<T> {
    type Target = Arc<T>;

    fn deref(&self) -> &Arc<T> {
        &self.0
    }
}

#[derive(Debug)]
pub struct State {
    pub config: Config,
    pub queries: MarketQueries,
}

impl State {
    pub fn new(config: Config) -> Result<State, Error> {
        let http = HTTP::new(config.clone())?;
        let queries = MarketQueries::new(http);

        Ok(Self { config, queries })
    }

    /// Currency from a request, falling back to the configured default.
    pub fn currency(&self, currency: Option<&str>) -> String {
        currency
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(self.config.default_currency.as_str())
            .to_lowercase()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: Url,
    pub api_key: Option<String>,
    pub api_key_header: String,
    pub timeout: u64,
    pub server_host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub static_dir: Option<String>,
    pub default_currency: String,
    pub search_currency: String,
    pub default_page_size: u32,
    pub chart_days: u32,
    pub cache_sweep_interval: u64,
    pub prefetch_on_start: bool,
}

impl Config {
    pub fn get_coins_markets_url(
        &self,
        page: u32,
        per_page: u32,
        currency: &str,
    ) -> Result<Url, ApiError> {
        self.get_url(
            &["coins", "markets"],
            &[
                ("vs_currency", currency.to_owned()),
                ("order", String::from("market_cap_desc")),
                ("per_page", per_page.to_string()),
                ("page", page.to_string()),
                ("sparkline", String::from("false")),
                ("price_change_percentage", String::from("24h")),
            ],
        )
    }

    pub fn get_coins_markets_by_ids_url(
        &self,
        ids: &[String],
        currency: &str,
    ) -> Result<Url, ApiError> {
        self.get_url(
            &["coins", "markets"],
            &[
                ("vs_currency", currency.to_owned()),
                ("ids", ids.join(",")),
                ("order", String::from("market_cap_desc")),
                ("sparkline", String::from("false")),
                ("price_change_percentage", String::from("24h")),
            ],
        )
    }

    pub fn get_coin_info_url(&self, id: &str) -> Result<Url, ApiError> {
        self.get_url(
            &["coins", id],
            &[
                ("localization", String::from("false")),
                ("tickers", String::from("false")),
                ("market_data", String::from("true")),
                ("community_data", String::from("false")),
                ("developer_data", String::from("false")),
                ("sparkline", String::from("false")),
            ],
        )
    }

    pub fn get_market_chart_url(
        &self,
        id: &str,
        currency: &str,
        days: u32,
    ) -> Result<Url, ApiError> {
        self.get_url(
            &["coins", id, "market_chart"],
            &[
                ("vs_currency", currency.to_owned()),
                ("days", days.to_string()),
                ("interval", String::from("daily")),
            ],
        )
    }

    pub fn get_search_url(&self, query: &str) -> Result<Url, ApiError> {
        self.get_url(&["search"], &[("query", query.to_owned())])
    }

    fn get_url(
        &self,
        segments: &[&str],
        params: &[(&str, String)],
    ) -> Result<Url, ApiError> {
        let mut url = self.api_url.clone();

        url.path_segments_mut()
            .map_err(|_| {
                ApiError::Validation(format!(
                    "{} cannot be used as a base URL",
                    self.api_url
                ))
            })?
            .pop_if_empty()
            .extend(segments);

        if !params.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())));
        }

        Ok(url)
    }

    #[cfg(test)]
    pub fn with_api_url(api_url: &str) -> Config {
        Config {
            api_url: Url::parse(api_url).unwrap(),
            api_key: None,
            api_key_header: String::from("x-cg-demo-api-key"),
            timeout: 5,
            server_host: String::from("127.0.0.1"),
            port: 8080,
            allowed_origins: vec![],
            static_dir: None,
            default_currency: String::from("brl"),
            search_currency: String::from("usd"),
            default_page_size: 20,
            chart_days: 7,
            cache_sweep_interval: 60,
            prefetch_on_start: false,
        }
    }
}

pub fn get_configuration() -> Result<Config, Error> {
    let api_url = env::var("API_URL")?;
    let api_url = Url::parse(&api_url)
        .with_context(|| format!("API_URL is not a valid URL: {}", api_url))?;

    if api_url.cannot_be_a_base() {
        return Err(Error::ConfigurationError(format!(
            "API_URL cannot be used as a base URL: {}",
            api_url
        )));
    }

    let api_key = env::var("API_KEY")
        .ok()
        .map(|key| key.trim().to_owned())
        .filter(|key| !key.is_empty());
    let api_key_header = env::var("API_KEY_HEADER")?;
    let timeout = env::var("TIMEOUT")?.parse()?;

    let server_host = env::var("SERVER_HOST")?;
    let port: u16 = env::var("PORT")?.parse()?;
    let allowed_origins = parse_list(&env::var("ALLOWED_ORIGINS")?);
    let static_dir = env::var("STATIC_DIRECTORY")
        .ok()
        .filter(|dir| !dir.trim().is_empty())
        .map(|dir| format!("{}/{}", env!("CARGO_MANIFEST_DIR"), dir.trim()));

    let default_currency = env::var("DEFAULT_CURRENCY")?.to_lowercase();
    let search_currency = env::var("SEARCH_CURRENCY")?.to_lowercase();
    let default_page_size = env::var("DEFAULT_PAGE_SIZE")?.parse()?;
    let chart_days = env::var("CHART_DAYS")?.parse()?;
    let cache_sweep_interval =
        env::var("CACHE_SWEEP_INTERVAL_IN_SEC")?.parse()?;
    let prefetch_on_start = env::var("PREFETCH_ON_START")?.parse()?;

    let config = Config {
        api_url,
        api_key,
        api_key_header,
        timeout,
        server_host,
        port,
        allowed_origins,
        static_dir,
        default_currency,
        search_currency,
        default_page_size,
        chart_days,
        cache_sweep_interval,
        prefetch_on_start,
    };

    Ok(config)
}

/// Loads `.env` (optional, secrets) and `coinboard.conf` into the process
/// environment. Variables already set in the environment win.
pub fn set_configuration() -> Result<(), Error> {
    let config_file: &str = ".env";
    let app_config_file: &str = "coinboard.conf";

    let directory = env!("CARGO_MANIFEST_DIR");
    let path = format!("{}/{}", directory, config_file);
    let app_config_path = format!("{}/{}", directory, app_config_file);

    match fs::read_to_string(path) {
        Ok(config_string) => set_env(&config_string),
        Err(e) if e.kind() == ErrorKind::NotFound => {},
        Err(e) => return Err(e.into()),
    }

    let app_config_string = fs::read_to_string(app_config_path)?;
    set_env(&app_config_string);

    Ok(())
}

fn set_env(config: &str) {
    for (key, value) in parse_config_string(config) {
        if env::var_os(key).is_none() {
            env::set_var(key, value);
        }
    }
}

fn parse_config_string(config: &str) -> Vec<(&str, &str)> {
    config
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let (key, value) = line.split_at(line.find('=')?);
            Some((key.trim(), value[1..].trim()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config_string() {
        let params = parse_config_string(
            "# provider\nAPI_URL=https://api.coingecko.com/api/v3\n\n\
             API_KEY=\nALLOWED_ORIGINS=http://a,http://b\r\nbroken line\n",
        );

        assert_eq!(
            params,
            vec![
                ("API_URL", "https://api.coingecko.com/api/v3"),
                ("API_KEY", ""),
                ("ALLOWED_ORIGINS", "http://a,http://b"),
            ]
        );
    }

    #[test]
    fn test_endpoint_urls() {
        let config = Config::with_api_url("https://api.coingecko.com/api/v3");

        let url = config.get_coins_markets_url(2, 20, "brl").unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.coingecko.com/api/v3/coins/markets?vs_currency=brl\
             &order=market_cap_desc&per_page=20&page=2&sparkline=false\
             &price_change_percentage=24h"
        );

        let url = config.get_market_chart_url("bitcoin", "usd", 7).unwrap();
        assert_eq!(url.path(), "/api/v3/coins/bitcoin/market_chart");
        assert_eq!(url.query(), Some("vs_currency=usd&days=7&interval=daily"));

        let url = config.get_search_url("shiba inu").unwrap();
        assert_eq!(url.query(), Some("query=shiba+inu"));
    }

    #[test]
    fn test_trailing_slash_and_id_encoding() {
        let config = Config::with_api_url("https://api.coingecko.com/api/v3/");
        let url = config.get_coin_info_url("a/b").unwrap();
        assert_eq!(url.path(), "/api/v3/coins/a%2Fb");
    }

    #[test]
    fn test_ids_are_joined() {
        let config = Config::with_api_url("http://localhost:1234");
        let ids = vec![String::from("dogecoin"), String::from("baby-doge")];
        let url = config.get_coins_markets_by_ids_url(&ids, "usd").unwrap();

        assert_eq!(url.path(), "/coins/markets");
        assert!(url
            .query_pairs()
            .any(|(k, v)| k == "ids" && v == "dogecoin,baby-doge"));
    }
}
