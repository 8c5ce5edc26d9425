//! Coin endpoints
//!
//! Paginated market list, single coin detail and the price chart.

use actix_web::{get, web, Responder};
use serde::{Deserialize, Serialize};

use super::response::{resolve, QueryResponse};
use crate::{
    chart::{ChartLayout, ChartSummary},
    configuration::{AppState, State},
    error::Error,
    model::MarketChartSeries,
};

/// Provider page size ceiling
const MAX_PER_PAGE: u32 = 250;
const MAX_CHART_DAYS: u32 = 365;

// =============================================================================
// Coin list
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CoinsQuery {
    page: Option<u32>,
    per_page: Option<u32>,
    currency: Option<String>,
}

#[get("/coins")]
pub async fn coins(
    state: web::Data<AppState<State>>,
    query: web::Query<CoinsQuery>,
) -> Result<impl Responder, Error> {
    let page = query.page.unwrap_or(1);
    let per_page = query
        .per_page
        .unwrap_or(state.config.default_page_size)
        .min(MAX_PER_PAGE);
    let currency = state.currency(query.currency.as_deref());

    let handle = state.queries.coins(page, per_page, &currency);
    let data = resolve(&handle).await?;

    Ok(web::Json(QueryResponse::from_state(data, |coins| coins)))
}

// =============================================================================
// Coin detail
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CurrencyQuery {
    currency: Option<String>,
}

#[get("/coins/{id}")]
pub async fn coin(
    state: web::Data<AppState<State>>,
    path: web::Path<String>,
    query: web::Query<CurrencyQuery>,
) -> Result<impl Responder, Error> {
    let currency = state.currency(query.currency.as_deref());

    let handle = state.queries.coin_details(&path, &currency);
    let data = resolve(&handle).await?;

    Ok(web::Json(QueryResponse::from_state(data, |detail| detail)))
}

// =============================================================================
// Chart
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ChartQuery {
    currency: Option<String>,
    days: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct ChartView {
    #[serde(flatten)]
    pub series: MarketChartSeries,
    pub summary: Option<ChartSummary>,
    pub layout: ChartLayout,
    pub line_path: String,
    pub area_path: String,
}

impl From<MarketChartSeries> for ChartView {
    fn from(series: MarketChartSeries) -> Self {
        let layout = ChartLayout::default();

        ChartView {
            summary: ChartSummary::from_series(&series.prices),
            line_path: layout.line_path(&series.prices),
            area_path: layout.area_path(&series.prices),
            layout,
            series,
        }
    }
}

#[get("/coins/{id}/chart")]
pub async fn chart(
    state: web::Data<AppState<State>>,
    path: web::Path<String>,
    query: web::Query<ChartQuery>,
) -> Result<impl Responder, Error> {
    let currency = state.currency(query.currency.as_deref());
    let days = query
        .days
        .unwrap_or(state.config.chart_days)
        .min(MAX_CHART_DAYS);

    let handle = state.queries.coin_chart(&path, &currency, days);
    let data = resolve(&handle).await?;

    Ok(web::Json(QueryResponse::from_state(data, ChartView::from)))
}
