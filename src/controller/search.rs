use actix_web::{get, web, Responder};
use serde::Deserialize;

use super::response::{resolve, QueryResponse};
use crate::{
    configuration::{AppState, State},
    error::{ApiError, Error},
    provider::{is_searchable, MIN_SEARCH_LENGTH},
};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    query: String,
}

#[get("/search")]
pub async fn index(
    state: web::Data<AppState<State>>,
    query: web::Query<SearchQuery>,
) -> Result<impl Responder, Error> {
    if !is_searchable(&query.query) {
        return Err(Error::Api(ApiError::Validation(format!(
            "search query must have at least {} characters",
            MIN_SEARCH_LENGTH
        ))));
    }

    let handle = state.queries.search_coins(&query.query);
    let data = resolve(&handle).await?;

    Ok(web::Json(QueryResponse::from_state(data, |result| result)))
}
