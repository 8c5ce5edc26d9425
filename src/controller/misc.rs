//! Service endpoints
//!
//! Build version and query cache statistics.

use actix_web::{get, web, Responder};
use serde::{Deserialize, Serialize};

use crate::{
    configuration::{AppState, State},
    error::Error,
};

// =============================================================================
// Version
// =============================================================================

#[get("/version")]
pub async fn version() -> Result<impl Responder, Error> {
    const VERSION: Option<&str> = option_env!("CARGO_PKG_VERSION");

    Ok(web::Json(VersionResponse { version: VERSION }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VersionResponse<'a> {
    pub version: Option<&'a str>,
}

// =============================================================================
// Cache
// =============================================================================

#[get("/cache")]
pub async fn cache(
    state: web::Data<AppState<State>>,
) -> Result<impl Responder, Error> {
    Ok(web::Json(state.queries.stats()))
}
