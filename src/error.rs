use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use anyhow::Error as ANYHOW_ERROR;
use reqwest::header::{
    InvalidHeaderName as INVALID_HEADER_NAME,
    InvalidHeaderValue as INVALID_HEADER_VALUE,
};
use reqwest::Error as REQWEST_ERROR;
use serde_json::Error as JSON_ERROR;
use std::{
    env::VarError, io::Error as IO_ERROR, num::ParseIntError,
    str::ParseBoolError as PARSE_BOOL_ERROR,
};
use thiserror::Error;
use tokio::task::JoinError;
use tracing::subscriber::SetGlobalDefaultError as TRACING_GLOBAL_DEFAULT_ERROR;
use url::ParseError as URL_ERROR;

/// Failure of a call to the market-data provider.
///
/// This is what query cache entries store, so it is `Clone` and carries
/// only owned strings.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API request failed: {status} {status_text}")]
    Transport { status: u16, status_text: String },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Transport { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Network failures, 5xx and 429 are worth another attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Network(_) => true,
            ApiError::Transport { status, .. } => {
                *status >= 500 || *status == 429
            },
            ApiError::Decode(_) | ApiError::Validation(_) => false,
        }
    }
}

impl From<REQWEST_ERROR> for ApiError {
    fn from(error: REQWEST_ERROR) -> Self {
        if error.is_decode() {
            return ApiError::Decode(error.to_string());
        }

        match error.status() {
            Some(status) => ApiError::Transport {
                status: status.as_u16(),
                status_text: status
                    .canonical_reason()
                    .unwrap_or_default()
                    .to_owned(),
            },
            None => ApiError::Network(error.to_string()),
        }
    }
}

impl From<JSON_ERROR> for ApiError {
    fn from(error: JSON_ERROR) -> Self {
        ApiError::Decode(error.to_string())
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Io(#[from] IO_ERROR),

    #[error("{0}")]
    URL(#[from] URL_ERROR),

    #[error("{0}")]
    INT(#[from] ParseIntError),

    #[error("{0}")]
    VAR(#[from] VarError),

    #[error("{0}")]
    TokioJoinError(#[from] JoinError),

    #[error("{0}")]
    ParseBoolError(#[from] PARSE_BOOL_ERROR),

    #[error("{0}")]
    JsonError(#[from] JSON_ERROR),

    #[error("{0}")]
    ReqwestError(#[from] REQWEST_ERROR),

    #[error("{0}")]
    InvalidHeaderValue(#[from] INVALID_HEADER_VALUE),

    #[error("{0}")]
    InvalidHeaderName(#[from] INVALID_HEADER_NAME),

    #[error("{0}")]
    Api(#[from] ApiError),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Invalid option: {option}")]
    InvalidOption { option: String },

    #[error("Tracing error: {0}")]
    SetGlobalDefaultError(#[from] TRACING_GLOBAL_DEFAULT_ERROR),

    #[error("{0}")]
    AnyHowError(#[from] ANYHOW_ERROR),
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request - client sent invalid input
            Error::Api(ApiError::Validation(_))
            | Error::InvalidOption { .. }
            | Error::ParseBoolError(_)
            | Error::INT(_) => StatusCode::BAD_REQUEST,

            // 404 Not Found - provider does not know the coin
            Error::Api(ApiError::Transport { status: 404, .. }) => {
                StatusCode::NOT_FOUND
            },

            // 429 Too Many Requests - provider rate limit
            Error::Api(ApiError::Transport { status: 429, .. }) => {
                StatusCode::TOO_MANY_REQUESTS
            },

            // 502 Bad Gateway - upstream service error
            Error::Api(_) | Error::ReqwestError(_) => StatusCode::BAD_GATEWAY,

            // 500 Internal Server Error - everything else
            Error::Io(_)
            | Error::URL(_)
            | Error::VAR(_)
            | Error::TokioJoinError(_)
            | Error::JsonError(_)
            | Error::InvalidHeaderValue(_)
            | Error::InvalidHeaderName(_)
            | Error::ConfigurationError(_)
            | Error::SetGlobalDefaultError(_)
            | Error::AnyHowError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let body = serde_json::json!({
            "error": status.canonical_reason().unwrap_or("Unknown"),
            "message": self.to_string(),
            "status": status.as_u16(),
        });
        HttpResponse::build(status).json(body)
    }
}
