use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

pub type Result<T> = std::result::Result<T, ScrapeError>;

/// Failure of the single search engine call. Always fatal for the request.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("search request failed: {0}")]
    Network(String),

    #[error("search engine responded with status {status}")]
    Status { status: u16 },

    #[error("invalid search url: {0}")]
    InvalidUrl(String),
}

impl From<reqwest::Error> for HarvestError {
    fn from(err: reqwest::Error) -> Self {
        HarvestError::Network(err.to_string())
    }
}

/// Request-level failures. Per-URL render and extraction problems never end
/// up here; they are folded into the individual `ContentRecord`s.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Harvest(#[from] HarvestError),

    #[error("failed to launch browser: {0}")]
    BrowserLaunch(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ScrapeError {
    pub fn status(&self) -> StatusCode {
        match self {
            ScrapeError::Validation(_) => StatusCode::BAD_REQUEST,
            ScrapeError::Harvest(_) | ScrapeError::BrowserLaunch(_) | ScrapeError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for ScrapeError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("scrape failed: {}", self);
        }
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_is_client_error() {
        let err = ScrapeError::Validation("tema is required".into());
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "tema is required");
    }

    #[test]
    fn harvest_failure_is_server_error() {
        let err: ScrapeError = HarvestError::Status { status: 503 }.into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.to_string().contains("503"));
    }
}
