use std::io::Error as IoError;

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;
use webring::schedule::ScheduleError;
use webring::validation::ValidationError;
use webring::{MemberId, RingError, StoreError};

use crate::config;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0:#}")]
    Io(#[from] IoError),
    #[error("Address parsing error: {0}")]
    AddrParse(#[from] std::net::AddrParseError),
    #[error("Configuration error: {0}")]
    Config(#[from] config::Error),
    #[error("Schedule error: {0}")]
    Schedule(#[from] ScheduleError),
    #[error("Check run failed: {0}")]
    Ring(#[from] RingError),
    #[error("Startup failed: {0:#}")]
    Startup(#[from] anyhow::Error),
}

/// Errors surfaced by HTTP handlers, rendered as `{"error": "..."}`
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Missing or invalid API token")]
    Unauthorized,
    #[error("No member with id {0}")]
    MemberNotFound(MemberId),
    #[error("No member with domain {0}")]
    DomainNotFound(String),
    #[error("Missing query parameter '{0}'")]
    MissingParameter(&'static str),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Ring(#[from] RingError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::MemberNotFound(_) | ApiError::DomainNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MissingParameter(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Ring(RingError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Ring(RingError::EmptyRing) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Ring(RingError::RunInProgress) => StatusCode::CONFLICT,
            ApiError::Ring(RingError::Store(e)) | ApiError::Store(e) => store_status(e),
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }

        let mut response = HttpResponse::build(status);
        if status == StatusCode::UNAUTHORIZED {
            response.insert_header(("WWW-Authenticate", "Bearer"));
        }
        response.json(json!({ "error": self.to_string() }))
    }
}

fn store_status(error: &StoreError) -> StatusCode {
    match error {
        StoreError::Conflict { .. } => StatusCode::CONFLICT,
        StoreError::NotFound => StatusCode::NOT_FOUND,
        StoreError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
