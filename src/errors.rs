// src/errors.rs
// DOCUMENTATION: Error families for startup, background work, and HTTP
// PURPOSE: Keep fatal and recoverable failures apart at the type level

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

/// Fatal errors raised before the service reaches `Serving`
/// DOCUMENTATION: Any of these terminates the process with exit code 1
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("connectivity error: {0}")]
    Connectivity(String),

    #[error("failed to bind listener on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

/// Failure inside tracked background work
/// DOCUMENTATION: Logged by the tracker and never propagated.
/// There is deliberately no `From<StartupError>`, so `?` cannot carry a
/// startup failure out of a background task.
#[derive(Error, Debug)]
pub enum BackgroundTaskError {
    #[error("background task failed: {0}")]
    Failed(#[from] anyhow::Error),

    #[error("background task panicked: {0}")]
    Panicked(String),
}

/// Drain grace period elapsed with work still outstanding
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("shutdown grace period of {grace:?} elapsed with {outstanding} background task(s) outstanding")]
pub struct ShutdownTimeout {
    pub outstanding: usize,
    pub grace: Duration,
}

/// Errors returned by HTTP handlers and middleware
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Internal server error")]
    #[allow(dead_code)]
    InternalError,
}

impl ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse {
        let error_code = match self {
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            ApiError::InternalError => "INTERNAL_ERROR",
        };

        let body = json!({
            "error": {
                "code": error_code,
                "message": self.to_string(),
                "timestamp": chrono::Utc::now().to_rfc3339()
            }
        });

        HttpResponse::build(self.status_code()).json(body)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            ApiError::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
