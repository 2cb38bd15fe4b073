// src/handlers/mod.rs
// DOCUMENTATION: Handlers module organization
// PURPOSE: Re-export handler components

pub mod debug;
pub mod health;

use crate::errors::ApiError;
use actix_web::HttpRequest;

pub use debug::config as debug_config;
pub use health::config as health_config;

/// Fallback for unmatched routes
pub async fn not_found(req: HttpRequest) -> Result<actix_web::HttpResponse, ApiError> {
    Err(ApiError::NotFound(req.path().to_string()))
}
