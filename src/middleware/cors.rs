// src/middleware/cors.rs
// DOCUMENTATION: Cross-origin response headers
// PURPOSE: Allow browsers on trusted origins to read API responses

use crate::config::Config;
use actix_web::body::MessageBody;
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::http::header::{self, HeaderValue};
use actix_web::middleware::Next;
use actix_web::{web, Error};

pub async fn enable_cors<B: MessageBody>(
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<B>, Error> {
    let allow_origin = match (
        req.app_data::<web::Data<Config>>(),
        req.headers()
            .get(header::ORIGIN)
            .and_then(|value| value.to_str().ok()),
    ) {
        (Some(config), Some(_)) if config.trusted_origins.allows_any() => {
            Some(HeaderValue::from_static("*"))
        }
        (Some(config), Some(origin)) if config.trusted_origins.allows(origin) => {
            HeaderValue::from_str(origin).ok()
        }
        _ => None,
    };

    let mut res = next.call(req).await?;

    // Responses differ per Origin, so caches must key on it
    res.headers_mut()
        .append(header::VARY, HeaderValue::from_static("Origin"));
    if let Some(value) = allow_origin {
        res.headers_mut()
            .insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
    }

    Ok(res)
}
