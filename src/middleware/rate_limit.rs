// src/middleware/rate_limit.rs
// DOCUMENTATION: Rate limiting middleware
// PURPOSE: Reject clients that exceed their request budget with 429

use crate::errors::ApiError;
use crate::services::ClientRateLimiter;
use actix_web::body::{EitherBody, MessageBody};
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::middleware::Next;
use actix_web::{web, Error, ResponseError};

pub async fn rate_limit<B: MessageBody>(
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<EitherBody<B>>, Error> {
    let allowed = match (
        req.app_data::<web::Data<ClientRateLimiter>>(),
        req.peer_addr(),
    ) {
        (Some(limiter), Some(peer)) => limiter.check(peer.ip()),
        _ => true,
    };

    if !allowed {
        log::debug!("Rate limit exceeded for {:?}", req.peer_addr());
        let response = ApiError::RateLimitExceeded.error_response();
        return Ok(req.into_response(response).map_into_right_body());
    }

    next.call(req).await.map(ServiceResponse::map_into_left_body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::env::LimiterConfig;
    use actix_web::middleware::from_fn;
    use actix_web::{http::StatusCode, test, App, HttpResponse};
    use std::net::SocketAddr;

    #[actix_web::test]
    async fn test_rejects_after_burst() {
        let limiter = ClientRateLimiter::from_config(&LimiterConfig {
            rps: 1,
            burst: 1,
            enabled: true,
        });
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(limiter))
                .wrap(from_fn(rate_limit))
                .route("/", web::get().to(HttpResponse::Ok)),
        )
        .await;
        let peer: SocketAddr = "10.1.2.3:5000".parse().unwrap();

        let first = test::call_service(&app, test::TestRequest::get().peer_addr(peer).to_request()).await;
        assert_eq!(first.status(), StatusCode::OK);

        let second = test::call_service(&app, test::TestRequest::get().peer_addr(peer).to_request()).await;
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[actix_web::test]
    async fn test_disabled_limiter_passes_through() {
        let limiter = ClientRateLimiter::from_config(&LimiterConfig {
            rps: 1,
            burst: 1,
            enabled: false,
        });
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(limiter))
                .wrap(from_fn(rate_limit))
                .route("/", web::get().to(HttpResponse::Ok)),
        )
        .await;
        let peer: SocketAddr = "10.1.2.3:5000".parse().unwrap();

        for _ in 0..5 {
            let res = test::call_service(&app, test::TestRequest::get().peer_addr(peer).to_request()).await;
            assert_eq!(res.status(), StatusCode::OK);
        }
    }
}
