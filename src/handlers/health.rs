// src/handlers/health.rs
// DOCUMENTATION: Health check handler
// PURPOSE: Report availability, environment and version

use crate::config::Config;
use actix_web::{web, HttpResponse, Responder};
use serde_json::json;

pub async fn healthcheck(config: web::Data<Config>) -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "available",
        "system_info": {
            "environment": config.environment.to_string(),
            "version": env!("CARGO_PKG_VERSION")
        }
    }))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/v1/healthcheck", web::get().to(healthcheck));
}
