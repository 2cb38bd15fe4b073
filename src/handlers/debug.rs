// src/handlers/debug.rs
// DOCUMENTATION: Diagnostics endpoint
// PURPOSE: Expose live diagnostic accessors to operators

use crate::services::Diagnostics;
use actix_web::{web, HttpResponse, Responder};

/// GET /debug/vars
/// Every accessor is evaluated at request time
pub async fn vars(diagnostics: web::Data<Diagnostics>) -> impl Responder {
    HttpResponse::Ok().json(diagnostics.snapshot())
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/debug/vars", web::get().to(vars));
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, App};
    use serde_json::json;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    #[actix_web::test]
    async fn test_vars_are_live() {
        let diagnostics = Diagnostics::new();
        let counter = Arc::new(AtomicU64::new(1));
        let live = counter.clone();
        diagnostics.publish("requests", move || json!(live.load(Ordering::SeqCst)));
        diagnostics.publish("version", || json!("1.0.0"));

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(diagnostics))
                .configure(super::config),
        )
        .await;

        let req = test::TestRequest::get().uri("/debug/vars").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, json!({ "requests": 1, "version": "1.0.0" }));

        counter.store(5, Ordering::SeqCst);

        let req = test::TestRequest::get().uri("/debug/vars").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["requests"], 5);
    }
}
