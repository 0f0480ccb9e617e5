//! Liveness endpoint

use actix_web::{Responder, Scope, get, web};

use crate::model::{common::AppState, response::Result};

use super::model::HealthStatus;

/// GET /health
#[get("")]
pub async fn health(data: web::Data<AppState>) -> impl Responder {
    let configuration = &data.configuration;
    match configuration.mode() {
        Ok(mode) => Result::<()>::http_success(HealthStatus {
            status: "UP",
            timestamp: chrono::Utc::now().to_rfc3339(),
            mode: mode.to_string(),
            namespace: configuration.namespace(),
        }),
        Err(e) => Result::<()>::http_response(
            503,
            mobile_common::error::SERVICE_UNAVAILABLE.code,
            e.to_string(),
            (),
        ),
    }
}

pub fn routes() -> Scope {
    web::scope("/health").service(health)
}
