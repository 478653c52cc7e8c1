//! HTTP handler functions for the GeoMetrics API.

pub mod map;
pub mod reports;
pub mod saved_lots;
pub mod users;

use actix_web::HttpResponse;
use geometrics_server_models::ApiHealth;

/// `GET /health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
