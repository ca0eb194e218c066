//! Liveness endpoint

use actix_web::HttpResponse;
use serde_json::json;

#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses((status = 200, description = "Service is up"))
)]
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "name": crate::NAME,
        "version": crate::VERSION,
    }))
}
