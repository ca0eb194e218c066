//! Public key publication

use crate::domain::auth::jwks::jwks_document;
use crate::server::AppState;
use actix_web::{web, HttpResponse};

/// JWKS document for bearer-token verification. Stable `kid`s; two
/// entries while a key rotation is in flight.
#[utoipa::path(
    get,
    path = "/auth/.well-known/jwks.json",
    tag = "keys",
    responses((status = 200, description = "JSON Web Key Set"))
)]
pub async fn jwks(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(jwks_document(&state.keys))
}
