//! Admin handlers
//!
//! All routes here sit behind the HMAC pipeline; the `UserContext` comes
//! from the signed headers, not from a bearer token.

use super::require;
use crate::api::dto::{
    AdminCheckResponse, AdminLoginRequest, AdminSignupRequest, LoginResponse, UserResponse,
};
use crate::api::middleware::AuthenticatedUser;
use crate::db::models::Role;
use crate::error::{ApiError, Result};
use crate::server::AppState;
use actix_web::{web, Either, HttpResponse};
use validator::Validate;

/// Whether the calling UID names a live admin account.
#[utoipa::path(
    post,
    path = "/auth/admin/check",
    tag = "admin",
    responses(
        (status = 200, description = "Role probe result", body = AdminCheckResponse),
        (status = 401, description = "Invalid signature", body = crate::api::dto::ErrorResponse)
    )
)]
pub async fn check(auth: AuthenticatedUser, state: web::Data<AppState>) -> Result<HttpResponse> {
    let admin = state.auth.admin_check(auth.user_id()).await?;
    Ok(HttpResponse::Ok().json(AdminCheckResponse { admin }))
}

/// Creates a pre-verified account, bypassing the verification flow.
#[utoipa::path(
    post,
    path = "/auth/admin/signup",
    tag = "admin",
    request_body = AdminSignupRequest,
    responses(
        (status = 201, description = "Account created", body = UserResponse),
        (status = 409, description = "Username exists", body = crate::api::dto::ErrorResponse)
    )
)]
pub async fn signup(
    state: web::Data<AppState>,
    form: Either<web::Form<AdminSignupRequest>, web::Json<AdminSignupRequest>>,
) -> Result<HttpResponse> {
    let payload = form.into_inner();
    let username = require(&payload.username, "username")?.to_string();
    let password = require(&payload.password, "password")?.to_string();
    let email = payload
        .email
        .clone()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| username.clone());
    let role: Role = payload
        .role
        .as_deref()
        .unwrap_or("admin")
        .parse()
        .map_err(|_| {
            ApiError::validation(
                "Unknown role",
                Some(serde_json::json!({ "field": "role" })),
            )
        })?;

    let user = state
        .auth
        .admin_signup(&username, &email, &password, role)
        .await?;
    Ok(HttpResponse::Created().json(UserResponse::from_user(&user, &user.username)))
}

/// Login restricted to admin accounts.
#[utoipa::path(
    post,
    path = "/auth/admin/login",
    tag = "admin",
    request_body = AdminLoginRequest,
    responses(
        (status = 200, description = "Session minted", body = LoginResponse),
        (status = 403, description = "Not an admin", body = crate::api::dto::ErrorResponse)
    )
)]
pub async fn login(
    state: web::Data<AppState>,
    form: Either<web::Form<AdminLoginRequest>, web::Json<AdminLoginRequest>>,
) -> Result<HttpResponse> {
    let payload = form.into_inner();
    let email = require(&payload.email, "email")?.to_string();
    let password = require(&payload.password, "password")?.to_string();
    payload.validate().map_err(|e| {
        ApiError::validation(
            "Invalid email address",
            Some(serde_json::json!({ "errors": e.to_string() })),
        )
    })?;

    let session = state.auth.admin_login(&email, &password).await?;
    Ok(HttpResponse::Ok().json(LoginResponse {
        user: UserResponse::from_user(&session.user, &session.display_name),
        access_token: session.access_token,
        token_type: "Bearer".to_string(),
    }))
}
