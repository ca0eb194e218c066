//! Password change, forget and reset handlers

use super::require;
use crate::api::dto::{
    ChangePasswordRequest, ForgetPasswordRequest, MessageResponse, ResetPasswordRequest,
};
use crate::api::middleware::AuthenticatedUser;
use crate::api::pages;
use crate::error::{ApiError, Result};
use crate::server::AppState;
use actix_web::{web, Either, HttpResponse};
use validator::Validate;

/// Changes the password of the bearer-authenticated account.
#[utoipa::path(
    put,
    path = "/auth/password/change",
    tag = "password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 401, description = "Not authenticated", body = crate::api::dto::ErrorResponse)
    )
)]
pub async fn change(
    auth: AuthenticatedUser,
    state: web::Data<AppState>,
    form: Either<web::Form<ChangePasswordRequest>, web::Json<ChangePasswordRequest>>,
) -> Result<HttpResponse> {
    let payload = form.into_inner();
    let current = require(&payload.current_password, "currentPassword")?;
    let new = require(&payload.new_password, "newPassword")?;
    let confirm = require(&payload.confirm_password, "confirmPassword")?;

    state
        .auth
        .change_password(auth.user_id(), current, new, confirm)
        .await?;
    Ok(HttpResponse::Ok().json(MessageResponse::new("Password changed successfully")))
}

/// Self-contained HTML form for requesting a reset link.
pub async fn forget_page() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(pages::forget_password_page())
}

/// Opens a reset window. The response is identical whether or not the
/// address has an account.
#[utoipa::path(
    post,
    path = "/auth/password/forget",
    tag = "password",
    request_body = ForgetPasswordRequest,
    responses(
        (status = 200, description = "Generic acknowledgement", body = MessageResponse),
        (status = 500, description = "Mail transport failure", body = crate::api::dto::ErrorResponse)
    )
)]
pub async fn forget_submit(
    state: web::Data<AppState>,
    form: Either<web::Form<ForgetPasswordRequest>, web::Json<ForgetPasswordRequest>>,
) -> Result<HttpResponse> {
    let payload = form.into_inner();
    let email = require(&payload.email, "email")?.to_string();
    payload.validate().map_err(|e| {
        ApiError::validation(
            "Invalid email address",
            Some(serde_json::json!({ "errors": e.to_string() })),
        )
    })?;

    state.auth.forget_password(&email).await?;
    Ok(HttpResponse::Ok().json(MessageResponse::new(
        "If the account exists, a reset link has been sent",
    )))
}

/// Self-contained HTML form for submitting a new password.
pub async fn reset_page(path: web::Path<String>) -> HttpResponse {
    let verify_id = path.into_inner();
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(pages::reset_password_page(&verify_id))
}

/// Completes a reset with the secret from the emailed link.
#[utoipa::path(
    post,
    path = "/auth/password/reset/{verify_id}",
    tag = "password",
    request_body = ResetPasswordRequest,
    params(("verify_id" = String, Path, description = "Plaintext reset secret from the email link")),
    responses(
        (status = 200, description = "Password reset", body = MessageResponse),
        (status = 400, description = "Invalid or used token", body = crate::api::dto::ErrorResponse)
    )
)]
pub async fn reset_submit(
    state: web::Data<AppState>,
    path: web::Path<String>,
    form: Either<web::Form<ResetPasswordRequest>, web::Json<ResetPasswordRequest>>,
) -> Result<HttpResponse> {
    let plaintext_token = path.into_inner();
    let payload = form.into_inner();
    let new = require(&payload.new_password, "newPassword")?;
    let confirm = require(&payload.confirm_password, "confirmPassword")?;

    state
        .auth
        .reset_password(&plaintext_token, new, confirm)
        .await?;
    Ok(HttpResponse::Ok().json(MessageResponse::new("Password reset successfully")))
}
