//! Authentication request and response payloads
//!
//! Requests arrive as `application/x-www-form-urlencoded` or JSON with
//! camelCase field names. Required-field presence is checked in the
//! handlers (so the error body carries `MISSING_REQUIRED_FIELD` with the
//! field name) which is why the request fields are `Option`s here.

use crate::db::models::{Role, UserAuth};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

/// Signup form payload
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub new_password: Option<String>,
    pub response_type: Option<String>,
    /// `email` (default) or `phone`.
    pub verify_type: Option<String>,
    #[serde(rename = "g-recaptcha-response")]
    pub g_recaptcha_response: Option<String>,
}

/// Code verification payload
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifySignupRequest {
    pub code: Option<String>,
    pub verification_id: Option<String>,
    pub response_type: Option<String>,
}

/// Code resend payload
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResendRequest {
    pub verification_id: Option<String>,
}

/// Query parameters of the verification redirect link
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct VerifyQuery {
    pub verification_id: Option<String>,
    pub code: Option<String>,
    /// Optional HMAC-signed second factor carried by redirects.
    pub sig: Option<String>,
    pub ts: Option<i64>,
    pub uid: Option<String>,
}

/// Login payload
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub response_type: Option<String>,
}

/// Password change payload (bearer-authenticated)
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
    pub confirm_password: Option<String>,
}

/// Password forget payload
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ForgetPasswordRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: Option<String>,
}

/// Password reset form payload; the reset secret rides in the path.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub new_password: Option<String>,
    pub confirm_password: Option<String>,
}

/// Admin signup payload (HMAC-authenticated)
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminSignupRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    /// Defaults to `admin`.
    pub role: Option<String>,
}

/// Admin login payload (HMAC-authenticated)
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminLoginRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Account shape returned to clients. The bcrypt hash never leaves the
/// store.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub display_name: String,
    pub social_name: String,
    pub role: Role,
    pub email_verified: bool,
    pub phone_verified: bool,
    pub created_date: i64,
}

impl UserResponse {
    pub fn from_user(user: &UserAuth, display_name: &str) -> Self {
        Self {
            id: user.object_id,
            username: user.username.clone(),
            display_name: display_name.to_string(),
            social_name: crate::db::models::derive_social_name(display_name, user.object_id),
            role: user.role,
            email_verified: user.email_verified,
            phone_verified: user.phone_verified,
            created_date: user.created_date,
        }
    }
}

/// Signup acknowledgement: no secrets, no token.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignupResponse {
    pub verification_id: Uuid,
    pub expires_at: i64,
    pub message: String,
}

/// Successful verification: the first bearer token of the account.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifySignupResponse {
    pub access_token: String,
    pub token_type: String,
    pub user: UserResponse,
}

/// Successful login.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: UserResponse,
    pub access_token: String,
    pub token_type: String,
}

/// Admin role probe result.
#[derive(Debug, Serialize, ToSchema)]
pub struct AdminCheckResponse {
    pub admin: bool,
}
