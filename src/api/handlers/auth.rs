//! Signup, verification and login handlers

use super::{parse_uuid, remote_ip, require, user_agent};
use crate::api::dto::{
    LoginRequest, LoginResponse, ResendRequest, SignupRequest, SignupResponse, SuccessResponse,
    UserResponse, VerifyQuery, VerifySignupRequest, VerifySignupResponse,
};
use crate::db::models::{now_unix, TargetType};
use crate::domain::auth::service::SignupRequest as SignupCommand;
use crate::domain::verification::signed_token::{self, VerificationTokenData};
use crate::error::{ApiError, Result};
use crate::server::AppState;
use actix_web::http::header;
use actix_web::{web, Either, HttpRequest, HttpResponse};
use tracing::info;

/// Starts a signup by opening a verification for the address.
#[utoipa::path(
    post,
    path = "/auth/signup",
    tag = "auth",
    request_body = SignupRequest,
    responses(
        (status = 200, description = "Verification opened", body = SignupResponse),
        (status = 400, description = "Validation failure", body = crate::api::dto::ErrorResponse),
        (status = 429, description = "Rate limited", body = crate::api::dto::ErrorResponse)
    )
)]
pub async fn signup(
    req: HttpRequest,
    state: web::Data<AppState>,
    form: Either<web::Form<SignupRequest>, web::Json<SignupRequest>>,
) -> Result<HttpResponse> {
    let payload = form.into_inner();
    let full_name = require(&payload.full_name, "fullName")?.to_string();
    let email = require(&payload.email, "email")?.to_string();
    let new_password = require(&payload.new_password, "newPassword")?.to_string();
    if !validator::validate_email(&email) {
        return Err(ApiError::validation(
            "Invalid email address",
            Some(serde_json::json!({ "field": "email" })),
        ));
    }
    let verify_type: TargetType = payload
        .verify_type
        .as_deref()
        .unwrap_or("email")
        .parse()
        .map_err(|_| {
            ApiError::validation(
                "Unknown verifyType",
                Some(serde_json::json!({ "field": "verifyType" })),
            )
        })?;

    let started = state
        .auth
        .signup(SignupCommand {
            full_name,
            email,
            new_password,
            verify_type,
            captcha_token: payload.g_recaptcha_response.unwrap_or_default(),
            remote_ip: remote_ip(&req),
            user_agent: user_agent(&req),
        })
        .await?;

    Ok(HttpResponse::Ok().json(SignupResponse {
        verification_id: started.verification_id,
        expires_at: started.expires_at,
        message: "Verification code sent".to_string(),
    }))
}

/// Completes a signup with the emailed code; the response carries the
/// account's first bearer token. Tokens travel only in the JSON body,
/// never in cookies.
#[utoipa::path(
    post,
    path = "/auth/signup/verify",
    tag = "auth",
    request_body = VerifySignupRequest,
    responses(
        (status = 200, description = "Account created", body = VerifySignupResponse),
        (status = 400, description = "Verification failed", body = crate::api::dto::ErrorResponse),
        (status = 429, description = "Rate limited", body = crate::api::dto::ErrorResponse)
    )
)]
pub async fn verify_signup(
    req: HttpRequest,
    state: web::Data<AppState>,
    form: Either<web::Form<VerifySignupRequest>, web::Json<VerifySignupRequest>>,
) -> Result<HttpResponse> {
    let payload = form.into_inner();
    let verification_id = parse_uuid(
        require(&payload.verification_id, "verificationId")?,
        "verificationId",
    )?;
    let code = require(&payload.code, "code")?;

    let completed = state
        .engine
        .verify(verification_id, code, &remote_ip(&req))
        .await?;
    let (minted, display_name) = state.engine.mint_session(&completed.user).await?;

    Ok(HttpResponse::Ok().json(VerifySignupResponse {
        access_token: minted.token,
        token_type: "Bearer".to_string(),
        user: UserResponse::from_user(&completed.user, &display_name),
    }))
}

/// Re-delivers a fresh code for a pending verification.
#[utoipa::path(
    post,
    path = "/auth/signup/resend",
    tag = "auth",
    request_body = ResendRequest,
    responses(
        (status = 200, description = "Code resent", body = SuccessResponse),
        (status = 400, description = "Validation failure", body = crate::api::dto::ErrorResponse)
    )
)]
pub async fn resend(
    req: HttpRequest,
    state: web::Data<AppState>,
    form: Either<web::Form<ResendRequest>, web::Json<ResendRequest>>,
) -> Result<HttpResponse> {
    let payload = form.into_inner();
    let verification_id = parse_uuid(
        require(&payload.verification_id, "verificationId")?,
        "verificationId",
    )?;

    state.engine.resend(verification_id, &remote_ip(&req)).await?;
    Ok(HttpResponse::Ok().json(SuccessResponse::new("Verification code resent")))
}

/// Link verification: performs the same state transition as the POST
/// endpoint and answers with a redirect either way. No token ever enters
/// a URL.
#[utoipa::path(
    get,
    path = "/auth/verify",
    tag = "auth",
    responses((status = 302, description = "Redirect to the web app"))
)]
pub async fn verify_redirect(
    req: HttpRequest,
    state: web::Data<AppState>,
    query: web::Query<VerifyQuery>,
) -> HttpResponse {
    let web_domain = state.config.web_domain.clone();
    let redirect = |verified: bool| {
        HttpResponse::Found()
            .insert_header((
                header::LOCATION,
                format!("{}/login?verified={}", web_domain, verified),
            ))
            .finish()
    };

    let query = query.into_inner();
    let (Some(raw_id), Some(code)) = (query.verification_id.clone(), query.code.clone()) else {
        return redirect(false);
    };
    let Ok(verification_id) = raw_id.parse() else {
        return redirect(false);
    };
    let ip = remote_ip(&req);

    // Redirects carrying extra parameters are HMAC-signed; check that
    // factor before touching the engine.
    if let (Some(signature), Some(timestamp), Some(raw_uid)) =
        (query.sig.as_deref(), query.ts, query.uid.as_deref())
    {
        let Ok(user_id) = raw_uid.parse() else {
            return redirect(false);
        };
        let data = VerificationTokenData {
            verification_id,
            remote_ip: ip.clone(),
            timestamp,
            user_id,
        };
        if signed_token::validate(
            state.config.hmac_secret.as_bytes(),
            &data,
            signature,
            now_unix(),
        )
        .is_err()
        {
            return redirect(false);
        }
    }

    match state.engine.verify(verification_id, &code, &ip).await {
        Ok(completed) => {
            info!(user_id = %completed.user.object_id, "Link verification completed");
            redirect(true)
        }
        Err(_) => redirect(false),
    }
}

/// Username/password login.
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session minted", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = crate::api::dto::ErrorResponse),
        (status = 429, description = "Rate limited", body = crate::api::dto::ErrorResponse)
    )
)]
pub async fn login(
    state: web::Data<AppState>,
    form: Either<web::Form<LoginRequest>, web::Json<LoginRequest>>,
) -> Result<HttpResponse> {
    let payload = form.into_inner();
    let username = require(&payload.username, "username")?;
    let password = require(&payload.password, "password")?;

    let session = state.auth.login(username, password).await?;

    Ok(HttpResponse::Ok().json(LoginResponse {
        user: UserResponse::from_user(&session.user, &session.display_name),
        access_token: session.access_token,
        token_type: "Bearer".to_string(),
    }))
}
