use actix_web::web;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::handlers::health::health,
        crate::api::handlers::auth::signup,
        crate::api::handlers::auth::verify_signup,
        crate::api::handlers::auth::resend,
        crate::api::handlers::auth::verify_redirect,
        crate::api::handlers::auth::login,
        crate::api::handlers::password::change,
        crate::api::handlers::password::forget_submit,
        crate::api::handlers::password::reset_submit,
        crate::api::handlers::admin::check,
        crate::api::handlers::admin::signup,
        crate::api::handlers::admin::login,
        crate::api::handlers::keys::jwks
    ),
    components(
        schemas(
            crate::api::dto::SignupRequest,
            crate::api::dto::VerifySignupRequest,
            crate::api::dto::ResendRequest,
            crate::api::dto::LoginRequest,
            crate::api::dto::ChangePasswordRequest,
            crate::api::dto::ForgetPasswordRequest,
            crate::api::dto::ResetPasswordRequest,
            crate::api::dto::AdminSignupRequest,
            crate::api::dto::AdminLoginRequest,
            crate::api::dto::SignupResponse,
            crate::api::dto::VerifySignupResponse,
            crate::api::dto::LoginResponse,
            crate::api::dto::UserResponse,
            crate::api::dto::AdminCheckResponse,
            crate::api::dto::MessageResponse,
            crate::api::dto::SuccessResponse,
            crate::api::dto::ErrorResponse,
            crate::db::models::Role
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Signup, verification and login"),
        (name = "password", description = "Password change and reset flows"),
        (name = "admin", description = "HMAC-authenticated admin operations"),
        (name = "keys", description = "Public key publication")
    )
)]
pub struct ApiDoc;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}")
            .url("/api-docs/openapi.json", ApiDoc::openapi())
            .config(utoipa_swagger_ui::Config::new(["/api-docs/openapi.json"])),
    );
}
