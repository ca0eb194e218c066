//! Route table
//!
//! Everything lives under the `/auth` scope. Each route group is wrapped
//! with its action's rate limiter; user routes add the bearer pipeline
//! and admin routes the HMAC pipeline. Wraps registered later run
//! earlier, so authentication sits outside the limiter and the limiter
//! can key by user id.

use super::handlers;
use super::middleware::{ActionRateLimit, BearerAuth, HmacAuth};
use crate::domain::rate_limit::{Action, Quota};
use crate::server::AppState;
use actix_web::web;
use std::sync::Arc;
use std::time::Duration;

pub fn configure(cfg: &mut web::ServiceConfig, state: &AppState) {
    let window = Duration::from_secs(state.config.rate_limit_window_secs);
    let signup_quota = Quota::new(state.config.signup_rate_limit, window);
    let login_quota = Quota::new(state.config.login_rate_limit, window);
    let verification_quota = Quota::new(
        state.config.verification_ip_limit,
        Duration::from_secs(state.config.verification_ip_window_secs),
    );
    let reset_quota = Quota::new(state.config.password_reset_rate_limit, window);

    let limiter = |action: Action, quota: Quota| {
        ActionRateLimit::new(Arc::clone(&state.limiter), action, quota)
    };

    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/signup")
                    .wrap(limiter(Action::Signup, signup_quota))
                    .route(web::post().to(handlers::auth::signup)),
            )
            .service(
                web::resource("/signup/verify")
                    .wrap(limiter(Action::Verification, verification_quota))
                    .route(web::post().to(handlers::auth::verify_signup)),
            )
            .service(
                web::resource("/signup/resend")
                    .wrap(limiter(Action::Verification, verification_quota))
                    .route(web::post().to(handlers::auth::resend)),
            )
            .service(
                web::resource("/verify")
                    .wrap(limiter(Action::Verification, verification_quota))
                    .route(web::get().to(handlers::auth::verify_redirect)),
            )
            .service(
                web::resource("/login")
                    .wrap(limiter(Action::Login, login_quota))
                    .route(web::post().to(handlers::auth::login)),
            )
            .service(
                web::resource("/password/change")
                    .wrap(limiter(Action::PasswordReset, reset_quota))
                    .wrap(BearerAuth::new(Arc::clone(&state.tokens)))
                    .route(web::put().to(handlers::password::change)),
            )
            .service(
                web::resource("/password/forget")
                    .wrap(limiter(Action::PasswordReset, reset_quota))
                    .route(web::get().to(handlers::password::forget_page))
                    .route(web::post().to(handlers::password::forget_submit)),
            )
            .service(
                web::resource("/password/reset/{verify_id}")
                    .wrap(limiter(Action::PasswordReset, reset_quota))
                    .route(web::get().to(handlers::password::reset_page))
                    .route(web::post().to(handlers::password::reset_submit)),
            )
            .service(
                web::scope("/admin")
                    .wrap(HmacAuth::new(state.config.hmac_secret.as_bytes().to_vec()))
                    .route("/check", web::post().to(handlers::admin::check))
                    .route("/signup", web::post().to(handlers::admin::signup))
                    .route("/login", web::post().to(handlers::admin::login)),
            )
            .service(
                web::resource("/.well-known/jwks.json")
                    .route(web::get().to(handlers::keys::jwks)),
            ),
    );

    cfg.service(web::resource("/health").route(web::get().to(handlers::health::health)));
}
