//! Server configuration and startup
//!
//! Builds the application state (store, token service, verification
//! engine, orchestrator, limiter), spawns the background tasks and runs
//! the HTTP server with the middleware stack and route table.

use crate::api::{doc, middleware, routes};
use crate::collaborators::{
    CaptchaVerifier, EmailSender, LoggingEmailSender, LoggingSmsSender, ProfileCreator,
    SmsSender, StaticCaptchaVerifier, StoreProfileCreator,
};
use crate::config::{Config, KeyMaterial};
use crate::db::repository::{MemoryRepository, Repository};
use crate::db::stores;
use crate::domain::auth::service::AuthSettings;
use crate::domain::auth::{AuthService, TokenManager};
use crate::domain::rate_limit::RateLimiter;
use crate::domain::verification::{reaper, VerificationEngine, VerificationSettings};
use crate::error::Result;
use actix_web::middleware::NormalizePath;
use actix_web::{web, App, HttpServer};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_actix_web::TracingLogger;

/// Everything a handler or middleware needs, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn Repository>,
    pub auth: Arc<AuthService>,
    pub engine: Arc<VerificationEngine>,
    pub tokens: Arc<TokenManager>,
    pub keys: Arc<KeyMaterial>,
    pub limiter: Arc<RateLimiter>,
    pub config: Config,
}

impl AppState {
    /// Default wiring: in-memory store and logging collaborator stubs.
    /// Production deployments swap collaborators via [`AppState::build_with`].
    pub fn build(config: Config) -> Result<Self> {
        Self::build_with(
            config,
            Arc::new(MemoryRepository::new()),
            Arc::new(StaticCaptchaVerifier::accepting()),
            Arc::new(LoggingEmailSender),
            Arc::new(LoggingSmsSender),
            Arc::new(StoreProfileCreator),
        )
    }

    pub fn build_with(
        config: Config,
        repo: Arc<dyn Repository>,
        captcha: Arc<dyn CaptchaVerifier>,
        email: Arc<dyn EmailSender>,
        sms: Arc<dyn SmsSender>,
        profiles: Arc<dyn ProfileCreator>,
    ) -> Result<Self> {
        let keys = Arc::new(config.key_material()?);
        let tokens = Arc::new(TokenManager::new(
            Arc::clone(&keys),
            config.org_name.clone(),
            config.web_domain.clone(),
            config.access_token_ttl_secs,
        ));
        let limiter = Arc::new(RateLimiter::new());

        let engine = Arc::new(VerificationEngine::new(
            Arc::clone(&repo),
            Arc::clone(&limiter),
            Arc::clone(&tokens),
            Arc::clone(&profiles),
            Arc::clone(&email),
            sms,
            VerificationSettings {
                code_ttl_secs: config.verification_ttl_secs,
                max_attempts: config.verification_max_attempts,
                ip_limit: config.verification_ip_limit,
                window: Duration::from_secs(config.verification_ip_window_secs),
                bcrypt_cost: config.bcrypt_cost(),
                web_domain: config.web_domain.clone(),
                email_from: config.email_from.clone(),
            },
        ));

        let auth = Arc::new(AuthService::new(
            Arc::clone(&repo),
            Arc::clone(&tokens),
            Arc::clone(&engine),
            captcha,
            email,
            profiles,
            AuthSettings {
                web_domain: config.web_domain.clone(),
                email_from: config.email_from.clone(),
                reset_token_ttl_secs: config.reset_token_ttl_secs,
                bcrypt_cost: config.bcrypt_cost(),
                rotate_token_on_password_change: config.rotate_token_on_password_change,
            },
        ));

        Ok(Self {
            repo,
            auth,
            engine,
            tokens,
            keys,
            limiter,
            config,
        })
    }
}

pub async fn run(config: Config) -> std::io::Result<()> {
    let state = AppState::build(config)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

    stores::ensure_indexes(state.repo.as_ref())
        .await
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;

    // Background tasks: expired-record reaper and limiter cleanup.
    reaper::spawn(
        Arc::clone(&state.repo),
        Duration::from_secs(state.config.reaper_interval_secs),
        state.config.reaper_grace_secs,
    );
    state
        .limiter
        .spawn_cleanup(Duration::from_secs(state.config.rate_limit_window_secs));

    let host = state.config.host.clone();
    let port = state.config.port;
    let data = web::Data::new(state);

    let server = HttpServer::new(move || {
        App::new()
            // Middleware
            .wrap(TracingLogger::default())
            .wrap(middleware::RequestId::new())
            .wrap(middleware::SecurityHeaders::new())
            .wrap(NormalizePath::trim())
            // State
            .app_data(data.clone())
            // Routes
            .configure(|cfg| {
                routes::configure(cfg, data.get_ref());
                doc::configure(cfg);
            })
    })
    .bind((host.clone(), port))?;

    info!("Server listening on {}:{}", host, port);

    server.run().await
}
