//! Canonical-HMAC authentication middleware
//!
//! Reads the `(HMAC-Authenticate, Timestamp, UID)` header triple, buffers
//! the body, reconstructs the canonical request string from the live
//! request and applies the signature, staleness and skew rules. On
//! success a service [`UserContext`] is populated from the optional
//! `email`, `displayName`, `socialName` and `role` headers and the body
//! is handed back to the inner service untouched.
//!
//! The optional cache-backed replay set is best-effort: a cache that is
//! absent or failing degrades to "allow", never to "deny".

use super::auth::UserContext;
use crate::collaborators::Cache;
use crate::db::models::{derive_social_name, now_unix};
use crate::domain::auth::hmac::{validate, CanonicalRequest, MAX_AGE_SECS};
use crate::error::ApiError;
use actix_web::dev::{self, forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{web, Error, HttpMessage};
use futures_util::future::LocalBoxFuture;
use futures_util::StreamExt;
use std::future::{ready, Ready};
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

/// HMAC authentication middleware factory
pub struct HmacAuth {
    secret: Arc<Vec<u8>>,
    replay_cache: Option<Arc<dyn Cache>>,
}

impl HmacAuth {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: Arc::new(secret.into()),
            replay_cache: None,
        }
    }

    /// Adds a shared replay set for multi-replica deployments.
    pub fn with_replay_cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.replay_cache = Some(cache);
        self
    }
}

impl<S, B> Transform<S, ServiceRequest> for HmacAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = HmacAuthMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(HmacAuthMiddleware {
            service: Rc::new(service),
            secret: Arc::clone(&self.secret),
            replay_cache: self.replay_cache.clone(),
        }))
    }
}

pub struct HmacAuthMiddleware<S> {
    service: Rc<S>,
    secret: Arc<Vec<u8>>,
    replay_cache: Option<Arc<dyn Cache>>,
}

fn header_string(req: &ServiceRequest, name: &str) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

fn bytes_to_payload(buf: web::Bytes) -> dev::Payload {
    let (_, mut payload) = actix_http::h1::Payload::create(true);
    payload.unread_data(buf);
    dev::Payload::from(payload)
}

impl<S, B> Service<ServiceRequest> for HmacAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let secret = Arc::clone(&self.secret);
        let replay_cache = self.replay_cache.clone();

        Box::pin(async move {
            let signature = header_string(&req, "HMAC-Authenticate")
                .ok_or_else(|| ApiError::unauthorized("Missing request signature"))?;
            let uid = header_string(&req, "UID")
                .ok_or_else(|| ApiError::unauthorized("Missing request signature"))?;
            let timestamp: i64 = header_string(&req, "Timestamp")
                .and_then(|raw| raw.parse().ok())
                .ok_or_else(|| {
                    debug!("HMAC request rejected: missing or non-integer timestamp");
                    ApiError::unauthorized("Missing request signature")
                })?;
            let user_id = Uuid::parse_str(&uid).map_err(|_| {
                debug!("HMAC request rejected: UID is not a UUID");
                ApiError::unauthorized("Missing request signature")
            })?;

            // The signature covers the body, so buffer it here and hand it
            // back afterwards.
            let mut payload = req.take_payload();
            let mut body = web::BytesMut::new();
            while let Some(chunk) = payload.next().await {
                let chunk = chunk
                    .map_err(|_| ApiError::validation("Failed to read request body", None))?;
                body.extend_from_slice(&chunk);
            }
            let body = body.freeze();

            let canonical = CanonicalRequest {
                method: req.method().as_str(),
                path: req.path(),
                raw_query: req.query_string(),
                body: &body,
                uid: &uid,
                timestamp,
            };
            validate(&secret, &canonical, &signature, now_unix())?;

            if let Some(cache) = &replay_cache {
                let fresh = cache
                    .set_add(
                        "hmac-replay",
                        &signature,
                        Duration::from_secs(MAX_AGE_SECS as u64),
                    )
                    .await;
                if !fresh {
                    debug!("HMAC request rejected: signature replayed");
                    return Err(ApiError::unauthorized("Missing request signature").into());
                }
            }

            let username = header_string(&req, "email").unwrap_or_default();
            let display_name = header_string(&req, "displayName")
                .unwrap_or_else(|| username.clone());
            let social_name = header_string(&req, "socialName")
                .unwrap_or_else(|| derive_social_name(&display_name, user_id));
            let system_role = header_string(&req, "role").unwrap_or_default();

            req.extensions_mut().insert(UserContext {
                user_id,
                username,
                display_name,
                social_name,
                system_role,
                created_date: 0,
            });

            req.set_payload(bytes_to_payload(body));
            service.call(req).await
        })
    }
}
