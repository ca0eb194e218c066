//! Per-action rate limiting middleware
//!
//! Wraps a route group with a budget keyed by `(actor, action)`: the
//! actor is the authenticated user when a [`UserContext`] is already
//! attached, the peer address otherwise. Exceeding the budget answers
//! 429 with a retry-after hint before the handler runs.

use super::auth::UserContext;
use crate::domain::rate_limit::{Action, Quota, RateLimiter};
use crate::error::ApiError;
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{Error, HttpMessage};
use futures_util::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::sync::Arc;

/// Rate limit middleware factory for one action
pub struct ActionRateLimit {
    limiter: Arc<RateLimiter>,
    action: Action,
    quota: Quota,
}

impl ActionRateLimit {
    pub fn new(limiter: Arc<RateLimiter>, action: Action, quota: Quota) -> Self {
        Self {
            limiter,
            action,
            quota,
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for ActionRateLimit
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = ActionRateLimitMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ActionRateLimitMiddleware {
            service,
            limiter: Arc::clone(&self.limiter),
            action: self.action,
            quota: self.quota,
        }))
    }
}

pub struct ActionRateLimitMiddleware<S> {
    service: S,
    limiter: Arc<RateLimiter>,
    action: Action,
    quota: Quota,
}

impl<S, B> Service<ServiceRequest> for ActionRateLimitMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let actor = req
            .extensions()
            .get::<UserContext>()
            .map(|context| context.user_id.to_string())
            .or_else(|| {
                req.connection_info()
                    .realip_remote_addr()
                    .map(str::to_string)
            })
            .unwrap_or_else(|| "unknown".to_string());

        if let Err(retry) = self.limiter.check(&actor, self.action, self.quota) {
            return Box::pin(ready(Err(ApiError::rate_limited(retry.0).into())));
        }

        let fut = self.service.call(req);
        Box::pin(async move {
            let res = fut.await?;
            Ok(res)
        })
    }
}
