//! Bearer authentication middleware
//!
//! Reads `Authorization`, accepts only the exact `Bearer ` scheme, and
//! validates the token through the token service. On success a
//! [`UserContext`] materialized from the embedded claim is attached to
//! the request scope; handlers reach it through the
//! [`AuthenticatedUser`] extractor.

use crate::db::models::derive_social_name;
use crate::domain::auth::{Claims, TokenManager};
use crate::error::ApiError;
use actix_web::dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{Error, FromRequest, HttpMessage, HttpRequest};
use futures_util::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::sync::Arc;
use uuid::Uuid;

/// Request-scoped identity, stored in request extensions under its type.
///
/// Bearer requests fill it from the token's embedded claim; HMAC requests
/// fill it from the service headers.
#[derive(Debug, Clone)]
pub struct UserContext {
    pub user_id: Uuid,
    pub username: String,
    pub display_name: String,
    pub social_name: String,
    pub system_role: String,
    pub created_date: i64,
}

impl From<&Claims> for UserContext {
    fn from(claims: &Claims) -> Self {
        Self {
            user_id: claims.claim.uid,
            username: claims.claim.email.clone(),
            display_name: claims.claim.display_name.clone(),
            social_name: derive_social_name(&claims.claim.display_name, claims.claim.uid),
            system_role: claims.claim.role.clone(),
            created_date: claims.claim.created_date,
        }
    }
}

/// Extractor for the authenticated user context
///
/// # Example
/// ```ignore
/// async fn handler(auth: AuthenticatedUser) -> HttpResponse {
///     let user_id = auth.user_id();
///     // ...
/// }
/// ```
pub struct AuthenticatedUser(pub UserContext);

impl AuthenticatedUser {
    pub fn user_id(&self) -> Uuid {
        self.0.user_id
    }

    pub fn context(&self) -> &UserContext {
        &self.0
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let context = req.extensions().get::<UserContext>().cloned();
        match context {
            Some(context) => ready(Ok(AuthenticatedUser(context))),
            None => ready(Err(ApiError::unauthorized("Missing authentication").into())),
        }
    }
}

/// Bearer authentication middleware factory
pub struct BearerAuth {
    tokens: Arc<TokenManager>,
}

impl BearerAuth {
    pub fn new(tokens: Arc<TokenManager>) -> Self {
        Self { tokens }
    }
}

impl<S, B> Transform<S, ServiceRequest> for BearerAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = BearerAuthMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(BearerAuthMiddleware {
            service,
            tokens: Arc::clone(&self.tokens),
        }))
    }
}

pub struct BearerAuthMiddleware<S> {
    service: S,
    tokens: Arc<TokenManager>,
}

impl<S, B> Service<ServiceRequest> for BearerAuthMiddleware<S>
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
        // Only the exact `Bearer ` scheme (one space) is accepted.
        let token = match req.headers().get("Authorization") {
            Some(value) => match value.to_str() {
                Ok(header) if header.starts_with("Bearer ") => header[7..].to_string(),
                _ => {
                    return Box::pin(ready(Err(ApiError::unauthorized(
                        "Invalid authorization header",
                    )
                    .into())));
                }
            },
            None => {
                return Box::pin(ready(Err(ApiError::unauthorized(
                    "Missing authorization header",
                )
                .into())));
            }
        };

        match self.tokens.validate(&token) {
            Ok(claims) => {
                req.extensions_mut().insert(UserContext::from(&claims));
                let fut = self.service.call(req);
                Box::pin(async move {
                    let res = fut.await?;
                    Ok(res)
                })
            }
            Err(e) => Box::pin(ready(Err(e.into()))),
        }
    }
}
