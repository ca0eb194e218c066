//! Route handlers
//!
//! Handlers parse and presence-check input (so error bodies carry the
//! failing field), call into the domain and map results onto the response
//! DTOs. Security decisions live in the domain and middleware, not here.

pub mod admin;
pub mod auth;
pub mod health;
pub mod keys;
pub mod password;

use crate::error::{ApiError, Result};
use actix_web::HttpRequest;
use uuid::Uuid;

/// Presence check for required form fields; blank counts as missing.
pub(crate) fn require<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::missing_field(field))
}

pub(crate) fn parse_uuid(value: &str, field: &str) -> Result<Uuid> {
    Uuid::parse_str(value).map_err(|_| ApiError::invalid_uuid(field))
}

/// Peer address as seen through reverse proxies.
pub(crate) fn remote_ip(req: &HttpRequest) -> String {
    req.connection_info()
        .realip_remote_addr()
        .unwrap_or("unknown")
        .to_string()
}

pub(crate) fn user_agent(req: &HttpRequest) -> String {
    req.headers()
        .get("User-Agent")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}
