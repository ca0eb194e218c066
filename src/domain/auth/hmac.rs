//! Canonical-HMAC request signatures
//!
//! Service-to-service and admin calls are authenticated by an HMAC-SHA-256
//! over a fixed serialization of the request:
//!
//! ```text
//! METHOD \n PATH \n RAW_QUERY \n sha256_hex(BODY) \n UID \n TIMESTAMP
//! ```
//!
//! The signature travels base64-encoded in `HMAC-Authenticate`. Timestamps
//! older than 300 s or more than 60 s in the future are rejected before
//! any comparison; the comparison itself is constant-time.

use crate::error::{ApiError, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

/// Replay window: maximum accepted age of a signed request.
pub const MAX_AGE_SECS: i64 = 300;

/// Maximum tolerated clock skew for timestamps from the future.
pub const MAX_CLOCK_SKEW_SECS: i64 = 60;

/// The request fields entering the canonical string.
#[derive(Debug, Clone)]
pub struct CanonicalRequest<'a> {
    pub method: &'a str,
    pub path: &'a str,
    pub raw_query: &'a str,
    pub body: &'a [u8],
    pub uid: &'a str,
    pub timestamp: i64,
}

impl CanonicalRequest<'_> {
    pub fn canonical_string(&self) -> String {
        format!(
            "{}\n{}\n{}\n{}\n{}\n{}",
            self.method,
            self.path,
            self.raw_query,
            hex::encode(Sha256::digest(self.body)),
            self.uid,
            self.timestamp
        )
    }
}

fn mac(secret: &[u8], canonical: &str) -> HmacSha256 {
    let mut mac =
        HmacSha256::new_from_slice(secret).expect("HMAC-SHA-256 accepts keys of any length");
    mac.update(canonical.as_bytes());
    mac
}

/// Signs a canonical request; the caller puts the result in
/// `HMAC-Authenticate`.
pub fn sign(secret: &[u8], request: &CanonicalRequest<'_>) -> String {
    BASE64.encode(mac(secret, &request.canonical_string()).finalize().into_bytes())
}

/// Validates a supplied signature against the live request. Every
/// deviation maps to `unauthorized`; the reason is only logged.
pub fn validate(
    secret: &[u8],
    request: &CanonicalRequest<'_>,
    supplied_signature: &str,
    now: i64,
) -> Result<()> {
    let age = now - request.timestamp;
    if age > MAX_AGE_SECS {
        debug!(age_secs = age, "HMAC request rejected: stale timestamp");
        return Err(ApiError::unauthorized("Invalid request signature"));
    }
    if -age > MAX_CLOCK_SKEW_SECS {
        debug!(skew_secs = -age, "HMAC request rejected: timestamp from the future");
        return Err(ApiError::unauthorized("Invalid request signature"));
    }

    let supplied = BASE64.decode(supplied_signature).map_err(|_| {
        debug!("HMAC request rejected: signature is not valid base64");
        ApiError::unauthorized("Invalid request signature")
    })?;

    mac(secret, &request.canonical_string())
        .verify_slice(&supplied)
        .map_err(|_| {
            debug!("HMAC request rejected: signature mismatch");
            ApiError::unauthorized("Invalid request signature")
        })
}
