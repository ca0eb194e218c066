//! HMAC-signed verification tokens
//!
//! Optional second factor for redirect flows that carry verification
//! state in query parameters. The signed tuple is pipe-joined; the code
//! itself never enters the signature, a fixed placeholder stands in for
//! it.

use crate::domain::auth::hmac::{MAX_AGE_SECS, MAX_CLOCK_SKEW_SECS};
use crate::error::{ApiError, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::debug;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Stand-in for the code position in the signed tuple.
pub const CODE_PLACEHOLDER: &str = "-";

/// The signed fields of a verification redirect.
#[derive(Debug, Clone)]
pub struct VerificationTokenData {
    pub verification_id: Uuid,
    pub remote_ip: String,
    pub timestamp: i64,
    pub user_id: Uuid,
}

impl VerificationTokenData {
    fn canonical_string(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}",
            self.verification_id, CODE_PLACEHOLDER, self.remote_ip, self.timestamp, self.user_id
        )
    }
}

fn mac(secret: &[u8], canonical: &str) -> HmacSha256 {
    let mut mac =
        HmacSha256::new_from_slice(secret).expect("HMAC-SHA-256 accepts keys of any length");
    mac.update(canonical.as_bytes());
    mac
}

/// Signs the tuple for inclusion as a query parameter.
pub fn issue(secret: &[u8], data: &VerificationTokenData) -> String {
    URL_SAFE_NO_PAD.encode(mac(secret, &data.canonical_string()).finalize().into_bytes())
}

/// Validates signature (constant-time), freshness and skew with the same
/// windows as the request-level HMAC scheme.
pub fn validate(
    secret: &[u8],
    data: &VerificationTokenData,
    signature: &str,
    now: i64,
) -> Result<()> {
    let age = now - data.timestamp;
    if age > MAX_AGE_SECS {
        debug!(age_secs = age, "Verification token rejected: stale");
        return Err(ApiError::unauthorized("Invalid verification token"));
    }
    if -age > MAX_CLOCK_SKEW_SECS {
        debug!(skew_secs = -age, "Verification token rejected: future timestamp");
        return Err(ApiError::unauthorized("Invalid verification token"));
    }

    let supplied = URL_SAFE_NO_PAD.decode(signature).map_err(|_| {
        debug!("Verification token rejected: invalid encoding");
        ApiError::unauthorized("Invalid verification token")
    })?;

    mac(secret, &data.canonical_string())
        .verify_slice(&supplied)
        .map_err(|_| {
            debug!("Verification token rejected: signature mismatch");
            ApiError::unauthorized("Invalid verification token")
        })
}
