//! Bearer token service
//!
//! ES256 (ECDSA on P-256 with SHA-256) compact JWS. Every validation
//! failure collapses to a single `unauthorized` so callers cannot probe
//! whether a token was malformed, expired or mis-signed; the precise
//! reason goes to the log.

use super::claims::{Claims, UserClaim};
use crate::config::KeyMaterial;
use crate::db::models::UserAuth;
use crate::error::{ApiError, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, Header, Validation};
use std::sync::Arc;
use tracing::{debug, error};
use uuid::Uuid;

/// A freshly minted token and its `jti`.
#[derive(Debug, Clone)]
pub struct MintedToken {
    pub token: String,
    pub jti: String,
}

/// Token generation and validation against the process key material.
pub struct TokenManager {
    keys: Arc<KeyMaterial>,
    issuer: String,
    audience: String,
    ttl_secs: i64,
}

impl TokenManager {
    pub fn new(
        keys: Arc<KeyMaterial>,
        issuer: impl Into<String>,
        audience: impl Into<String>,
        ttl_secs: i64,
    ) -> Self {
        Self {
            keys,
            issuer: issuer.into(),
            audience: audience.into(),
            ttl_secs,
        }
    }

    /// Mints a bearer token for the account. The display name comes from
    /// the profile record; accounts without one fall back to the username.
    pub fn generate(&self, user: &UserAuth, display_name: &str) -> Result<MintedToken> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.ttl_secs);
        let jti = Uuid::new_v4().to_string();

        let claims = Claims {
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: jti.clone(),
            claim: UserClaim {
                uid: user.object_id,
                email: user.username.clone(),
                display_name: display_name.to_string(),
                role: user.role.to_string(),
                created_date: user.created_date,
            },
        };

        let mut header = Header::new(Algorithm::ES256);
        header.kid = Some(self.keys.current_kid().to_string());

        let token = encode(&header, &claims, self.keys.encoding_key()).map_err(|e| {
            error!("Failed to generate bearer token: {}", e);
            ApiError::internal("Failed to generate token")
        })?;

        Ok(MintedToken { token, jti })
    }

    /// Validates signature, expiry, issuer, audience and structure.
    /// During key rotation the previous key is tried after the current
    /// one.
    pub fn validate(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::ES256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);

        let mut last_error = None;
        for key in self.keys.decoding_keys() {
            match decode::<Claims>(token, key, &validation) {
                Ok(data) => return Ok(data.claims),
                Err(e) => last_error = Some(e),
            }
        }

        debug!(
            reason = %last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no validation keys configured".into()),
            "Bearer token rejected"
        );
        Err(ApiError::unauthorized("Invalid or expired token"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::Role;
    use pretty_assertions::assert_eq;

    fn manager() -> TokenManager {
        let keys = Arc::new(KeyMaterial::generate_ephemeral("test-kid").unwrap());
        TokenManager::new(keys, "test-org", "https://web.test", 3600)
    }

    fn user() -> UserAuth {
        UserAuth::new(
            Uuid::new_v4(),
            "jane@example.com",
            "$2b$12$abcdefghijklmnopqrstuv",
            Role::User,
        )
    }

    #[test]
    fn test_generate_validate_round_trip() {
        let manager = manager();
        let user = user();
        let minted = manager.generate(&user, "Jane Doe").unwrap();

        let claims = manager.validate(&minted.token).unwrap();
        assert_eq!(claims.jti, minted.jti);
        assert_eq!(claims.iss, "test-org");
        assert_eq!(claims.aud, "https://web.test");
        assert_eq!(claims.claim.uid, user.object_id);
        assert_eq!(claims.claim.email, "jane@example.com");
        assert_eq!(claims.claim.display_name, "Jane Doe");
        assert_eq!(claims.claim.role, "user");
    }

    #[test]
    fn test_fresh_jti_per_mint() {
        let manager = manager();
        let user = user();
        let a = manager.generate(&user, "Jane").unwrap();
        let b = manager.generate(&user, "Jane").unwrap();
        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn test_foreign_key_rejected() {
        let manager_a = manager();
        let manager_b = manager();
        let minted = manager_a.generate(&user(), "Jane").unwrap();
        let err = manager_b.validate(&minted.token).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::Unauthorized);
    }

    #[test]
    fn test_malformed_token_rejected() {
        let manager = manager();
        for garbage in ["", "abc", "a.b.c", "Bearer xyz"] {
            let err = manager.validate(garbage).unwrap_err();
            assert_eq!(err.code, crate::error::ErrorCode::Unauthorized);
        }
    }

    #[test]
    fn test_wrong_algorithm_rejected() {
        // HS256-signed token presented to an ES256 validator.
        let claims = serde_json::json!({
            "iss": "test-org", "aud": "https://web.test",
            "iat": Utc::now().timestamp(), "exp": Utc::now().timestamp() + 600,
            "jti": "x",
            "claim": {"uid": Uuid::new_v4(), "email": "a@b.c", "displayName": "A", "role": "user", "createdDate": 0}
        });
        let forged = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &jsonwebtoken::EncodingKey::from_secret(b"secret"),
        )
        .unwrap();
        let err = manager().validate(&forged).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::Unauthorized);
    }
}
