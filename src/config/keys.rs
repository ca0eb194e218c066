//! Process-wide ECDSA key material
//!
//! Parsed once at startup and frozen. Bearer tokens are signed with the
//! current P-256 key; validation also accepts the previous key while a
//! rotation grace window is open, matching the two-entry JWKS the service
//! publishes during rotation.

use crate::error::{ApiError, Result};
use jsonwebtoken::{DecodingKey, EncodingKey};
use p256::pkcs8::{DecodePrivateKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rand::rngs::OsRng;
use p256::{PublicKey, SecretKey};
use tracing::warn;

/// One published key: its stable `kid` and the public half.
#[derive(Clone)]
pub struct PublishedKey {
    pub kid: String,
    pub public: PublicKey,
}

pub struct KeyMaterial {
    /// Signing key for freshly minted tokens.
    encoding: EncodingKey,
    /// Validation keys, current first. More than one entry only during a
    /// rotation grace window.
    decoding: Vec<DecodingKey>,
    published: Vec<PublishedKey>,
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("decoding_count", &self.decoding.len())
            .field("published", &self.published.iter().map(|p| &p.kid).collect::<Vec<_>>())
            .finish()
    }
}

impl KeyMaterial {
    /// Builds key material from a P-256 private key in PEM form (PKCS#8 or
    /// SEC1). An optional previous public key keeps old tokens valid for
    /// the rotation grace window.
    pub fn from_private_pem(
        private_pem: &str,
        kid: &str,
        previous: Option<(&str, &str)>,
    ) -> Result<Self> {
        let secret = SecretKey::from_pkcs8_pem(private_pem)
            .or_else(|_| SecretKey::from_sec1_pem(private_pem))
            .map_err(|_| {
                ApiError::configuration_error("JWT_PRIVATE_KEY is not a valid P-256 key")
            })?;
        let public = secret.public_key();
        let public_pem = public
            .to_public_key_pem(LineEnding::LF)
            .map_err(|_| ApiError::configuration_error("Failed to encode JWT public key"))?;

        let encoding = EncodingKey::from_ec_pem(private_pem.as_bytes())
            .map_err(|_| ApiError::configuration_error("Failed to load JWT signing key"))?;
        let mut decoding = vec![DecodingKey::from_ec_pem(public_pem.as_bytes())
            .map_err(|_| ApiError::configuration_error("Failed to load JWT validation key"))?];
        let mut published = vec![PublishedKey {
            kid: kid.to_string(),
            public,
        }];

        if let Some((previous_kid, previous_pem)) = previous {
            let previous_public: PublicKey = previous_pem.parse().map_err(|_| {
                ApiError::configuration_error("JWT_PREVIOUS_PUBLIC_KEY is not a valid P-256 key")
            })?;
            let previous_public_pem = previous_public
                .to_public_key_pem(LineEnding::LF)
                .map_err(|_| ApiError::configuration_error("Failed to encode previous key"))?;
            decoding.push(
                DecodingKey::from_ec_pem(previous_public_pem.as_bytes()).map_err(|_| {
                    ApiError::configuration_error("Failed to load previous validation key")
                })?,
            );
            published.push(PublishedKey {
                kid: previous_kid.to_string(),
                public: previous_public,
            });
        }

        Ok(Self {
            encoding,
            decoding,
            published,
        })
    }

    /// Generates a throwaway key pair. Development convenience only; every
    /// restart invalidates all outstanding tokens.
    pub fn generate_ephemeral(kid: &str) -> Result<Self> {
        warn!("Generating ephemeral JWT key material; tokens will not survive a restart");
        let secret = SecretKey::random(&mut OsRng);
        let pem = secret
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|_| ApiError::configuration_error("Failed to encode ephemeral key"))?;
        Self::from_private_pem(&pem, kid, None)
    }

    pub fn encoding_key(&self) -> &EncodingKey {
        &self.encoding
    }

    /// Validation keys, current signer first.
    pub fn decoding_keys(&self) -> &[DecodingKey] {
        &self.decoding
    }

    pub fn current_kid(&self) -> &str {
        &self.published[0].kid
    }

    /// Keys to expose in the JWKS document, current signer first.
    pub fn published_keys(&self) -> &[PublishedKey] {
        &self.published
    }
}
