//! JWKS publication
//!
//! Renders the ECDSA public keys as a JSON Web Key Set. Rotation is the
//! documented two-step: publish the incoming key alongside the old one,
//! flip the signer, then drop the old entry after max token lifetime.

use crate::config::KeyMaterial;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Jwk {
    pub kty: String,
    pub crv: String,
    pub alg: String,
    #[serde(rename = "use")]
    pub public_key_use: String,
    pub kid: String,
    pub x: String,
    pub y: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct JwkSet {
    pub keys: Vec<Jwk>,
}

/// The document served at `/auth/.well-known/jwks.json`.
pub fn jwks_document(keys: &KeyMaterial) -> JwkSet {
    let keys = keys
        .published_keys()
        .iter()
        .map(|published| {
            let point = published.public.to_encoded_point(false);
            Jwk {
                kty: "EC".to_string(),
                crv: "P-256".to_string(),
                alg: "ES256".to_string(),
                public_key_use: "sig".to_string(),
                kid: published.kid.clone(),
                x: point
                    .x()
                    .map(|bytes| URL_SAFE_NO_PAD.encode(bytes))
                    .unwrap_or_default(),
                y: point
                    .y()
                    .map(|bytes| URL_SAFE_NO_PAD.encode(bytes))
                    .unwrap_or_default(),
            }
        })
        .collect();
    JwkSet { keys }
}
