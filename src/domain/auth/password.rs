//! Password hashing and strength validation
//!
//! bcrypt for hashing (the stored hash embeds salt and work factor) and
//! zxcvbn for the strength gate. Hash and compare are CPU-heavy, not
//! I/O, so they run on the blocking pool rather than starving the
//! request scheduler. The dummy-hash compare keeps the latency of "no
//! such user" indistinguishable from "wrong password".

use crate::error::{ApiError, Result};
use once_cell::sync::Lazy;
use tracing::error;
use zxcvbn::Score;

/// Minimum acceptable zxcvbn score (0-4 scale).
pub const MIN_SCORE: Score = Score::Three;

/// Minimum estimated entropy in bits.
pub const MIN_ENTROPY_BITS: f64 = 37.0;

static DUMMY_HASH: Lazy<String> = Lazy::new(|| {
    bcrypt::hash("timing-equalization-dummy", bcrypt::DEFAULT_COST)
        .expect("bcrypt accepts the default cost")
});

pub async fn hash_password(password: &str, cost: u32) -> Result<String> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| {
            error!("Hashing task failed: {}", e);
            ApiError::internal("Failed to hash password")
        })?
        .map_err(|e| {
            error!("Failed to hash password: {}", e);
            ApiError::internal("Failed to hash password")
        })
}

pub async fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let password = password.to_string();
    let hash = hash.to_string();
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| {
            error!("Verification task failed: {}", e);
            ApiError::internal("Failed to verify password")
        })?
        .map_err(|e| {
            error!("Failed to verify password hash: {}", e);
            ApiError::internal("Failed to verify password")
        })
}

/// Burns one bcrypt compare against a fixed hash. Called on the
/// unknown-username path so response time does not leak account
/// existence.
pub async fn equalize_timing(password: &str) {
    let password = password.to_string();
    let _ = tokio::task::spawn_blocking(move || bcrypt::verify(password, &DUMMY_HASH)).await;
}

/// Rejects passwords scoring below [`MIN_SCORE`] or estimated below
/// [`MIN_ENTROPY_BITS`] bits.
pub fn validate_strength(password: &str, field: &str) -> Result<()> {
    let estimate = zxcvbn::zxcvbn(password, &[]);
    let entropy_bits = estimate.guesses_log10() * std::f64::consts::LOG2_10;
    if estimate.score() < MIN_SCORE || entropy_bits < MIN_ENTROPY_BITS {
        return Err(ApiError::validation(
            "Password is too weak",
            Some(serde_json::json!({ "field": field })),
        ));
    }
    Ok(())
}
