use super::base::{now_unix, Entity};
use crate::db::repository::Collection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Closed field set for the `resetToken` collection.
pub const FIELDS: &[&str] = &[
    "object_id",
    "email",
    "hashed_token",
    "expires_at",
    "used",
    "deleted",
    "created_date",
    "last_updated",
];

/// One password-reset initiation. Only the SHA-256 of the reset secret is
/// stored; the plaintext exists once, inside the outbound email link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetToken {
    pub object_id: Uuid,
    pub email: String,
    pub hashed_token: String,
    pub expires_at: i64,
    pub used: bool,
    pub deleted: bool,
    pub created_date: i64,
    pub last_updated: i64,
}

impl ResetToken {
    pub fn new(email: impl Into<String>, hashed_token: impl Into<String>, ttl_secs: i64) -> Self {
        let now = now_unix();
        Self {
            object_id: Uuid::new_v4(),
            email: email.into(),
            hashed_token: hashed_token.into(),
            expires_at: now + ttl_secs,
            used: false,
            deleted: false,
            created_date: now,
            last_updated: now,
        }
    }

    pub fn is_expired(&self, now: i64) -> bool {
        now > self.expires_at
    }
}

impl Entity for ResetToken {
    const COLLECTION: Collection = Collection::ResetToken;

    fn object_id(&self) -> Uuid {
        self.object_id
    }
}
