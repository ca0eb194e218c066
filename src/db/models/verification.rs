use super::base::{now_unix, Entity};
use crate::db::repository::Collection;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Closed field set for the `userVerification` collection.
pub const FIELDS: &[&str] = &[
    "object_id",
    "user_id",
    "code",
    "target",
    "target_type",
    "hashed_password",
    "full_name",
    "remote_ip",
    "counter",
    "expires_at",
    "used",
    "is_verified",
    "deleted",
    "created_date",
    "last_updated",
];

/// Where a verification code was delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    Email,
    Phone,
}

impl TargetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetType::Email => "email",
            TargetType::Phone => "phone",
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TargetType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "email" | "emailverification" => Ok(TargetType::Email),
            "phone" | "phoneverification" => Ok(TargetType::Phone),
            _ => Err(()),
        }
    }
}

/// One verification attempt. Holds everything needed to materialize the
/// account once the user proves possession of the target: the bcrypt hash
/// of the signup password, the full name for the profile bootstrap and the
/// originating IP.
///
/// Invariants: `used` implies `is_verified`, and `used` transitions
/// false→true exactly once, inside the signup-completion transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserVerification {
    pub object_id: Uuid,
    /// Id the `userAuth` row will carry if verification succeeds. The
    /// account does not exist until then.
    pub user_id: Uuid,
    pub code: String,
    pub target: String,
    pub target_type: TargetType,
    pub hashed_password: String,
    pub full_name: String,
    pub remote_ip: String,
    pub counter: i64,
    pub expires_at: i64,
    pub used: bool,
    pub is_verified: bool,
    pub deleted: bool,
    pub created_date: i64,
    pub last_updated: i64,
}

impl UserVerification {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_id: Uuid,
        code: impl Into<String>,
        target: impl Into<String>,
        target_type: TargetType,
        hashed_password: impl Into<String>,
        full_name: impl Into<String>,
        remote_ip: impl Into<String>,
        ttl_secs: i64,
    ) -> Self {
        let now = now_unix();
        Self {
            object_id: Uuid::new_v4(),
            user_id,
            code: code.into(),
            target: target.into(),
            target_type,
            hashed_password: hashed_password.into(),
            full_name: full_name.into(),
            remote_ip: remote_ip.into(),
            counter: 0,
            expires_at: now + ttl_secs,
            used: false,
            is_verified: false,
            deleted: false,
            created_date: now,
            last_updated: now,
        }
    }

    pub fn is_expired(&self, now: i64) -> bool {
        now > self.expires_at
    }
}

impl Entity for UserVerification {
    const COLLECTION: Collection = Collection::UserVerification;

    fn object_id(&self) -> Uuid {
        self.object_id
    }
}
