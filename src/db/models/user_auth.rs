use super::base::{now_unix, Entity};
use crate::db::repository::Collection;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

/// Closed field set for the `userAuth` collection.
pub const FIELDS: &[&str] = &[
    "object_id",
    "username",
    "password",
    "email_verified",
    "phone_verified",
    "role",
    "access_token_id",
    "deleted",
    "created_date",
    "last_updated",
];

/// System role of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            _ => Err(()),
        }
    }
}

/// One account. Created only by the verification engine (or the admin
/// signup path); never deleted directly, only tombstoned.
///
/// `password` is always a bcrypt hash; plaintext never reaches storage.
/// `access_token_id` holds the `jti` of the last-minted bearer token so a
/// deployment can treat older tokens as revoked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAuth {
    pub object_id: Uuid,
    pub username: String,
    pub password: String,
    pub email_verified: bool,
    pub phone_verified: bool,
    pub role: Role,
    pub access_token_id: Option<String>,
    pub deleted: bool,
    pub created_date: i64,
    pub last_updated: i64,
}

impl UserAuth {
    pub fn new(
        object_id: Uuid,
        username: impl Into<String>,
        password_hash: impl Into<String>,
        role: Role,
    ) -> Self {
        let now = now_unix();
        Self {
            object_id,
            username: username.into(),
            password: password_hash.into(),
            email_verified: false,
            phone_verified: false,
            role,
            access_token_id: None,
            deleted: false,
            created_date: now,
            last_updated: now,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl Entity for UserAuth {
    const COLLECTION: Collection = Collection::UserAuth;

    fn object_id(&self) -> Uuid {
        self.object_id
    }
}
