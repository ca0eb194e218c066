use super::base::{now_unix, Entity};
use crate::db::repository::Collection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Closed field set for the `userProfile` collection.
pub const FIELDS: &[&str] = &[
    "object_id",
    "full_name",
    "social_name",
    "email",
    "avatar",
    "banner",
    "tagline",
    "deleted",
    "created_date",
    "last_updated",
];

/// Handle derived at signup: lowercased first name joined to the first
/// eight hex digits of the user id.
pub fn derive_social_name(full_name: &str, user_id: Uuid) -> String {
    let first = full_name
        .split_whitespace()
        .next()
        .unwrap_or("user")
        .to_lowercase();
    let id = user_id.simple().to_string();
    format!("{}_{}", first, &id[..8])
}

/// Bootstrap profile record, created atomically with its `UserAuth` and
/// sharing its `object_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub object_id: Uuid,
    pub full_name: String,
    pub social_name: String,
    pub email: String,
    pub avatar: String,
    pub banner: String,
    pub tagline: String,
    pub deleted: bool,
    pub created_date: i64,
    pub last_updated: i64,
}

impl UserProfile {
    pub fn bootstrap(user_id: Uuid, full_name: impl Into<String>, email: impl Into<String>) -> Self {
        let full_name = full_name.into();
        let now = now_unix();
        Self {
            object_id: user_id,
            social_name: derive_social_name(&full_name, user_id),
            full_name,
            email: email.into(),
            avatar: String::new(),
            banner: String::new(),
            tagline: String::new(),
            deleted: false,
            created_date: now,
            last_updated: now,
        }
    }
}

impl Entity for UserProfile {
    const COLLECTION: Collection = Collection::UserProfile;

    fn object_id(&self) -> Uuid {
        self.object_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_social_name_derivation() {
        let id = Uuid::parse_str("a1b2c3d4-0000-0000-0000-000000000000").unwrap();
        assert_eq!(derive_social_name("John Doe", id), "john_a1b2c3d4");
        assert_eq!(derive_social_name("", id), "user_a1b2c3d4");
    }
}
