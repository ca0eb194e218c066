//! Persistent entities of the credential store
//!
//! Every mutable entity carries `object_id` (UUIDv4 primary key),
//! `created_date` / `last_updated` (Unix seconds) and a `deleted`
//! tombstone flag. The `FIELDS` constant in each module is the closed
//! field enumeration the repository validates filters and field maps
//! against.

mod base;
pub mod profile;
pub mod reset_token;
pub mod user_auth;
pub mod verification;

pub use base::{now_unix, Entity};
pub use profile::{derive_social_name, UserProfile};
pub use reset_token::ResetToken;
pub use user_auth::{Role, UserAuth};
pub use verification::{TargetType, UserVerification};
