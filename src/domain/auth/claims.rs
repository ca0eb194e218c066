use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity payload embedded in every bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserClaim {
    pub uid: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: String,
    pub created_date: i64,
}

/// Full claim set of a bearer token. `jti` is a fresh UUIDv4 per mint,
/// recorded in `userAuth.access_token_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
    pub claim: UserClaim,
}
