//! Authentication domain
//!
//! - [`tokens`] mints and validates ES256 bearer tokens
//! - [`hmac`] implements the canonical-request signature scheme used by
//!   service-to-service and admin calls
//! - [`jwks`] renders the public verification keys
//! - [`password`] wraps bcrypt and the strength gate
//! - [`service`] composes the above into the signup/login/password flows

pub mod claims;
pub mod hmac;
pub mod jwks;
pub mod password;
pub mod service;
pub mod tokens;

pub use claims::{Claims, UserClaim};
pub use service::{AuthService, AuthSession};
pub use tokens::{MintedToken, TokenManager};
