//! Middleware pipeline
//!
//! Two authentication chains compose per route group: [`auth`] validates
//! `Authorization: Bearer` tokens for user routes, [`hmac`] validates
//! canonical-request signatures for admin/service routes. Both attach a
//! [`auth::UserContext`] to the request scope. [`rate_limit`] wraps route
//! groups with per-action budgets; [`request_id`] and [`security`] are
//! cross-cutting.

pub mod auth;
pub mod hmac;
pub mod rate_limit;
pub mod request_id;
pub mod security;

pub use auth::{AuthenticatedUser, BearerAuth, UserContext};
pub use hmac::HmacAuth;
pub use rate_limit::ActionRateLimit;
pub use request_id::RequestId;
pub use security::SecurityHeaders;
