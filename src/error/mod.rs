//! Application error taxonomy
//!
//! One error type crosses every layer: [`ApiError`] pairs a stable
//! [`ErrorCode`] (the `{code, message, details?}` wire body) with an
//! HTTP status mapping applied once, at the actix boundary. Storage
//! failures start life as the typed `RepositoryError` in `crate::db` and
//! are converted to an `ApiError` where the domain first observes them.
//!
//! Two rules shape the taxonomy:
//! - Security-sensitive distinctions collapse to a single external kind.
//!   "No such user", "wrong password", "malformed token" and "expired
//!   token" all leave the process as `UNAUTHORIZED`; wrong, expired,
//!   consumed or IP-mismatched verification codes all leave as
//!   `VALIDATION_FAILED`. The precise reason goes to the log, never the
//!   body.
//! - Client-correctable failures carry structure: missing-field and
//!   invalid-UUID errors name the field in `details`, and rate-limit
//!   errors carry the retry window both in `details` and as a
//!   `Retry-After` header.

mod api_error;
mod error_code;

pub use api_error::ApiError;
pub use error_code::ErrorCode;

/// Type alias for Results that use ApiError as the error type
pub type Result<T> = std::result::Result<T, ApiError>;
