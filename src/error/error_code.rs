//! Error code enumeration for the application
//!
//! This module defines all possible error types that can occur in the application.
//! Error codes are organized by category and map directly to HTTP status codes
//! when returned in API responses.
//!
//! The error codes follow these principles:
//! - Clear and descriptive names that indicate the error type
//! - Organized into logical categories (auth, validation, infrastructure, etc.)
//! - Map cleanly to standard HTTP status codes
//! - Stable SCREAMING_SNAKE_CASE wire names clients can match on

use serde::{Deserialize, Serialize};
use std::fmt;

/// Comprehensive set of error codes for the application
///
/// Each variant represents a specific type of error that can occur.
/// The variants are organized into categories and include documentation
/// about when they should be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation
    /// Input validation failed
    ValidationFailed,
    /// A required field was absent from the request
    MissingRequiredField,
    /// A field expected to carry a UUID did not parse as one
    InvalidUuid,

    // Authentication/Authorization
    /// Request is not authenticated
    Unauthorized,
    /// Authenticated principal lacks permission for the operation
    Forbidden,

    // Resource errors
    /// Requested resource does not exist
    NotFound,
    /// Write collided with an existing unique key
    DuplicateKey,

    // Rate limiting
    /// Too many requests from client
    RateLimited,

    // Infrastructure
    /// Storage operation failed
    DatabaseOperationFailed,
    /// Application configuration error
    ConfigurationError,
    /// Service temporarily unavailable
    ServiceUnavailable,

    // Other
    /// Unexpected internal error
    InternalError,
}

impl ErrorCode {
    /// Stable wire name for the code, identical to its serde form.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValidationFailed => "VALIDATION_FAILED",
            ErrorCode::MissingRequiredField => "MISSING_REQUIRED_FIELD",
            ErrorCode::InvalidUuid => "INVALID_UUID",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::DuplicateKey => "DUPLICATE_KEY",
            ErrorCode::RateLimited => "RATE_LIMITED",
            ErrorCode::DatabaseOperationFailed => "DATABASE_OPERATION_FAILED",
            ErrorCode::ConfigurationError => "CONFIGURATION_ERROR",
            ErrorCode::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names_match_serde() {
        for code in [
            ErrorCode::ValidationFailed,
            ErrorCode::MissingRequiredField,
            ErrorCode::InvalidUuid,
            ErrorCode::Unauthorized,
            ErrorCode::Forbidden,
            ErrorCode::NotFound,
            ErrorCode::DuplicateKey,
            ErrorCode::RateLimited,
            ErrorCode::DatabaseOperationFailed,
            ErrorCode::ConfigurationError,
            ErrorCode::ServiceUnavailable,
            ErrorCode::InternalError,
        ] {
            let json = serde_json::to_string(&code).unwrap();
            assert_eq!(json, format!("\"{}\"", code.as_str()));
        }
    }
}
