use super::ErrorCode;
use crate::api::dto::ErrorResponse;
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use std::error::Error as StdError;
use std::fmt;
use tracing::{error, warn};

/// The application error: a stable [`ErrorCode`], a human-readable
/// message and optional structured `details` (typically the failing
/// field). Rate-limit errors additionally carry the seconds until the
/// window reopens, which surfaces as a `Retry-After` header rather than
/// in the body.
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(skip)]
    retry_after_secs: Option<u64>,
}

/// Implementation of common error creation methods
impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            retry_after_secs: None,
        }
    }

    /// Attaches structured details for the response body.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Creates a validation error with optional details
    pub fn validation(message: impl Into<String>, details: Option<serde_json::Value>) -> Self {
        Self {
            details,
            ..Self::new(ErrorCode::ValidationFailed, message)
        }
    }

    /// Creates an error for a required field that was not supplied
    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::MissingRequiredField,
            format!("Missing required field: {}", field),
        )
        .with_details(serde_json::json!({ "field": field }))
    }

    /// Creates an error for a field that did not parse as a UUID
    pub fn invalid_uuid(field: &str) -> Self {
        Self::new(
            ErrorCode::InvalidUuid,
            format!("Invalid UUID in field: {}", field),
        )
        .with_details(serde_json::json!({ "field": field }))
    }

    /// Creates an unauthorized error
    ///
    /// The message is intentionally generic; callers log the precise
    /// reason before constructing this.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    /// Creates a forbidden error
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    /// Creates a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Creates a duplicate key error
    pub fn duplicate_key(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DuplicateKey, message)
    }

    /// Creates a rate limited error carrying a retry-after hint in seconds
    pub fn rate_limited(retry_after_secs: u64) -> Self {
        Self {
            retry_after_secs: Some(retry_after_secs),
            ..Self::new(ErrorCode::RateLimited, "Too many requests")
                .with_details(serde_json::json!({ "retryAfterSecs": retry_after_secs }))
        }
    }

    /// Creates a database error with optional details
    pub fn database_error(message: impl Into<String>, details: Option<serde_json::Value>) -> Self {
        let error = Self {
            details,
            ..Self::new(ErrorCode::DatabaseOperationFailed, message)
        };
        error!(
            error_code = %error.code,
            error_message = %error.message,
            "Database error occurred"
        );
        error
    }

    /// Creates a configuration error
    pub fn configuration_error(message: impl Into<String>) -> Self {
        let error = Self::new(ErrorCode::ConfigurationError, message);
        error!(
            error_code = %error.code,
            error_message = %error.message,
            "Configuration error occurred"
        );
        error
    }

    /// Creates a service unavailable error
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }

    /// Creates an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    pub fn retry_after_secs(&self) -> Option<u64> {
        self.retry_after_secs
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse {
        // Only log server errors and external service errors
        match self.code {
            ErrorCode::InternalError
            | ErrorCode::DatabaseOperationFailed
            | ErrorCode::ConfigurationError => {
                error!(
                    error_code = %self.code,
                    error_message = %self.message,
                    error_details = ?self.details,
                    "Server error occurred"
                );
            }
            ErrorCode::ServiceUnavailable => {
                warn!(
                    error_code = %self.code,
                    error_message = %self.message,
                    error_details = ?self.details,
                    "External service error occurred"
                );
            }
            _ => {}
        }

        let error_response = ErrorResponse {
            code: self.code.to_string(),
            message: self.message.clone(),
            details: self.details.clone(),
        };

        let mut builder = HttpResponse::build(self.status_code());
        if let Some(retry_after) = self.retry_after_secs {
            builder.insert_header(("Retry-After", retry_after.to_string()));
        }
        builder.json(error_response)
    }

    fn status_code(&self) -> StatusCode {
        match self.code {
            ErrorCode::ValidationFailed
            | ErrorCode::MissingRequiredField
            | ErrorCode::InvalidUuid => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::DuplicateKey => StatusCode::CONFLICT,
            ErrorCode::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ErrorCode::DatabaseOperationFailed | ErrorCode::ServiceUnavailable => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl StdError for ApiError {}

impl From<std::io::Error> for ApiError {
    fn from(error: std::io::Error) -> Self {
        let api_error = ApiError::new(
            ErrorCode::ConfigurationError,
            format!("Configuration error: {}", error),
        );
        warn!(
            error_code = %api_error.code,
            error_message = %api_error.message,
            "IO error converted to API error"
        );
        api_error
    }
}
