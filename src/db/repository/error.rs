use crate::error::ApiError;
use thiserror::Error;

/// Typed failure set for repository operations.
///
/// Every storage backend maps its native failures onto this enum at the
/// boundary where they are first observed; callers never see backend
/// error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("duplicate key on field `{0}`")]
    DuplicateKey(String),
    #[error("invalid filter: {0}")]
    InvalidFilter(String),
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    #[error("transaction failed: {0}")]
    TransactionFailed(String),
    #[error("transaction timed out")]
    TransactionTimeout,
    #[error("transaction is no longer active")]
    TransactionInactive,
    #[error("transaction conflict")]
    TransactionConflict,
    #[error("nested transactions are not supported")]
    NestedTransaction,
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),
}

/// Type alias for Results carrying a [`RepositoryError`]
pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;

impl From<RepositoryError> for ApiError {
    fn from(error: RepositoryError) -> Self {
        match &error {
            RepositoryError::NotFound => ApiError::not_found("Record not found"),
            RepositoryError::DuplicateKey(field) => ApiError::duplicate_key("Duplicate key")
                .with_details(serde_json::json!({ "field": field })),
            RepositoryError::ConnectionFailed(_)
            | RepositoryError::TransactionFailed(_)
            | RepositoryError::TransactionTimeout
            | RepositoryError::TransactionConflict => {
                ApiError::database_error("Storage operation failed", None)
            }
            RepositoryError::InvalidFilter(_)
            | RepositoryError::TransactionInactive
            | RepositoryError::NestedTransaction
            | RepositoryError::UnsupportedOperation(_) => {
                ApiError::internal("Storage operation misuse")
            }
        }
    }
}
