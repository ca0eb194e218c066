//! Value, filter and configuration types shared by every repository backend.

use super::error::{RepositoryError, RepositoryResult};
use crate::db::models;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// A stored record. Documents are JSON objects keyed by `object_id`.
pub type Document = Value;

/// Closed set of collections the credential store persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    UserAuth,
    UserVerification,
    UserProfile,
    ResetToken,
}

impl Collection {
    pub fn name(&self) -> &'static str {
        match self {
            Collection::UserAuth => "userAuth",
            Collection::UserVerification => "userVerification",
            Collection::UserProfile => "userProfile",
            Collection::ResetToken => "resetToken",
        }
    }

    /// The closed field enumeration for the collection. Filters and field
    /// maps naming anything outside this set are rejected.
    pub fn allowed_fields(&self) -> &'static [&'static str] {
        match self {
            Collection::UserAuth => models::user_auth::FIELDS,
            Collection::UserVerification => models::verification::FIELDS,
            Collection::UserProfile => models::profile::FIELDS,
            Collection::ResetToken => models::reset_token::FIELDS,
        }
    }

    /// Field carrying the owning user id, used by ownership-scoped mutations.
    pub fn owner_field(&self) -> &'static str {
        match self {
            Collection::UserVerification => "user_id",
            _ => "object_id",
        }
    }

    pub fn contains_field(&self, field: &str) -> bool {
        self.allowed_fields().iter().any(|f| *f == field)
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Sum type for dynamic field values crossing the repository boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    String(String),
    Bytes(Vec<u8>),
    Int64(i64),
    Bool(bool),
    Uuid(Uuid),
    Timestamp(i64),
    Null,
}

impl FieldValue {
    /// JSON representation used by the document backends. Bytes are
    /// base64-encoded; UUIDs are hyphenated strings.
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::String(s) => Value::String(s.clone()),
            FieldValue::Bytes(b) => Value::String(BASE64.encode(b)),
            FieldValue::Int64(n) => Value::from(*n),
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::Uuid(id) => Value::String(id.to_string()),
            FieldValue::Timestamp(t) => Value::from(*t),
            FieldValue::Null => Value::Null,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Int64(n) | FieldValue::Timestamp(n) => Some(*n),
            _ => None,
        }
    }
}

/// Typed map from field name to value, used for partial updates and
/// increments. Unknown fields are rejected at the repository boundary.
#[derive(Debug, Clone, Default)]
pub struct FieldMap(BTreeMap<String, FieldValue>);

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion.
    pub fn set(mut self, field: impl Into<String>, value: FieldValue) -> Self {
        self.0.insert(field.into(), value);
        self
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Ensures every named field belongs to the collection's field set.
    pub fn validate_for(&self, collection: Collection) -> RepositoryResult<()> {
        for (field, _) in self.iter() {
            if !collection.contains_field(field) {
                return Err(RepositoryError::InvalidFilter(format!(
                    "unknown field `{}` for collection `{}`",
                    field, collection
                )));
            }
        }
        Ok(())
    }
}

/// Comparison operators supported by [`Filter`] conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
}

#[derive(Debug, Clone)]
pub struct Condition {
    pub field: String,
    pub op: Comparison,
    pub value: FieldValue,
}

/// Conjunctive filter over document fields.
///
/// Soft-deleted documents are excluded unless [`Filter::include_deleted`]
/// is set; this keeps tombstoned accounts invisible to every ordinary
/// lookup path.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    pub conditions: Vec<Condition>,
    pub include_deleted: bool,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter selecting a single document by primary key.
    pub fn by_id(id: Uuid) -> Self {
        Self::new().eq("object_id", FieldValue::Uuid(id))
    }

    fn push(mut self, field: impl Into<String>, op: Comparison, value: FieldValue) -> Self {
        self.conditions.push(Condition {
            field: field.into(),
            op,
            value,
        });
        self
    }

    pub fn eq(self, field: impl Into<String>, value: FieldValue) -> Self {
        self.push(field, Comparison::Eq, value)
    }

    pub fn ne(self, field: impl Into<String>, value: FieldValue) -> Self {
        self.push(field, Comparison::Ne, value)
    }

    pub fn lt(self, field: impl Into<String>, value: FieldValue) -> Self {
        self.push(field, Comparison::Lt, value)
    }

    pub fn lte(self, field: impl Into<String>, value: FieldValue) -> Self {
        self.push(field, Comparison::Lte, value)
    }

    pub fn gt(self, field: impl Into<String>, value: FieldValue) -> Self {
        self.push(field, Comparison::Gt, value)
    }

    pub fn gte(self, field: impl Into<String>, value: FieldValue) -> Self {
        self.push(field, Comparison::Gte, value)
    }

    pub fn include_deleted(mut self) -> Self {
        self.include_deleted = true;
        self
    }

    /// Ensures every condition names a field in the collection's field set.
    pub fn validate_for(&self, collection: Collection) -> RepositoryResult<()> {
        for condition in &self.conditions {
            if !collection.contains_field(&condition.field) {
                return Err(RepositoryError::InvalidFilter(format!(
                    "unknown field `{}` for collection `{}`",
                    condition.field, collection
                )));
            }
        }
        Ok(())
    }
}

/// Cursor for paged reads. Results are ordered newest-first by
/// (`created_date`, `object_id`); `after` names the last document of the
/// previous page.
#[derive(Debug, Clone)]
pub struct Cursor {
    pub after: Option<Uuid>,
    pub limit: usize,
}

impl Default for Cursor {
    fn default() -> Self {
        Self {
            after: None,
            limit: 50,
        }
    }
}

impl Cursor {
    pub fn first(limit: usize) -> Self {
        Self { after: None, limit }
    }

    pub fn after(id: Uuid, limit: usize) -> Self {
        Self {
            after: Some(id),
            limit,
        }
    }
}

/// One page of a cursor read.
#[derive(Debug, Clone)]
pub struct Page {
    pub documents: Vec<Document>,
    pub next_cursor: Option<Uuid>,
}

/// Declarative index specification. The memory backend enforces unique
/// indexes; non-unique ones are accepted and recorded for parity with
/// real backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexSpec {
    pub field: &'static str,
    pub unique: bool,
}

impl IndexSpec {
    pub fn unique(field: &'static str) -> Self {
        Self {
            field,
            unique: true,
        }
    }

    pub fn plain(field: &'static str) -> Self {
        Self {
            field,
            unique: false,
        }
    }
}

/// Isolation level requested for a transaction. The memory backend commits
/// atomically under a single lock and records the level without altering
/// behavior; relational backends translate it natively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IsolationLevel {
    #[default]
    BackendDefault,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

/// Per-error retry policy with exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_backoff: Duration,
    pub retry_conflicts: bool,
    pub retry_timeouts: bool,
    pub retry_connection_failures: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_backoff: Duration::from_millis(50),
            retry_conflicts: true,
            retry_timeouts: false,
            retry_connection_failures: true,
        }
    }
}

impl RetryPolicy {
    pub fn no_retries() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn is_retryable(&self, error: &RepositoryError) -> bool {
        match error {
            RepositoryError::TransactionConflict => self.retry_conflicts,
            RepositoryError::TransactionTimeout => self.retry_timeouts,
            RepositoryError::ConnectionFailed(_) => self.retry_connection_failures,
            _ => false,
        }
    }

    /// Exponential backoff for the given zero-based attempt.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_backoff * 2u32.saturating_pow(attempt)
    }
}

/// Transaction configuration.
#[derive(Debug, Clone)]
pub struct TransactionConfig {
    pub timeout: Duration,
    pub read_only: bool,
    pub isolation: IsolationLevel,
    pub retry: RetryPolicy,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            read_only: false,
            isolation: IsolationLevel::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl TransactionConfig {
    pub fn read_only() -> Self {
        Self {
            read_only: true,
            ..Self::default()
        }
    }
}

/// Reads the primary key out of a document.
pub fn document_id(document: &Document) -> RepositoryResult<Uuid> {
    document
        .get("object_id")
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| {
            RepositoryError::InvalidFilter("document is missing a valid `object_id`".into())
        })
}
