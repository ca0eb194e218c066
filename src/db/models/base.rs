use crate::db::repository::{Collection, Document, RepositoryError, RepositoryResult};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

/// Current time as Unix seconds, the storage-boundary representation for
/// every timestamp field.
pub fn now_unix() -> i64 {
    Utc::now().timestamp()
}

/// A struct that round-trips through the repository's document form.
pub trait Entity: Serialize + DeserializeOwned + Sized {
    const COLLECTION: Collection;

    fn object_id(&self) -> Uuid;

    fn to_document(&self) -> RepositoryResult<Document> {
        serde_json::to_value(self).map_err(|e| {
            RepositoryError::UnsupportedOperation(format!("entity did not serialize: {}", e))
        })
    }

    fn from_document(document: Document) -> RepositoryResult<Self> {
        serde_json::from_value(document).map_err(|e| {
            RepositoryError::UnsupportedOperation(format!("document did not decode: {}", e))
        })
    }
}
