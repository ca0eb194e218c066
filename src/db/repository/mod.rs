//! Abstract repository surface for the credential store
//!
//! The [`Repository`] trait is the single seam between the domain and
//! storage. It speaks JSON documents and dynamic field maps so that a
//! transaction handle can transparently substitute for the plain store:
//! [`Transaction`] implements `Repository` by composition and stages its
//! writes until commit.
//!
//! All operations are async and return a typed [`RepositoryError`] on
//! failure. Ownership-scoped mutations fold "missing" and "not owned"
//! into one `NotFound` so callers cannot probe for foreign ids.

mod error;
mod memory;
mod query;
mod transaction;
mod types;

pub use error::{RepositoryError, RepositoryResult};
pub use memory::MemoryRepository;
pub use transaction::{with_transaction, Transaction};
pub use types::{
    document_id, Collection, Comparison, Condition, Cursor, Document, FieldMap, FieldValue,
    Filter, IndexSpec, IsolationLevel, Page, RetryPolicy, TransactionConfig,
};

use async_trait::async_trait;
use uuid::Uuid;

/// Storage operations shared by the live store and transaction handles.
///
/// `update_fields` and `increment_fields` bump `last_updated` to the
/// current time unless the supplied map already sets it.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Insert or replace a document keyed by its `object_id`.
    async fn save(&self, collection: Collection, document: Document) -> RepositoryResult<Document>;

    /// First document matching the filter, newest first.
    async fn find_one(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> RepositoryResult<Option<Document>>;

    /// Cursor-paged read ordered newest-first.
    async fn find_many(
        &self,
        collection: Collection,
        filter: &Filter,
        cursor: &Cursor,
    ) -> RepositoryResult<Page>;

    /// Partial update of every document matching the filter; returns the
    /// number of documents touched.
    async fn update_fields(
        &self,
        collection: Collection,
        filter: &Filter,
        updates: &FieldMap,
    ) -> RepositoryResult<u64>;

    /// Numeric in-place increments; returns the number of documents touched.
    async fn increment_fields(
        &self,
        collection: Collection,
        filter: &Filter,
        increments: &FieldMap,
    ) -> RepositoryResult<u64>;

    /// Hard delete of every document matching the filter; returns the
    /// number of documents removed. Tombstoning is an `update_fields`
    /// setting `deleted=true`.
    async fn delete(&self, collection: Collection, filter: &Filter) -> RepositoryResult<u64>;

    /// Atomic single-statement update whose predicate includes the entity
    /// id, the owner id and `deleted=false`. Returns `NotFound` for
    /// missing and not-owned alike.
    async fn update_with_ownership(
        &self,
        collection: Collection,
        id: Uuid,
        owner_id: Uuid,
        updates: &FieldMap,
    ) -> RepositoryResult<()>;

    /// Ownership-scoped hard delete; same predicate contract as
    /// [`Repository::update_with_ownership`].
    async fn delete_with_ownership(
        &self,
        collection: Collection,
        id: Uuid,
        owner_id: Uuid,
    ) -> RepositoryResult<()>;

    /// Number of documents matching the filter.
    async fn count(&self, collection: Collection, filter: &Filter) -> RepositoryResult<u64>;

    /// Declare an index. Unique indexes are enforced on every write.
    async fn create_index(
        &self,
        collection: Collection,
        index: IndexSpec,
    ) -> RepositoryResult<()>;

    /// Open a transaction. The returned handle is itself a `Repository`;
    /// beginning a transaction on a transaction fails with
    /// `NestedTransaction`.
    async fn begin_transaction(&self, config: TransactionConfig) -> RepositoryResult<Transaction>;
}
