//! Transaction handle
//!
//! A [`Transaction`] is a repository by composition: it delegates reads to
//! the backing store (overlaid with its own staged writes, so a transaction
//! reads its own effects) and buffers writes until commit. Commit and
//! rollback are idempotent through an atomic compare-and-swap on the
//! active flag; whichever is called second observes `TransactionInactive`.
//!
//! Staged writes carry the `last_updated` stamp each touched document had
//! when it was first read. Commit re-validates those stamps under the
//! store lock and fails with `TransactionConflict` when another writer got
//! there first, which is what makes the verification engine's at-most-once
//! guarantee hold across concurrent requests.

use super::error::{RepositoryError, RepositoryResult};
use super::query;
use super::types::{
    document_id, Collection, Cursor, Document, FieldMap, FieldValue, Filter, IndexSpec, Page,
    TransactionConfig,
};
use super::Repository;
use crate::db::models::now_unix;
use async_trait::async_trait;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Precondition a staged operation re-checks at commit time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Expectation {
    /// The document must not exist in the live store.
    Absent,
    /// The document must exist with exactly this `last_updated` stamp.
    LastUpdated(Option<i64>),
    /// An earlier op in the same transaction already validated the
    /// document; sequencing within the commit covers this one.
    Staged,
}

/// A write buffered by a transaction, replayed atomically at commit.
#[derive(Debug, Clone)]
pub(crate) enum StagedOp {
    Put {
        collection: Collection,
        id: Uuid,
        document: Document,
        expect: Expectation,
    },
    Remove {
        collection: Collection,
        id: Uuid,
        expect: Expectation,
    },
}

/// Store-side hooks a transaction needs; implemented by each backend.
#[async_trait]
pub(crate) trait TransactionBackend: Send + Sync {
    /// Every document of the collection, tombstones included.
    async fn scan(&self, collection: Collection) -> RepositoryResult<Vec<Document>>;

    /// Validate and apply a commit's staged ops as one atomic unit.
    async fn apply(&self, ops: Vec<StagedOp>) -> RepositoryResult<()>;
}

#[derive(Default)]
struct TxState {
    ops: Vec<StagedOp>,
    overlay: HashMap<(Collection, Uuid), Option<Document>>,
}

pub struct Transaction {
    backend: Arc<dyn TransactionBackend>,
    config: TransactionConfig,
    deadline: Instant,
    active: AtomicBool,
    state: Mutex<TxState>,
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("config", &self.config)
            .field("deadline", &self.deadline)
            .field("active", &self.active)
            .finish()
    }
}

impl Transaction {
    pub(crate) fn begin(backend: Arc<dyn TransactionBackend>, config: TransactionConfig) -> Self {
        let deadline = Instant::now() + config.timeout;
        Self {
            backend,
            config,
            deadline,
            active: AtomicBool::new(true),
            state: Mutex::new(TxState::default()),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn ensure_active(&self) -> RepositoryResult<()> {
        if !self.is_active() {
            return Err(RepositoryError::TransactionInactive);
        }
        if Instant::now() > self.deadline {
            return Err(RepositoryError::TransactionTimeout);
        }
        Ok(())
    }

    fn ensure_writable(&self) -> RepositoryResult<()> {
        self.ensure_active()?;
        if self.config.read_only {
            return Err(RepositoryError::UnsupportedOperation(
                "write in read-only transaction".into(),
            ));
        }
        Ok(())
    }

    /// Commits the staged writes. Idempotent: the second of
    /// commit/rollback observes `TransactionInactive` without touching
    /// state.
    pub async fn commit(&self) -> RepositoryResult<()> {
        if self
            .active
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(RepositoryError::TransactionInactive);
        }
        if Instant::now() > self.deadline {
            return Err(RepositoryError::TransactionTimeout);
        }
        let ops = {
            let mut state = self.state.lock();
            state.overlay.clear();
            std::mem::take(&mut state.ops)
        };
        if ops.is_empty() {
            return Ok(());
        }
        self.backend.apply(ops).await
    }

    /// Discards the staged writes. Same idempotence contract as
    /// [`Transaction::commit`].
    pub async fn rollback(&self) -> RepositoryResult<()> {
        if self
            .active
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(RepositoryError::TransactionInactive);
        }
        let mut state = self.state.lock();
        state.ops.clear();
        state.overlay.clear();
        Ok(())
    }

    /// The live store overlaid with this transaction's staged writes.
    fn effective_docs(
        base: Vec<Document>,
        overlay: &HashMap<(Collection, Uuid), Option<Document>>,
        collection: Collection,
    ) -> Vec<Document> {
        let mut seen: Vec<Uuid> = Vec::new();
        let mut docs: Vec<Document> = base
            .into_iter()
            .filter_map(|doc| {
                let id = document_id(&doc).ok()?;
                seen.push(id);
                match overlay.get(&(collection, id)) {
                    Some(Some(replacement)) => Some(replacement.clone()),
                    Some(None) => None,
                    None => Some(doc),
                }
            })
            .collect();
        for ((coll, id), entry) in overlay.iter() {
            if *coll == collection && !seen.contains(id) {
                if let Some(doc) = entry {
                    docs.push(doc.clone());
                }
            }
        }
        docs
    }

    fn expectation_for(
        overlay: &HashMap<(Collection, Uuid), Option<Document>>,
        base: &[Document],
        collection: Collection,
        id: Uuid,
    ) -> Expectation {
        if overlay.contains_key(&(collection, id)) {
            return Expectation::Staged;
        }
        match base
            .iter()
            .find(|doc| document_id(doc).ok() == Some(id))
        {
            Some(doc) => {
                Expectation::LastUpdated(query::get_field(doc, "last_updated").as_i64())
            }
            None => Expectation::Absent,
        }
    }
}

#[async_trait]
impl Repository for Transaction {
    async fn save(&self, collection: Collection, document: Document) -> RepositoryResult<Document> {
        self.ensure_writable()?;
        let object = document.as_object().ok_or_else(|| {
            RepositoryError::InvalidFilter("document must be a JSON object".into())
        })?;
        for field in object.keys() {
            if !collection.contains_field(field) {
                return Err(RepositoryError::InvalidFilter(format!(
                    "unknown field `{}` for collection `{}`",
                    field, collection
                )));
            }
        }
        let id = document_id(&document)?;

        let base = self.backend.scan(collection).await?;
        let mut state = self.state.lock();
        let expect = Self::expectation_for(&state.overlay, &base, collection, id);
        state.ops.push(StagedOp::Put {
            collection,
            id,
            document: document.clone(),
            expect,
        });
        state.overlay.insert((collection, id), Some(document.clone()));
        Ok(document)
    }

    async fn find_one(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> RepositoryResult<Option<Document>> {
        self.ensure_active()?;
        filter.validate_for(collection)?;
        let base = self.backend.scan(collection).await?;
        let state = self.state.lock();
        let mut matches: Vec<Document> =
            Self::effective_docs(base, &state.overlay, collection)
                .into_iter()
                .filter(|doc| query::matches_filter(doc, filter))
                .collect();
        query::sort_newest_first(&mut matches);
        Ok(matches.into_iter().next())
    }

    async fn find_many(
        &self,
        collection: Collection,
        filter: &Filter,
        cursor: &Cursor,
    ) -> RepositoryResult<Page> {
        self.ensure_active()?;
        filter.validate_for(collection)?;
        let base = self.backend.scan(collection).await?;
        let state = self.state.lock();
        let mut matches: Vec<Document> =
            Self::effective_docs(base, &state.overlay, collection)
                .into_iter()
                .filter(|doc| query::matches_filter(doc, filter))
                .collect();
        query::sort_newest_first(&mut matches);
        Ok(query::paginate(matches, cursor))
    }

    async fn update_fields(
        &self,
        collection: Collection,
        filter: &Filter,
        updates: &FieldMap,
    ) -> RepositoryResult<u64> {
        self.ensure_writable()?;
        filter.validate_for(collection)?;
        updates.validate_for(collection)?;
        let base = self.backend.scan(collection).await?;
        let now = now_unix();
        let mut state = self.state.lock();

        let matches: Vec<Document> = Self::effective_docs(base.clone(), &state.overlay, collection)
            .into_iter()
            .filter(|doc| query::matches_filter(doc, filter))
            .collect();

        let mut touched = 0u64;
        for doc in matches {
            let id = document_id(&doc)?;
            let mut updated = doc;
            query::apply_update_map(&mut updated, updates, now);
            let expect = Self::expectation_for(&state.overlay, &base, collection, id);
            state.ops.push(StagedOp::Put {
                collection,
                id,
                document: updated.clone(),
                expect,
            });
            state.overlay.insert((collection, id), Some(updated));
            touched += 1;
        }
        Ok(touched)
    }

    async fn increment_fields(
        &self,
        collection: Collection,
        filter: &Filter,
        increments: &FieldMap,
    ) -> RepositoryResult<u64> {
        self.ensure_writable()?;
        filter.validate_for(collection)?;
        increments.validate_for(collection)?;
        let base = self.backend.scan(collection).await?;
        let now = now_unix();
        let mut state = self.state.lock();

        let matches: Vec<Document> = Self::effective_docs(base.clone(), &state.overlay, collection)
            .into_iter()
            .filter(|doc| query::matches_filter(doc, filter))
            .collect();

        let mut touched = 0u64;
        for doc in matches {
            let id = document_id(&doc)?;
            let mut updated = doc;
            query::apply_increment_map(&mut updated, increments, now)?;
            let expect = Self::expectation_for(&state.overlay, &base, collection, id);
            state.ops.push(StagedOp::Put {
                collection,
                id,
                document: updated.clone(),
                expect,
            });
            state.overlay.insert((collection, id), Some(updated));
            touched += 1;
        }
        Ok(touched)
    }

    async fn delete(&self, collection: Collection, filter: &Filter) -> RepositoryResult<u64> {
        self.ensure_writable()?;
        filter.validate_for(collection)?;
        let base = self.backend.scan(collection).await?;
        let mut state = self.state.lock();

        let matches: Vec<Document> = Self::effective_docs(base.clone(), &state.overlay, collection)
            .into_iter()
            .filter(|doc| query::matches_filter(doc, filter))
            .collect();

        let mut removed = 0u64;
        for doc in matches {
            let id = document_id(&doc)?;
            let expect = Self::expectation_for(&state.overlay, &base, collection, id);
            state.ops.push(StagedOp::Remove {
                collection,
                id,
                expect,
            });
            state.overlay.insert((collection, id), None);
            removed += 1;
        }
        Ok(removed)
    }

    async fn update_with_ownership(
        &self,
        collection: Collection,
        id: Uuid,
        owner_id: Uuid,
        updates: &FieldMap,
    ) -> RepositoryResult<()> {
        let filter = Filter::by_id(id).eq(collection.owner_field(), FieldValue::Uuid(owner_id));
        match self.update_fields(collection, &filter, updates).await? {
            0 => Err(RepositoryError::NotFound),
            _ => Ok(()),
        }
    }

    async fn delete_with_ownership(
        &self,
        collection: Collection,
        id: Uuid,
        owner_id: Uuid,
    ) -> RepositoryResult<()> {
        let filter = Filter::by_id(id).eq(collection.owner_field(), FieldValue::Uuid(owner_id));
        match self.delete(collection, &filter).await? {
            0 => Err(RepositoryError::NotFound),
            _ => Ok(()),
        }
    }

    async fn count(&self, collection: Collection, filter: &Filter) -> RepositoryResult<u64> {
        self.ensure_active()?;
        filter.validate_for(collection)?;
        let base = self.backend.scan(collection).await?;
        let state = self.state.lock();
        Ok(Self::effective_docs(base, &state.overlay, collection)
            .into_iter()
            .filter(|doc| query::matches_filter(doc, filter))
            .count() as u64)
    }

    async fn create_index(
        &self,
        _collection: Collection,
        _index: IndexSpec,
    ) -> RepositoryResult<()> {
        Err(RepositoryError::UnsupportedOperation(
            "create_index inside a transaction".into(),
        ))
    }

    async fn begin_transaction(
        &self,
        _config: TransactionConfig,
    ) -> RepositoryResult<Transaction> {
        Err(RepositoryError::NestedTransaction)
    }
}

/// Runs `op` against a fresh transaction: commits on `Ok`, rolls back on
/// `Err`, and retries the whole closure per the configured policy when the
/// failure is retryable.
pub async fn with_transaction<T, F>(
    repo: &dyn Repository,
    config: TransactionConfig,
    op: F,
) -> RepositoryResult<T>
where
    T: Send,
    F: for<'t> Fn(&'t Transaction) -> BoxFuture<'t, RepositoryResult<T>> + Send + Sync,
{
    let policy = config.retry.clone();
    let mut attempt = 0u32;
    loop {
        let tx = repo.begin_transaction(config.clone()).await?;
        let err = match op(&tx).await {
            Ok(value) => match tx.commit().await {
                Ok(()) => return Ok(value),
                Err(err) => err,
            },
            Err(err) => {
                // Best effort: the transaction may already be inactive.
                let _ = tx.rollback().await;
                err
            }
        };

        if policy.is_retryable(&err) && attempt < policy.max_retries {
            tokio::time::sleep(policy.backoff(attempt)).await;
            attempt += 1;
            continue;
        }
        return Err(err);
    }
}
