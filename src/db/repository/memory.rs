//! In-memory reference backend
//!
//! Process-local document store behind a read-write lock. It enforces the
//! same contracts a production backend would: unique indexes, soft-delete
//! visibility, ownership predicates and atomic transaction application.
//! Every test in the crate runs against this backend.

use super::error::{RepositoryError, RepositoryResult};
use super::query;
use super::transaction::{Expectation, StagedOp, Transaction, TransactionBackend};
use super::types::{
    document_id, Collection, Cursor, Document, FieldMap, FieldValue, Filter, IndexSpec, Page,
    TransactionConfig,
};
use super::Repository;
use crate::db::models::now_unix;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Default)]
struct State {
    collections: HashMap<Collection, HashMap<Uuid, Document>>,
    indexes: HashMap<Collection, Vec<IndexSpec>>,
}

impl State {
    fn docs(&self, collection: Collection) -> impl Iterator<Item = (&Uuid, &Document)> {
        self.collections
            .get(&collection)
            .into_iter()
            .flat_map(|map| map.iter())
    }

    fn unique_indexes(&self, collection: Collection) -> impl Iterator<Item = &IndexSpec> {
        self.indexes
            .get(&collection)
            .into_iter()
            .flat_map(|specs| specs.iter())
            .filter(|spec| spec.unique)
    }

    /// Rejects a candidate document that collides with a live document on
    /// any unique index. Tombstoned documents do not reserve keys.
    fn check_unique(
        &self,
        collection: Collection,
        candidate: &Document,
        candidate_id: Uuid,
    ) -> RepositoryResult<()> {
        for spec in self.unique_indexes(collection) {
            let value = query::get_field(candidate, spec.field);
            if value.is_null() {
                continue;
            }
            for (id, other) in self.docs(collection) {
                if *id != candidate_id
                    && !query::is_deleted(other)
                    && query::get_field(other, spec.field) == value
                {
                    return Err(RepositoryError::DuplicateKey(spec.field.to_string()));
                }
            }
        }
        Ok(())
    }
}

pub(super) struct Inner {
    state: RwLock<State>,
}

/// The in-memory [`Repository`] implementation.
#[derive(Clone)]
pub struct MemoryRepository {
    inner: Arc<Inner>,
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                state: RwLock::new(State::default()),
            }),
        }
    }
}

fn validate_document(collection: Collection, document: &Document) -> RepositoryResult<Uuid> {
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
    document_id(document)
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn save(&self, collection: Collection, document: Document) -> RepositoryResult<Document> {
        let id = validate_document(collection, &document)?;
        let mut state = self.inner.state.write();
        state.check_unique(collection, &document, id)?;
        state
            .collections
            .entry(collection)
            .or_default()
            .insert(id, document.clone());
        Ok(document)
    }

    async fn find_one(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> RepositoryResult<Option<Document>> {
        filter.validate_for(collection)?;
        let state = self.inner.state.read();
        let mut matches: Vec<Document> = state
            .docs(collection)
            .filter(|(_, doc)| query::matches_filter(doc, filter))
            .map(|(_, doc)| doc.clone())
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
        filter.validate_for(collection)?;
        let state = self.inner.state.read();
        let mut matches: Vec<Document> = state
            .docs(collection)
            .filter(|(_, doc)| query::matches_filter(doc, filter))
            .map(|(_, doc)| doc.clone())
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
        filter.validate_for(collection)?;
        updates.validate_for(collection)?;
        let now = now_unix();
        let mut state = self.inner.state.write();

        let ids: Vec<Uuid> = state
            .docs(collection)
            .filter(|(_, doc)| query::matches_filter(doc, filter))
            .map(|(id, _)| *id)
            .collect();

        for id in &ids {
            let Some(mut updated) = state
                .collections
                .get(&collection)
                .and_then(|map| map.get(id))
                .cloned()
            else {
                continue;
            };
            query::apply_update_map(&mut updated, updates, now);
            state.check_unique(collection, &updated, *id)?;
            state
                .collections
                .entry(collection)
                .or_default()
                .insert(*id, updated);
        }
        Ok(ids.len() as u64)
    }

    async fn increment_fields(
        &self,
        collection: Collection,
        filter: &Filter,
        increments: &FieldMap,
    ) -> RepositoryResult<u64> {
        filter.validate_for(collection)?;
        increments.validate_for(collection)?;
        let now = now_unix();
        let mut state = self.inner.state.write();

        let ids: Vec<Uuid> = state
            .docs(collection)
            .filter(|(_, doc)| query::matches_filter(doc, filter))
            .map(|(id, _)| *id)
            .collect();

        for id in &ids {
            let Some(mut updated) = state
                .collections
                .get(&collection)
                .and_then(|map| map.get(id))
                .cloned()
            else {
                continue;
            };
            query::apply_increment_map(&mut updated, increments, now)?;
            state
                .collections
                .entry(collection)
                .or_default()
                .insert(*id, updated);
        }
        Ok(ids.len() as u64)
    }

    async fn delete(&self, collection: Collection, filter: &Filter) -> RepositoryResult<u64> {
        filter.validate_for(collection)?;
        let mut state = self.inner.state.write();
        let ids: Vec<Uuid> = state
            .docs(collection)
            .filter(|(_, doc)| query::matches_filter(doc, filter))
            .map(|(id, _)| *id)
            .collect();
        if let Some(map) = state.collections.get_mut(&collection) {
            for id in &ids {
                map.remove(id);
            }
        }
        Ok(ids.len() as u64)
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
        filter.validate_for(collection)?;
        let state = self.inner.state.read();
        Ok(state
            .docs(collection)
            .filter(|(_, doc)| query::matches_filter(doc, filter))
            .count() as u64)
    }

    async fn create_index(
        &self,
        collection: Collection,
        index: IndexSpec,
    ) -> RepositoryResult<()> {
        if !collection.contains_field(index.field) {
            return Err(RepositoryError::InvalidFilter(format!(
                "unknown field `{}` for collection `{}`",
                index.field, collection
            )));
        }
        let mut state = self.inner.state.write();
        let specs = state.indexes.entry(collection).or_default();
        if !specs.contains(&index) {
            specs.push(index);
        }
        Ok(())
    }

    async fn begin_transaction(&self, config: TransactionConfig) -> RepositoryResult<Transaction> {
        Ok(Transaction::begin(self.inner.clone(), config))
    }
}

#[async_trait]
impl TransactionBackend for Inner {
    async fn scan(&self, collection: Collection) -> RepositoryResult<Vec<Document>> {
        let state = self.state.read();
        Ok(state.docs(collection).map(|(_, doc)| doc.clone()).collect())
    }

    /// Applies a commit's staged operations atomically: all expectations
    /// and unique indexes are validated against the live state before the
    /// first write lands.
    async fn apply(&self, ops: Vec<StagedOp>) -> RepositoryResult<()> {
        let mut state = self.state.write();

        // Phase 1: resolve each op against the live state + earlier ops.
        let mut pending: HashMap<(Collection, Uuid), Option<Document>> = HashMap::new();
        for op in &ops {
            let (collection, id, expect) = match op {
                StagedOp::Put {
                    collection,
                    id,
                    expect,
                    ..
                }
                | StagedOp::Remove {
                    collection,
                    id,
                    expect,
                } => (*collection, *id, expect),
            };

            let live = state
                .collections
                .get(&collection)
                .and_then(|map| map.get(&id));
            match expect {
                Expectation::Absent => {
                    if live.is_some() || matches!(pending.get(&(collection, id)), Some(Some(_))) {
                        return Err(RepositoryError::TransactionConflict);
                    }
                }
                Expectation::LastUpdated(expected) => {
                    let current = live
                        .map(|doc| query::get_field(doc, "last_updated").as_i64())
                        .ok_or(RepositoryError::TransactionConflict)?;
                    if current != *expected {
                        return Err(RepositoryError::TransactionConflict);
                    }
                }
                // An earlier op in this transaction already validated the
                // document against the live state.
                Expectation::Staged => {}
            }

            match op {
                StagedOp::Put { document, .. } => {
                    pending.insert((collection, id), Some(document.clone()));
                }
                StagedOp::Remove { .. } => {
                    pending.insert((collection, id), None);
                }
            }
        }

        // Phase 2: unique-index validation over the effective view.
        for ((collection, id), entry) in &pending {
            let candidate = match entry {
                Some(doc) if !query::is_deleted(doc) => doc,
                _ => continue,
            };
            for spec in state.unique_indexes(*collection) {
                let value = query::get_field(candidate, spec.field);
                if value.is_null() {
                    continue;
                }
                // Live documents not overridden by this commit.
                for (other_id, other) in state.docs(*collection) {
                    if other_id != id
                        && !pending.contains_key(&(*collection, *other_id))
                        && !query::is_deleted(other)
                        && query::get_field(other, spec.field) == value
                    {
                        return Err(RepositoryError::DuplicateKey(spec.field.to_string()));
                    }
                }
                // Other documents written by this same commit.
                for ((other_collection, other_id), other_entry) in &pending {
                    if other_collection == collection && other_id != id {
                        if let Some(other) = other_entry {
                            if !query::is_deleted(other)
                                && query::get_field(other, spec.field) == value
                            {
                                return Err(RepositoryError::DuplicateKey(
                                    spec.field.to_string(),
                                ));
                            }
                        }
                    }
                }
            }
        }

        // Phase 3: write.
        for ((collection, id), entry) in pending {
            let map = state.collections.entry(collection).or_default();
            match entry {
                Some(doc) => {
                    map.insert(id, doc);
                }
                None => {
                    map.remove(&id);
                }
            }
        }
        Ok(())
    }
}
