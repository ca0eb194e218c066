use crate::db::models::{now_unix, Entity, UserVerification};
use crate::db::repository::{
    Collection, FieldMap, FieldValue, Filter, Repository, RepositoryError, RepositoryResult,
};
use uuid::Uuid;

/// Entity-level access to the `userVerification` collection.
pub struct VerificationStore;

impl VerificationStore {
    pub async fn insert(
        repo: &dyn Repository,
        verification: &UserVerification,
    ) -> RepositoryResult<UserVerification> {
        let saved = repo
            .save(Collection::UserVerification, verification.to_document()?)
            .await?;
        UserVerification::from_document(saved)
    }

    pub async fn find_by_id(
        repo: &dyn Repository,
        id: Uuid,
    ) -> RepositoryResult<Option<UserVerification>> {
        let doc = repo
            .find_one(Collection::UserVerification, &Filter::by_id(id))
            .await?;
        doc.map(UserVerification::from_document).transpose()
    }

    /// Bumps the wrong-code attempt counter.
    pub async fn increment_counter(repo: &dyn Repository, id: Uuid) -> RepositoryResult<()> {
        let increments = FieldMap::new().set("counter", FieldValue::Int64(1));
        match repo
            .increment_fields(Collection::UserVerification, &Filter::by_id(id), &increments)
            .await?
        {
            0 => Err(RepositoryError::NotFound),
            _ => Ok(()),
        }
    }

    /// Marks the record verified and consumed. Runs inside the
    /// signup-completion transaction. The `used=false` predicate is what
    /// makes consumption at-most-once: a lost race touches zero rows and
    /// surfaces as `NotFound`.
    pub async fn mark_used(repo: &dyn Repository, id: Uuid) -> RepositoryResult<()> {
        let filter = Filter::by_id(id).eq("used", FieldValue::Bool(false));
        let updates = FieldMap::new()
            .set("is_verified", FieldValue::Bool(true))
            .set("used", FieldValue::Bool(true))
            .set("last_updated", FieldValue::Timestamp(now_unix()));
        match repo
            .update_fields(Collection::UserVerification, &filter, &updates)
            .await?
        {
            0 => Err(RepositoryError::NotFound),
            _ => Ok(()),
        }
    }

    /// Installs a fresh code and expiry on resend.
    pub async fn refresh_code(
        repo: &dyn Repository,
        id: Uuid,
        code: &str,
        expires_at: i64,
    ) -> RepositoryResult<()> {
        let updates = FieldMap::new()
            .set("code", FieldValue::String(code.to_string()))
            .set("expires_at", FieldValue::Timestamp(expires_at));
        match repo
            .update_fields(Collection::UserVerification, &Filter::by_id(id), &updates)
            .await?
        {
            0 => Err(RepositoryError::NotFound),
            _ => Ok(()),
        }
    }

    /// Hard-deletes records whose expiry is older than the cutoff,
    /// tombstoned or not. Used by the reaper.
    pub async fn purge_expired(repo: &dyn Repository, cutoff: i64) -> RepositoryResult<u64> {
        let filter = Filter::new()
            .lt("expires_at", FieldValue::Timestamp(cutoff))
            .include_deleted();
        repo.delete(Collection::UserVerification, &filter).await
    }
}
