use crate::db::models::{Entity, ResetToken};
use crate::db::repository::{
    Collection, FieldMap, FieldValue, Filter, Repository, RepositoryError, RepositoryResult,
};
use uuid::Uuid;

/// Entity-level access to the `resetToken` collection.
pub struct ResetTokenStore;

impl ResetTokenStore {
    pub async fn insert(
        repo: &dyn Repository,
        token: &ResetToken,
    ) -> RepositoryResult<ResetToken> {
        let saved = repo
            .save(Collection::ResetToken, token.to_document()?)
            .await?;
        ResetToken::from_document(saved)
    }

    /// Live (unused, unexpired) reset record for the given token hash.
    pub async fn find_live_by_hash(
        repo: &dyn Repository,
        hashed_token: &str,
        now: i64,
    ) -> RepositoryResult<Option<ResetToken>> {
        let filter = Filter::new()
            .eq("hashed_token", FieldValue::String(hashed_token.to_string()))
            .eq("used", FieldValue::Bool(false))
            .gt("expires_at", FieldValue::Timestamp(now));
        let doc = repo.find_one(Collection::ResetToken, &filter).await?;
        doc.map(ResetToken::from_document).transpose()
    }

    /// Consumes the token. The `used=false` predicate makes the mutation
    /// atomic: of two racing resets, exactly one sees a touched row.
    pub async fn mark_used(repo: &dyn Repository, id: Uuid) -> RepositoryResult<()> {
        let filter = Filter::by_id(id).eq("used", FieldValue::Bool(false));
        let updates = FieldMap::new().set("used", FieldValue::Bool(true));
        match repo
            .update_fields(Collection::ResetToken, &filter, &updates)
            .await?
        {
            0 => Err(RepositoryError::NotFound),
            _ => Ok(()),
        }
    }

    /// Consumes every live reset token for an address. Run after a
    /// successful reset so no sibling token from a second forget request
    /// can complete again.
    pub async fn consume_all_for_email(
        repo: &dyn Repository,
        email: &str,
    ) -> RepositoryResult<u64> {
        let filter = Filter::new()
            .eq("email", FieldValue::String(email.to_string()))
            .eq("used", FieldValue::Bool(false));
        let updates = FieldMap::new().set("used", FieldValue::Bool(true));
        repo.update_fields(Collection::ResetToken, &filter, &updates)
            .await
    }

    /// Hard-deletes records whose expiry is older than the cutoff. Used by
    /// the reaper.
    pub async fn purge_expired(repo: &dyn Repository, cutoff: i64) -> RepositoryResult<u64> {
        let filter = Filter::new()
            .lt("expires_at", FieldValue::Timestamp(cutoff))
            .include_deleted();
        repo.delete(Collection::ResetToken, &filter).await
    }
}
