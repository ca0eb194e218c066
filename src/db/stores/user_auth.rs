use crate::db::models::{Entity, UserAuth};
use crate::db::repository::{
    Collection, FieldMap, FieldValue, Filter, Repository, RepositoryResult,
};
use uuid::Uuid;

/// Entity-level access to the `userAuth` collection.
pub struct UserAuthStore;

impl UserAuthStore {
    pub async fn insert(repo: &dyn Repository, user: &UserAuth) -> RepositoryResult<UserAuth> {
        let saved = repo
            .save(Collection::UserAuth, user.to_document()?)
            .await?;
        UserAuth::from_document(saved)
    }

    pub async fn find_by_id(
        repo: &dyn Repository,
        id: Uuid,
    ) -> RepositoryResult<Option<UserAuth>> {
        let doc = repo
            .find_one(Collection::UserAuth, &Filter::by_id(id))
            .await?;
        doc.map(UserAuth::from_document).transpose()
    }

    pub async fn find_by_username(
        repo: &dyn Repository,
        username: &str,
    ) -> RepositoryResult<Option<UserAuth>> {
        let filter = Filter::new().eq("username", FieldValue::String(username.to_string()));
        let doc = repo.find_one(Collection::UserAuth, &filter).await?;
        doc.map(UserAuth::from_document).transpose()
    }

    /// Replaces the stored bcrypt hash.
    pub async fn update_password(
        repo: &dyn Repository,
        id: Uuid,
        password_hash: &str,
    ) -> RepositoryResult<()> {
        let updates =
            FieldMap::new().set("password", FieldValue::String(password_hash.to_string()));
        match repo
            .update_fields(Collection::UserAuth, &Filter::by_id(id), &updates)
            .await?
        {
            0 => Err(crate::db::repository::RepositoryError::NotFound),
            _ => Ok(()),
        }
    }

    /// Records the `jti` of the most recently minted bearer token.
    pub async fn set_access_token_id(
        repo: &dyn Repository,
        id: Uuid,
        jti: &str,
    ) -> RepositoryResult<()> {
        let updates =
            FieldMap::new().set("access_token_id", FieldValue::String(jti.to_string()));
        match repo
            .update_fields(Collection::UserAuth, &Filter::by_id(id), &updates)
            .await?
        {
            0 => Err(crate::db::repository::RepositoryError::NotFound),
            _ => Ok(()),
        }
    }

    /// Tombstones the account; the row stays for audit but is invisible
    /// to every ordinary lookup.
    pub async fn tombstone(repo: &dyn Repository, id: Uuid) -> RepositoryResult<()> {
        let updates = FieldMap::new().set("deleted", FieldValue::Bool(true));
        match repo
            .update_fields(Collection::UserAuth, &Filter::by_id(id), &updates)
            .await?
        {
            0 => Err(crate::db::repository::RepositoryError::NotFound),
            _ => Ok(()),
        }
    }
}
