use crate::db::models::{Entity, UserProfile};
use crate::db::repository::{Collection, Filter, Repository, RepositoryResult};
use uuid::Uuid;

/// Entity-level access to the `userProfile` collection.
pub struct ProfileStore;

impl ProfileStore {
    pub async fn insert(
        repo: &dyn Repository,
        profile: &UserProfile,
    ) -> RepositoryResult<UserProfile> {
        let saved = repo
            .save(Collection::UserProfile, profile.to_document()?)
            .await?;
        UserProfile::from_document(saved)
    }

    pub async fn find_by_id(
        repo: &dyn Repository,
        id: Uuid,
    ) -> RepositoryResult<Option<UserProfile>> {
        let doc = repo
            .find_one(Collection::UserProfile, &Filter::by_id(id))
            .await?;
        doc.map(UserProfile::from_document).transpose()
    }
}
