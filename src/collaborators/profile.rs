use crate::db::models::UserProfile;
use crate::db::repository::Repository;
use crate::db::stores::ProfileStore;
use crate::error::Result;
use async_trait::async_trait;
use uuid::Uuid;

/// Profile bootstrap seam. The repository handle is threaded through so
/// the signup-time insert participates in the verification transaction:
/// if profile creation fails, the whole account creation rolls back.
#[async_trait]
pub trait ProfileCreator: Send + Sync {
    async fn create_profile_on_signup(
        &self,
        repo: &dyn Repository,
        profile: &UserProfile,
    ) -> Result<()>;

    async fn get_profile(
        &self,
        repo: &dyn Repository,
        user_id: Uuid,
    ) -> Result<Option<UserProfile>>;
}

/// Default implementation writing through the credential store.
pub struct StoreProfileCreator;

#[async_trait]
impl ProfileCreator for StoreProfileCreator {
    async fn create_profile_on_signup(
        &self,
        repo: &dyn Repository,
        profile: &UserProfile,
    ) -> Result<()> {
        ProfileStore::insert(repo, profile).await?;
        Ok(())
    }

    async fn get_profile(
        &self,
        repo: &dyn Repository,
        user_id: Uuid,
    ) -> Result<Option<UserProfile>> {
        Ok(ProfileStore::find_by_id(repo, user_id).await?)
    }
}
