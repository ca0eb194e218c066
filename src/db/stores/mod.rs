//! Typed stores over the document repository
//!
//! Thin entity-speaking wrappers: each store is a unit struct whose
//! methods take the repository handle as their first argument, so the same
//! code path runs against the live store and against a transaction handle.

mod profile;
mod reset_token;
mod user_auth;
mod verification;

pub use profile::ProfileStore;
pub use reset_token::ResetTokenStore;
pub use user_auth::UserAuthStore;
pub use verification::VerificationStore;

use crate::db::repository::{Collection, IndexSpec, Repository, RepositoryResult};

/// Declares the indexes the credential store relies on. Run once at
/// startup, before any traffic.
pub async fn ensure_indexes(repo: &dyn Repository) -> RepositoryResult<()> {
    repo.create_index(Collection::UserAuth, IndexSpec::unique("username"))
        .await?;
    repo.create_index(Collection::UserVerification, IndexSpec::plain("expires_at"))
        .await?;
    repo.create_index(Collection::ResetToken, IndexSpec::unique("hashed_token"))
        .await?;
    repo.create_index(Collection::ResetToken, IndexSpec::plain("expires_at"))
        .await?;
    Ok(())
}
