//! Expired-record reaper
//!
//! Periodic task that hard-deletes `userVerification` and `resetToken`
//! rows whose expiry is older than the grace window. Failures are logged
//! and the next tick retries; the reaper never takes the process down.

use crate::db::models::now_unix;
use crate::db::repository::Repository;
use crate::db::stores::{ResetTokenStore, VerificationStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub fn spawn(
    repo: Arc<dyn Repository>,
    interval: Duration,
    grace_secs: i64,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let cutoff = now_unix() - grace_secs;

            match VerificationStore::purge_expired(repo.as_ref(), cutoff).await {
                Ok(0) => {}
                Ok(purged) => debug!(purged, "Reaped expired verification records"),
                Err(e) => warn!(error = %e, "Verification reap failed"),
            }
            match ResetTokenStore::purge_expired(repo.as_ref(), cutoff).await {
                Ok(0) => {}
                Ok(purged) => debug!(purged, "Reaped expired reset tokens"),
                Err(e) => warn!(error = %e, "Reset token reap failed"),
            }
        }
    })
}
