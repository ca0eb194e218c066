//! In-process rate limiter
//!
//! Fixed-window counters keyed by `(actor, action)`. The outer map sits
//! behind a read-write lock; each entry carries its own mutex so hot keys
//! do not serialize unrelated actors. State is process-local; a shared
//! cache collaborator may back this for multi-replica deployments, and a
//! cache failure degrades to "allow".

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Actions with independent budgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Signup,
    Login,
    Verification,
    PasswordReset,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Signup => "signup",
            Action::Login => "login",
            Action::Verification => "verification",
            Action::PasswordReset => "password_reset",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Budget for one `(actor, action)` window.
#[derive(Debug, Clone, Copy)]
pub struct Quota {
    pub max: u32,
    pub window: Duration,
}

impl Quota {
    pub fn new(max: u32, window: Duration) -> Self {
        Self { max, window }
    }
}

struct Entry {
    count: u32,
    window_start: Instant,
}

/// Seconds to wait before the window reopens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryAfter(pub u64);

#[derive(Default)]
pub struct RateLimiter {
    entries: RwLock<HashMap<(String, Action), Arc<Mutex<Entry>>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, key: &str, action: Action) -> Arc<Mutex<Entry>> {
        if let Some(entry) = self.entries.read().get(&(key.to_string(), action)) {
            return entry.clone();
        }
        let mut entries = self.entries.write();
        entries
            .entry((key.to_string(), action))
            .or_insert_with(|| {
                Arc::new(Mutex::new(Entry {
                    count: 0,
                    window_start: Instant::now(),
                }))
            })
            .clone()
    }

    /// Consumes one attempt. The `quota.max`-th call in a window is
    /// allowed; the next one is rejected with the time until the window
    /// reopens.
    pub fn check(&self, key: &str, action: Action, quota: Quota) -> Result<(), RetryAfter> {
        let entry = self.entry(key, action);
        let mut entry = entry.lock();
        let now = Instant::now();

        if now.duration_since(entry.window_start) >= quota.window {
            entry.count = 0;
            entry.window_start = now;
        }

        if entry.count >= quota.max {
            let elapsed = now.duration_since(entry.window_start);
            let retry_after = quota.window.saturating_sub(elapsed).as_secs().max(1);
            debug!(key = %key, action = %action, "Rate limit exceeded");
            return Err(RetryAfter(retry_after));
        }

        entry.count += 1;
        Ok(())
    }

    /// Clears the window for an actor, e.g. after a successful
    /// verification.
    pub fn reset(&self, key: &str, action: Action) {
        self.entries
            .write()
            .remove(&(key.to_string(), action));
    }

    /// Drops entries idle longer than `max_age`.
    pub fn cleanup(&self, max_age: Duration) {
        let now = Instant::now();
        self.entries
            .write()
            .retain(|_, entry| now.duration_since(entry.lock().window_start) < max_age);
    }

    /// Periodic cleanup at half the window length.
    pub fn spawn_cleanup(self: &Arc<Self>, window: Duration) -> tokio::task::JoinHandle<()> {
        let limiter = Arc::clone(self);
        let period = (window / 2).max(Duration::from_secs(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                limiter.cleanup(window * 2);
            }
        })
    }
}
