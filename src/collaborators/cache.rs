use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

/// Optional shared cache for multi-replica deployments.
///
/// Access is best-effort by contract: callers treat a miss or an error as
/// "allow" (rate limiting) or "compute" (validation), never as "deny", so
/// a broken cache degrades availability of the cache, not of auth.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> bool;
    async fn delete(&self, key: &str) -> bool;
    /// Adds a member to a set; returns false if it was already present.
    async fn set_add(&self, set: &str, member: &str, ttl: Duration) -> bool;
    async fn set_is_member(&self, set: &str, member: &str) -> bool;
    async fn increment(&self, key: &str, delta: i64) -> Option<i64>;
}

#[derive(Default)]
struct CacheState {
    values: HashMap<String, (String, Option<Instant>)>,
    sets: HashMap<String, (HashSet<String>, Option<Instant>)>,
    counters: HashMap<String, i64>,
}

impl CacheState {
    fn prune(&mut self, now: Instant) {
        self.values
            .retain(|_, (_, expiry)| expiry.map_or(true, |at| at > now));
        self.sets
            .retain(|_, (_, expiry)| expiry.map_or(true, |at| at > now));
    }
}

/// Process-local cache, the single-replica default.
#[derive(Default)]
pub struct MemoryCache {
    state: RwLock<CacheState>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        let mut state = self.state.write();
        state.prune(now);
        state.values.get(key).map(|(value, _)| value.clone())
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> bool {
        let mut state = self.state.write();
        state
            .values
            .insert(key.to_string(), (value.to_string(), Some(Instant::now() + ttl)));
        true
    }

    async fn delete(&self, key: &str) -> bool {
        let mut state = self.state.write();
        state.values.remove(key).is_some()
    }

    async fn set_add(&self, set: &str, member: &str, ttl: Duration) -> bool {
        let now = Instant::now();
        let mut state = self.state.write();
        state.prune(now);
        let (members, expiry) = state
            .sets
            .entry(set.to_string())
            .or_insert_with(|| (HashSet::new(), None));
        *expiry = Some(now + ttl);
        members.insert(member.to_string())
    }

    async fn set_is_member(&self, set: &str, member: &str) -> bool {
        let now = Instant::now();
        let mut state = self.state.write();
        state.prune(now);
        state
            .sets
            .get(set)
            .map(|(members, _)| members.contains(member))
            .unwrap_or(false)
    }

    async fn increment(&self, key: &str, delta: i64) -> Option<i64> {
        let mut state = self.state.write();
        let counter = state.counters.entry(key.to_string()).or_insert(0);
        *counter += delta;
        Some(*counter)
    }
}
