//! In-memory state store provider
//!
//! Keeps entries in a concurrent map with a per-key deadline. Expired entries
//! are dropped lazily on access and by [`MemoryStateStore::purge_expired`].
//!
//! **Important**: this store is NOT distributed. Breakers in the same process
//! that share one `MemoryStateStore` see each other's state; separate
//! processes do not. Tests use it to stand in for a shared backend.

use crate::constants::keys;
use crate::state_store::errors::{StateStoreError, StateStoreResult};
use crate::state_store::traits::StateStore;
use dashmap::DashMap;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone)]
struct StoredValue {
    value: String,
    expires_at: Option<Instant>,
}

impl StoredValue {
    fn new(value: String, ttl: Duration) -> Self {
        let expires_at = if ttl.is_zero() {
            None
        } else {
            Some(Instant::now() + ttl)
        };
        Self { value, expires_at }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}

/// Process-local state store with per-key TTL
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    entries: DashMap<String, StoredValue>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Number of live (unexpired) entries
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.iter().filter(|e| !e.is_expired(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every expired entry, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, stored| !stored.is_expired(now));
        before.saturating_sub(self.entries.len())
    }
}

impl StateStore for MemoryStateStore {
    fn get(&self, namespace: &str, key: &str) -> StateStoreResult<Option<String>> {
        let qualified = keys::qualified(namespace, key);
        let now = Instant::now();

        let hit = match self.entries.get(&qualified) {
            Some(stored) if !stored.is_expired(now) => Some(stored.value.clone()),
            Some(_) => None,
            None => return Ok(None),
        };

        if hit.is_none() {
            self.entries.remove_if(&qualified, |_, stored| stored.is_expired(now));
            debug!(key = %qualified, "State store entry expired");
        }

        Ok(hit)
    }

    fn set(&self, namespace: &str, key: &str, value: &str, ttl: Duration) -> StateStoreResult<()> {
        let qualified = keys::qualified(namespace, key);
        debug!(key = %qualified, ttl_seconds = ttl.as_secs(), "State store SET");
        self.entries
            .insert(qualified, StoredValue::new(value.to_string(), ttl));
        Ok(())
    }

    fn delete(&self, namespace: &str, key: &str) -> StateStoreResult<()> {
        self.entries.remove(&keys::qualified(namespace, key));
        Ok(())
    }

    fn increment(&self, namespace: &str, key: &str, ttl: Duration) -> StateStoreResult<i64> {
        let qualified = keys::qualified(namespace, key);
        let now = Instant::now();

        let mut entry = self
            .entries
            .entry(qualified.clone())
            .or_insert_with(|| StoredValue::new("0".to_string(), ttl));

        if entry.is_expired(now) {
            *entry = StoredValue::new("0".to_string(), ttl);
        }

        let current: i64 = entry.value.parse().map_err(|_| {
            StateStoreError::SerializationError(format!(
                "value at {qualified} is not an integer counter"
            ))
        })?;
        let next = current.saturating_add(1);
        entry.value = next.to_string();
        Ok(next)
    }

    fn health_check(&self) -> StateStoreResult<bool> {
        Ok(true)
    }

    fn provider_name(&self) -> &'static str {
        "memory"
    }
}
