//! State store trait definition

use super::errors::StateStoreResult;
use std::time::Duration;

/// Key-value operations required by the resilience core
///
/// Implementations must be safe to share between threads; the registry holds
/// a single `Arc<dyn StateStore>` that every breaker and orchestrated call
/// reads from. No transactional discipline is assumed: each write is a single
/// `set` with a TTL, and readers tolerate absence.
pub trait StateStore: Send + Sync + std::fmt::Debug {
    /// Get a value by namespace and key
    ///
    /// Returns `Ok(Some(value))` on hit, `Ok(None)` when absent or expired.
    fn get(&self, namespace: &str, key: &str) -> StateStoreResult<Option<String>>;

    /// Set a value with a TTL (`Duration::ZERO` means no expiry)
    fn set(&self, namespace: &str, key: &str, value: &str, ttl: Duration) -> StateStoreResult<()>;

    /// Delete a key; deleting an absent key succeeds
    fn delete(&self, namespace: &str, key: &str) -> StateStoreResult<()>;

    /// Atomically increment an integer counter, creating it at 1 with `ttl`
    /// when absent. Returns the value after the increment.
    fn increment(&self, namespace: &str, key: &str, ttl: Duration) -> StateStoreResult<i64>;

    /// Check if the backend is healthy
    fn health_check(&self) -> StateStoreResult<bool>;

    /// Get the name of the store provider
    fn provider_name(&self) -> &'static str;

    /// Whether writes are visible to other processes
    fn is_distributed(&self) -> bool {
        false
    }
}
