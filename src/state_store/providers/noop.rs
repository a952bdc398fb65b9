//! No-op state store provider
//!
//! Always returns None/success. Used when state sharing is disabled.

use crate::state_store::errors::StateStoreResult;
use crate::state_store::traits::StateStore;
use std::time::Duration;

/// No-op state store that never stores anything
///
/// All reads return None, all writes succeed silently. Counters never
/// accumulate: `increment` always reports 1.
#[derive(Debug, Clone, Default)]
pub struct NoOpStateStore;

impl NoOpStateStore {
    /// Create a new no-op state store
    pub fn new() -> Self {
        Self
    }
}

impl StateStore for NoOpStateStore {
    fn get(&self, _namespace: &str, _key: &str) -> StateStoreResult<Option<String>> {
        Ok(None)
    }

    fn set(&self, _namespace: &str, _key: &str, _value: &str, _ttl: Duration) -> StateStoreResult<()> {
        Ok(())
    }

    fn delete(&self, _namespace: &str, _key: &str) -> StateStoreResult<()> {
        Ok(())
    }

    fn increment(&self, _namespace: &str, _key: &str, _ttl: Duration) -> StateStoreResult<i64> {
        Ok(1)
    }

    fn health_check(&self) -> StateStoreResult<bool> {
        Ok(true)
    }

    fn provider_name(&self) -> &'static str {
        "noop"
    }
}
