//! # Shared State Store
//!
//! Key-value contract the resilience core uses to share circuit breaker state
//! across processes and to hold cached results.
//!
//! ## Architecture
//!
//! ```text
//! Arc<dyn StateStore>
//!   ├── MemoryStateStore  <- process-local, per-key TTL (dashmap)
//!   └── NoOpStateStore    <- always miss, always succeed
//! ```
//!
//! ## Design Decisions
//!
//! - **Synchronous contract**: the breaker reads the store during admission,
//!   which must not be a suspension point
//! - **Namespaced keys**: every operation takes a namespace and a key; flat
//!   backends join them as `namespace:key`
//! - **Best-effort writes**: callers in this crate log store errors and carry on

pub mod errors;
pub mod providers;
pub mod traits;

pub use errors::{StateStoreError, StateStoreResult};
pub use providers::{MemoryStateStore, NoOpStateStore};
pub use traits::StateStore;

use std::sync::Arc;
use tracing::{info, warn};

/// Build a store from a backend name, degrading to the no-op store on
/// unknown names so that startup never fails on store selection.
pub fn from_backend_name(backend: &str) -> Arc<dyn StateStore> {
    match backend {
        "memory" | "in-memory" => {
            info!(backend = backend, "In-memory state store initialized");
            Arc::new(MemoryStateStore::new())
        }
        "noop" | "none" | "disabled" => Arc::new(NoOpStateStore::new()),
        other => {
            warn!(backend = other, "Unknown state store backend, falling back to NoOp");
            Arc::new(NoOpStateStore::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_backend_name() {
        assert_eq!(from_backend_name("memory").provider_name(), "memory");
        assert_eq!(from_backend_name("noop").provider_name(), "noop");
        assert_eq!(from_backend_name("redis-cluster").provider_name(), "noop");
    }
}
