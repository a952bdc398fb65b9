//! # Resilience Constants
//!
//! Key namespaces, default TTLs and policy bounds shared by the circuit
//! breaker, retry manager, fallback strategies and result caching.

use std::time::Duration;

/// State store namespaces and key layout
pub mod keys {
    /// Namespace holding mirrored circuit breaker state
    pub const CIRCUIT_NAMESPACE: &str = "circuit";

    /// Namespace holding results written by `cache_result`
    pub const RESULT_NAMESPACE: &str = "resilient";

    /// Suffix appended to a breaker name to form its state key
    pub const STATE_KEY_SUFFIX: &str = "state";

    /// Key under [`CIRCUIT_NAMESPACE`] that mirrors the state of breaker `name`
    pub fn circuit_state_key(name: &str) -> String {
        format!("{name}:{STATE_KEY_SUFFIX}")
    }

    /// Key under [`RESULT_NAMESPACE`] for an operation and its JSON-encoded arguments
    pub fn result_key(operation: &str, encoded_args: &str) -> String {
        format!("{operation}:{encoded_args}")
    }

    /// Fully qualified key as seen by flat key-value backends
    pub fn qualified(namespace: &str, key: &str) -> String {
        format!("{namespace}:{key}")
    }
}

/// Span names handed to the operation tracer
pub mod spans {
    pub const CIRCUIT_BREAKER_GUARD: &str = "resilience.circuit_breaker.guard";
    pub const RETRY_ATTEMPT: &str = "resilience.retry.attempt";
    pub const RESILIENT_CALL: &str = "resilience.call";
}

pub mod defaults {
    use super::Duration;

    /// TTL of the mirrored breaker state entry
    pub const CIRCUIT_STATE_TTL: Duration = Duration::from_secs(300);

    /// TTL used by `cache_result` when the caller does not pick one
    pub const RESULT_CACHE_TTL: Duration = Duration::from_secs(300);

    /// Jitter spreads each backoff delay uniformly over +/- this fraction
    pub const JITTER_RATIO: f64 = 0.25;

    /// Calls needed before the failure rate is used to judge health
    pub const MIN_CALLS_FOR_HEALTH: u64 = 10;

    /// Failure rate at or above which a closed breaker reports unhealthy
    pub const UNHEALTHY_FAILURE_RATE: f64 = 0.1;
}

/// Upper bounds enforced by configuration validation
pub mod limits {
    use super::Duration;

    pub const MAX_FAILURE_THRESHOLD: u32 = 100;
    pub const MAX_SUCCESS_THRESHOLD: u32 = 50;
    pub const MAX_HALF_OPEN_CALLS: u32 = 100;
    pub const MAX_RECOVERY_TIMEOUT: Duration = Duration::from_secs(3600);
    pub const MAX_RETRY_ATTEMPTS: u32 = 50;
    pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(3600);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circuit_state_key_layout() {
        assert_eq!(keys::circuit_state_key("payments"), "payments:state");
        assert_eq!(
            keys::qualified(keys::CIRCUIT_NAMESPACE, &keys::circuit_state_key("payments")),
            "circuit:payments:state"
        );
    }
}
