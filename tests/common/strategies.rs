//! Proptest strategies for resilience configuration

use proptest::prelude::*;
use std::time::Duration;
use tasker_resilience::resilience::RetryConfig;

/// Valid retry configurations with millisecond delays
pub fn retry_config_strategy() -> impl Strategy<Value = RetryConfig> {
    (
        1u32..=10,
        1u64..=5_000,
        0u64..=60_000,
        1.1f64..=4.0,
        any::<bool>(),
    )
        .prop_map(|(max_attempts, initial_ms, extra_ms, base, jitter)| RetryConfig {
            max_attempts,
            initial_delay: Duration::from_millis(initial_ms),
            max_delay: Duration::from_millis(initial_ms + extra_ms),
            exponential_base: base,
            jitter,
            ..RetryConfig::default()
        })
}

/// Error kind labels, drawn from a small alphabet so sets overlap often
pub fn error_kind_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("timeout".to_string()),
        Just("connection".to_string()),
        Just("not_found".to_string()),
        Just("validation".to_string()),
        "[a-z_]{1,12}",
    ]
}
