mod common;

use common::strategies::*;
use common::ServiceError;
use proptest::prelude::*;
use std::collections::HashSet;
use std::time::Duration;
use tasker_resilience::resilience::{
    matches_kind, CircuitBreaker, CircuitBreakerConfig, CircuitState, RetryManager,
};

proptest! {
    /// Property: the unjittered delay follows min(initial * base^(k-1), max)
    #[test]
    fn base_delay_is_capped_exponential(config in retry_config_strategy(), attempt in 1u32..=12) {
        let delay = config.base_delay(attempt);
        prop_assert!(delay <= config.max_delay);

        let expected = config.initial_delay.as_secs_f64()
            * config.exponential_base.powi(attempt as i32 - 1);
        let expected = expected.min(config.max_delay.as_secs_f64());
        prop_assert!((delay.as_secs_f64() - expected).abs() < 1e-6);
    }

    /// Property: jittered delays stay within 25% of the base delay
    #[test]
    fn jittered_delay_stays_in_band(config in retry_config_strategy(), attempt in 1u32..=12) {
        let manager = RetryManager::new("prop", config.clone());
        let base = config.base_delay(attempt).as_secs_f64();
        let delay = manager.delay_for_attempt(attempt).as_secs_f64();

        if config.jitter {
            prop_assert!(delay >= base * 0.75 - 1e-9);
            prop_assert!(delay <= base * 1.25 + 1e-9);
        } else {
            prop_assert!((delay - base).abs() < 1e-9);
        }
    }

    /// Property: delays never shrink as attempts increase, before jitter
    #[test]
    fn base_delay_is_monotonic(config in retry_config_strategy(), attempt in 1u32..=12) {
        prop_assert!(config.base_delay(attempt) <= config.base_delay(attempt + 1));
    }

    /// Property: an excluded kind never matches, whatever the include set says
    #[test]
    fn exclusion_wins_over_inclusion(
        kind in error_kind_strategy(),
        mut include in prop::collection::hash_set(error_kind_strategy(), 0..4),
        mut exclude in prop::collection::hash_set(error_kind_strategy(), 0..4),
    ) {
        include.insert(kind.clone());
        exclude.insert(kind.clone());
        prop_assert!(!matches_kind(&include, &exclude, &kind));
    }

    /// Property: with nothing excluded, an empty include set matches any kind
    #[test]
    fn empty_include_matches_everything(kind in error_kind_strategy()) {
        prop_assert!(matches_kind(&HashSet::new(), &HashSet::new(), &kind));
    }

    /// Property: the breaker opens after exactly N consecutive failures and
    /// the next call never reaches the operation
    #[test]
    fn breaker_opens_after_threshold(threshold in 1u32..=20) {
        let breaker = CircuitBreaker::new(
            "prop",
            CircuitBreakerConfig {
                failure_threshold: threshold,
                recovery_timeout: Duration::from_secs(60),
                ..CircuitBreakerConfig::default()
            },
        );

        for i in 1..=threshold {
            prop_assert_eq!(breaker.state(), CircuitState::Closed, "opened early at failure {}", i);
            let _ = breaker.guard(|| Err::<(), _>(ServiceError::Timeout));
        }
        prop_assert_eq!(breaker.state(), CircuitState::Open);

        let mut invoked = false;
        let result = breaker.guard(|| {
            invoked = true;
            Ok::<_, ServiceError>(())
        });
        prop_assert!(result.unwrap_err().is_circuit_open());
        prop_assert!(!invoked);
    }

    /// Property: a success anywhere before the threshold resets the streak
    #[test]
    fn interleaved_success_prevents_opening(threshold in 2u32..=10, calls in 1usize..=40) {
        let breaker = CircuitBreaker::new(
            "prop",
            CircuitBreakerConfig {
                failure_threshold: threshold,
                recovery_timeout: Duration::from_secs(60),
                ..CircuitBreakerConfig::default()
            },
        );

        // threshold - 1 failures followed by a success, repeated
        for i in 0..calls {
            if (i as u32 + 1) % threshold == 0 {
                let _ = breaker.guard(|| Ok::<_, ServiceError>(()));
            } else {
                let _ = breaker.guard(|| Err::<(), _>(ServiceError::Connection));
            }
        }

        prop_assert_eq!(breaker.state(), CircuitState::Closed);
    }
}
