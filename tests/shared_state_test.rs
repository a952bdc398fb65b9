//! Breakers in separate registries converging through one shared state store
//!
//! Each registry stands in for a separate process; the `MemoryStateStore`
//! they share stands in for a distributed backend.

mod common;

use common::{init_test_logging, CallCounter, ServiceError};
use std::sync::Arc;
use std::time::Duration;
use tasker_resilience::resilience::{
    CircuitBreakerConfig, CircuitState, Registry, StateSyncMode,
};
use tasker_resilience::state_store::{MemoryStateStore, StateStore};

fn shared_registries(config: CircuitBreakerConfig) -> (Registry, Registry, Arc<MemoryStateStore>) {
    let store = Arc::new(MemoryStateStore::new());
    let first = Registry::with_state_store(store.clone());
    let second = Registry::with_state_store(store.clone());
    first
        .register_circuit_breaker("database", config.clone())
        .unwrap();
    second.register_circuit_breaker("database", config).unwrap();
    (first, second, store)
}

fn config(mode: StateSyncMode, recovery: Duration) -> CircuitBreakerConfig {
    CircuitBreakerConfig {
        failure_threshold: 3,
        recovery_timeout: recovery,
        success_threshold: 1,
        ..CircuitBreakerConfig::default()
    }
    .with_state_sync(mode)
}

#[test]
fn test_failures_from_both_instances_add_up_to_the_threshold() {
    init_test_logging();
    let (first, second, _store) =
        shared_registries(config(StateSyncMode::Authoritative, Duration::from_secs(60)));
    let a = first.circuit_breaker("database").unwrap();
    let b = second.circuit_breaker("database").unwrap();

    let _ = a.guard(|| Err::<(), _>(ServiceError::Connection));
    let _ = a.guard(|| Err::<(), _>(ServiceError::Connection));
    assert_eq!(a.state(), CircuitState::Closed);

    let _ = b.guard(|| Err::<(), _>(ServiceError::Connection));
    assert_eq!(b.state(), CircuitState::Open);

    // The other instance adopts the open circuit without failing itself
    let counter = CallCounter::new();
    let rejected = a.guard(|| {
        counter.hit();
        Ok::<_, ServiceError>(())
    });
    assert!(rejected.unwrap_err().is_circuit_open());
    assert_eq!(counter.count(), 0);
    assert_eq!(a.state(), CircuitState::Open);
}

#[test]
fn test_recovery_observed_by_one_instance_closes_the_other() {
    let (first, second, _store) = shared_registries(config(
        StateSyncMode::Authoritative,
        Duration::from_millis(100),
    ));
    let a = first.circuit_breaker("database").unwrap();
    let b = second.circuit_breaker("database").unwrap();

    for _ in 0..3 {
        let _ = b.guard(|| Err::<(), _>(ServiceError::Timeout));
    }
    assert_eq!(a.state(), CircuitState::Open);

    std::thread::sleep(Duration::from_millis(150));

    a.guard(|| Ok::<_, ServiceError>(())).unwrap();
    assert_eq!(a.state(), CircuitState::Closed);
    assert_eq!(b.state(), CircuitState::Closed);
}

#[test]
fn test_force_open_propagates_through_the_store() {
    let (first, second, _store) =
        shared_registries(config(StateSyncMode::Authoritative, Duration::from_secs(60)));

    first.force_open_all();

    let b = second.circuit_breaker("database").unwrap();
    assert_eq!(b.state(), CircuitState::Open);
    assert!(b.guard(|| Ok::<_, ServiceError>(())).unwrap_err().is_circuit_open());
}

#[test]
fn test_advisory_mode_writes_state_but_never_adopts_it() {
    let (first, second, store) =
        shared_registries(config(StateSyncMode::Advisory, Duration::from_secs(60)));
    let a = first.circuit_breaker("database").unwrap();
    let b = second.circuit_breaker("database").unwrap();

    for _ in 0..3 {
        let _ = a.guard(|| Err::<(), _>(ServiceError::Timeout));
    }
    assert_eq!(a.state(), CircuitState::Open);

    let mirrored = store.get("circuit", "database:state").unwrap();
    assert!(mirrored.unwrap().contains("open"));

    assert_eq!(b.state(), CircuitState::Closed);
    assert_eq!(b.guard(|| Ok::<_, ServiceError>(7)).unwrap(), 7);
}

#[test]
fn test_disabled_mode_leaves_the_store_untouched() {
    let (first, _second, store) =
        shared_registries(config(StateSyncMode::Disabled, Duration::from_secs(60)));
    let a = first.circuit_breaker("database").unwrap();

    for _ in 0..3 {
        let _ = a.guard(|| Err::<(), _>(ServiceError::Timeout));
    }

    assert_eq!(a.state(), CircuitState::Open);
    assert!(store.is_empty());
}

#[test]
fn test_components_with_different_names_do_not_interfere() {
    let store = Arc::new(MemoryStateStore::new());
    let registry = Registry::with_state_store(store);
    registry
        .register_circuit_breaker("orders", config(StateSyncMode::Authoritative, Duration::from_secs(60)))
        .unwrap();
    registry
        .register_circuit_breaker("billing", config(StateSyncMode::Authoritative, Duration::from_secs(60)))
        .unwrap();

    let orders = registry.circuit_breaker("orders").unwrap();
    for _ in 0..3 {
        let _ = orders.guard(|| Err::<(), _>(ServiceError::Timeout));
    }

    assert_eq!(orders.state(), CircuitState::Open);
    assert_eq!(
        registry.circuit_breaker("billing").unwrap().state(),
        CircuitState::Closed
    );

    let summary = registry.state_summary();
    assert_eq!(summary.get(&CircuitState::Open), Some(&1));
    assert_eq!(summary.get(&CircuitState::Closed), Some(&1));
}
