//! Loading the shipped configuration files and building registries from them

mod common;

use common::ServiceError;
use std::path::PathBuf;
use std::time::Duration;
use tasker_resilience::config::ConfigManager;
use tasker_resilience::resilience::{CircuitState, Registry, StateSyncMode};

fn shipped_config_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config")
}

#[test]
fn test_shipped_base_configuration_is_valid() {
    let manager =
        ConfigManager::load_from_directory_with_env(Some(shipped_config_dir()), "development")
            .expect("shipped configuration should load");
    let settings = manager.settings();

    assert_eq!(settings.state_store.backend, "memory");
    assert_eq!(settings.state_store.sync_mode, StateSyncMode::Authoritative);
    assert!(settings.circuit_breakers.contains_key("database"));
    assert!(settings.retry_policies.contains_key("external_api"));

    let registry = Registry::from_settings(settings).unwrap();
    assert_eq!(
        registry.list_circuit_breakers(),
        vec!["cache".to_string(), "database".to_string(), "external_api".to_string()]
    );

    let database = registry.circuit_breaker("database").unwrap();
    assert!(!database.config().is_countable("not_found"));
    assert!(database.config().is_countable("timeout"));

    let api_retry = registry.retry_manager("external_api").unwrap();
    assert!(api_retry.config().is_retryable("timeout"));
    assert!(!api_retry.config().is_retryable("validation"));
}

#[test]
fn test_shipped_test_overlay_trips_fast() {
    let manager = ConfigManager::load_from_directory_with_env(Some(shipped_config_dir()), "test")
        .expect("test overlay should load");
    let settings = manager.settings();

    assert_eq!(settings.state_store.sync_mode, StateSyncMode::Disabled);

    let registry = Registry::from_settings(settings).unwrap();
    let database = registry.circuit_breaker("database").unwrap();
    assert_eq!(database.config().failure_threshold, 2);
    assert_eq!(database.config().recovery_timeout, Duration::from_secs(1));
    assert_eq!(database.config().state_sync, StateSyncMode::Disabled);
    // Lists from the base file survive the overlay
    assert!(!database.config().is_countable("validation"));

    for _ in 0..2 {
        let _ = database.guard(|| Err::<(), _>(ServiceError::Timeout));
    }
    assert_eq!(database.state(), CircuitState::Open);

    let retry = registry.retry_manager("database").unwrap();
    assert_eq!(retry.config().max_attempts, 2);
    assert!(!retry.config().jitter);
}

#[test]
fn test_shipped_production_overlay_raises_thresholds() {
    let manager =
        ConfigManager::load_from_directory_with_env(Some(shipped_config_dir()), "production")
            .expect("production overlay should load");

    let database = &manager.settings().circuit_breakers["database"];
    assert_eq!(database.failure_threshold, 10);
    assert_eq!(database.recovery_timeout_seconds, 60);
    // Untouched components keep their base values
    assert_eq!(manager.settings().circuit_breakers["cache"].failure_threshold, 3);
}
