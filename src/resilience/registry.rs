//! # Resilience Registry
//!
//! Owns the named circuit breakers and retry managers of one application and
//! the collaborators they share: the state store, the metrics collector and
//! the tracer. Build one at startup, register components, then hand clones to
//! whatever needs them. Clones share the same maps.
//!
//! Registration replaces any component already registered under the name.
//! Callers holding the previous `Arc` keep using it until they drop it.

use crate::config::ResilienceSettings;
use crate::error::{ResilienceError, Result};
use crate::logging::log_admin_operation;
use crate::resilience::circuit_breaker::{CircuitBreaker, CircuitState};
use crate::resilience::classification::ClassifiableError;
use crate::resilience::config::{CircuitBreakerConfig, RetryConfig};
use crate::resilience::metrics::{
    CircuitBreakerMetrics, LoggingMetricsCollector, MetricsCollector, SystemCircuitBreakerMetrics,
};
use crate::resilience::orchestrator::{Resilient, ResilientOptions};
use crate::resilience::retry::RetryManager;
use crate::resilience::tracer::{NoopTracer, OperationTracer};
use crate::state_store::{self, MemoryStateStore, StateStore};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Registry of named resilience components
#[derive(Debug, Clone)]
pub struct Registry {
    circuit_breakers: Arc<RwLock<HashMap<String, Arc<CircuitBreaker>>>>,
    retry_managers: Arc<RwLock<HashMap<String, Arc<RetryManager>>>>,
    store: Arc<dyn StateStore>,
    collector: Arc<dyn MetricsCollector>,
    tracer: Arc<dyn OperationTracer>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Empty registry backed by a process-local [`MemoryStateStore`]
    pub fn new() -> Self {
        Self::with_state_store(Arc::new(MemoryStateStore::new()))
    }

    pub fn with_state_store(store: Arc<dyn StateStore>) -> Self {
        info!(
            state_store = store.provider_name(),
            "Initializing resilience registry"
        );

        Self {
            circuit_breakers: Arc::new(RwLock::new(HashMap::new())),
            retry_managers: Arc::new(RwLock::new(HashMap::new())),
            store,
            collector: Arc::new(LoggingMetricsCollector),
            tracer: Arc::new(NoopTracer),
        }
    }

    /// Collector handed to breakers registered from now on
    pub fn with_metrics_collector(mut self, collector: Arc<dyn MetricsCollector>) -> Self {
        self.collector = collector;
        self
    }

    /// Tracer handed to components registered from now on
    pub fn with_tracer(mut self, tracer: Arc<dyn OperationTracer>) -> Self {
        self.tracer = tracer;
        self
    }

    /// Build a registry and register everything the settings describe
    pub fn from_settings(settings: &ResilienceSettings) -> Result<Self> {
        settings.validate()?;

        let registry = Self::with_state_store(state_store::from_backend_name(
            &settings.state_store.backend,
        ));

        for (name, component) in &settings.circuit_breakers {
            registry.register_circuit_breaker(
                name.clone(),
                component.to_resilience_config(settings.state_store.sync_mode),
            )?;
        }

        for (name, policy) in &settings.retry_policies {
            registry.register_retry_manager(name.clone(), policy.to_resilience_config())?;
        }

        info!(
            circuit_breakers = settings.circuit_breakers.len(),
            retry_policies = settings.retry_policies.len(),
            "Resilience registry built from configuration"
        );

        Ok(registry)
    }

    pub fn state_store(&self) -> &Arc<dyn StateStore> {
        &self.store
    }

    pub fn tracer(&self) -> &Arc<dyn OperationTracer> {
        &self.tracer
    }

    /// Create a circuit breaker under `name`, replacing any existing one
    ///
    /// Replacing a breaker starts the new one from a clean slate: the shared
    /// state and failure tally stored under `name` are removed rather than
    /// adopted.
    pub fn register_circuit_breaker(
        &self,
        name: impl Into<String>,
        config: CircuitBreakerConfig,
    ) -> Result<Arc<CircuitBreaker>> {
        let name = name.into();
        config
            .validate()
            .map_err(|reason| ResilienceError::invalid_configuration(&name, reason))?;

        let breaker = Arc::new(
            CircuitBreaker::new(name.clone(), config)
                .with_state_store(Arc::clone(&self.store))
                .with_metrics_collector(Arc::clone(&self.collector))
                .with_tracer(Arc::clone(&self.tracer)),
        );

        let replaced = {
            let mut breakers = self.circuit_breakers.write();
            let replaced = breakers
                .insert(name.clone(), Arc::clone(&breaker))
                .is_some();
            if !replaced {
                info!(
                    component = %name,
                    total_circuit_breakers = breakers.len(),
                    "Registered circuit breaker"
                );
            }
            replaced
        };

        if replaced {
            warn!(component = %name, "Replaced existing circuit breaker");
            breaker.reset();
        }

        Ok(breaker)
    }

    /// Create a retry manager under `name`, replacing any existing one
    pub fn register_retry_manager(
        &self,
        name: impl Into<String>,
        config: RetryConfig,
    ) -> Result<Arc<RetryManager>> {
        let name = name.into();
        config
            .validate()
            .map_err(|reason| ResilienceError::invalid_configuration(&name, reason))?;

        let manager = Arc::new(
            RetryManager::new(name.clone(), config).with_tracer(Arc::clone(&self.tracer)),
        );

        let mut managers = self.retry_managers.write();
        if managers.insert(name.clone(), Arc::clone(&manager)).is_some() {
            warn!(component = %name, "Replaced existing retry manager");
        } else {
            info!(
                component = %name,
                total_retry_managers = managers.len(),
                "Registered retry manager"
            );
        }

        Ok(manager)
    }

    pub fn circuit_breaker(&self, name: &str) -> Option<Arc<CircuitBreaker>> {
        self.circuit_breakers.read().get(name).cloned()
    }

    pub fn retry_manager(&self, name: &str) -> Option<Arc<RetryManager>> {
        self.retry_managers.read().get(name).cloned()
    }

    /// Like [`Registry::circuit_breaker`] but an error when nothing is registered
    pub fn require_circuit_breaker(&self, name: &str) -> Result<Arc<CircuitBreaker>> {
        self.circuit_breaker(name)
            .ok_or_else(|| ResilienceError::Registry(format!("no circuit breaker named '{name}'")))
    }

    pub fn require_retry_manager(&self, name: &str) -> Result<Arc<RetryManager>> {
        self.retry_manager(name)
            .ok_or_else(|| ResilienceError::Registry(format!("no retry manager named '{name}'")))
    }

    /// Wrap an operation with the stages named in `options`
    pub fn resilient<A, T, E>(&self, options: ResilientOptions<A, T, E>) -> Resilient<A, T, E>
    where
        A: Clone,
        E: ClassifiableError,
    {
        Resilient::new(options, self.clone())
    }

    /// Sorted circuit breaker names
    pub fn list_circuit_breakers(&self) -> Vec<String> {
        let mut names: Vec<String> = self.circuit_breakers.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Sorted retry manager names
    pub fn list_retry_managers(&self) -> Vec<String> {
        let mut names: Vec<String> = self.retry_managers.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn remove_circuit_breaker(&self, name: &str) -> bool {
        let mut breakers = self.circuit_breakers.write();
        if breakers.remove(name).is_some() {
            log_admin_operation(
                "remove_circuit_breaker",
                Some(name),
                Some(&format!("{} remaining", breakers.len())),
            );
            true
        } else {
            false
        }
    }

    pub fn remove_retry_manager(&self, name: &str) -> bool {
        self.retry_managers.write().remove(name).is_some()
    }

    fn breakers_snapshot(&self) -> Vec<Arc<CircuitBreaker>> {
        self.circuit_breakers.read().values().cloned().collect()
    }

    pub fn component_metrics(&self, name: &str) -> Option<CircuitBreakerMetrics> {
        self.circuit_breaker(name).map(|breaker| breaker.metrics())
    }

    /// Get system-wide circuit breaker metrics
    pub fn system_metrics(&self) -> SystemCircuitBreakerMetrics {
        let mut system_metrics = SystemCircuitBreakerMetrics::new();
        for breaker in self.breakers_snapshot() {
            system_metrics.add_circuit_breaker(breaker.name().to_string(), breaker.metrics());
        }
        system_metrics
    }

    /// Report every breaker's snapshot through its metrics collector
    pub fn publish_metrics(&self) {
        for breaker in self.breakers_snapshot() {
            breaker.publish_metrics();
        }
    }

    /// Force open all circuit breakers (emergency stop)
    pub fn force_open_all(&self) {
        let breakers = self.breakers_snapshot();
        log_admin_operation(
            "force_open_all",
            None,
            Some(&format!("{} circuit breakers (emergency stop)", breakers.len())),
        );
        for breaker in breakers {
            breaker.force_open();
        }
    }

    /// Force close all circuit breakers (emergency recovery)
    pub fn force_close_all(&self) {
        let breakers = self.breakers_snapshot();
        log_admin_operation(
            "force_close_all",
            None,
            Some(&format!("{} circuit breakers (emergency recovery)", breakers.len())),
        );
        for breaker in breakers {
            breaker.force_closed();
        }
    }

    /// Get count of circuit breakers by state
    pub fn state_summary(&self) -> HashMap<CircuitState, usize> {
        self.system_metrics().count_by_state()
    }

    /// Share of healthy breakers, 1.0 when none are registered
    pub fn system_health_score(&self) -> f64 {
        self.system_metrics().health_score()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::keys;
    use crate::state_store::NoOpStateStore;
    use std::time::Duration;

    #[test]
    fn test_register_and_lookup() {
        let registry = Registry::new();
        let breaker = registry
            .register_circuit_breaker("database", CircuitBreakerConfig::for_database())
            .unwrap();
        registry
            .register_retry_manager("database", RetryConfig::for_database())
            .unwrap();

        assert!(Arc::ptr_eq(&breaker, &registry.circuit_breaker("database").unwrap()));
        assert!(registry.retry_manager("database").is_some());
        assert!(registry.circuit_breaker("cache").is_none());
        assert_eq!(registry.list_circuit_breakers(), vec!["database".to_string()]);
        assert_eq!(registry.list_retry_managers(), vec!["database".to_string()]);
    }

    #[test]
    fn test_reregistration_replaces_entry() {
        let registry = Registry::with_state_store(Arc::new(NoOpStateStore));
        let first = registry
            .register_circuit_breaker("api", CircuitBreakerConfig::default())
            .unwrap();
        first.force_open();

        let second = registry
            .register_circuit_breaker("api", CircuitBreakerConfig::for_external_api())
            .unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(second.state(), CircuitState::Closed);
        // The old instance keeps working for whoever still holds it
        assert_eq!(first.state(), CircuitState::Open);
        assert_eq!(registry.list_circuit_breakers().len(), 1);
    }

    #[test]
    fn test_reregistration_discards_shared_state() {
        let store = Arc::new(MemoryStateStore::new());
        let registry = Registry::with_state_store(store.clone());
        let config = CircuitBreakerConfig {
            failure_threshold: 3,
            ..CircuitBreakerConfig::default()
        };
        let first = registry
            .register_circuit_breaker("api", config.clone())
            .unwrap();
        let _ = first.guard(|| Err::<(), _>("timeout"));
        first.force_open();
        assert!(store
            .get(keys::CIRCUIT_NAMESPACE, "api:state")
            .unwrap()
            .is_some());

        let second = registry.register_circuit_breaker("api", config).unwrap();

        assert_eq!(second.state(), CircuitState::Closed);
        assert!(store
            .get(keys::CIRCUIT_NAMESPACE, "api:state")
            .unwrap()
            .is_none());
        assert!(store
            .get(keys::CIRCUIT_NAMESPACE, "api:failures")
            .unwrap()
            .is_none());
        assert_eq!(second.guard(|| Ok::<_, &str>(1)).unwrap(), 1);
    }

    #[test]
    fn test_invalid_configuration_is_rejected() {
        let registry = Registry::new();
        let err = registry
            .register_circuit_breaker(
                "broken",
                CircuitBreakerConfig {
                    failure_threshold: 0,
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, ResilienceError::InvalidConfiguration { ref component, .. } if component == "broken"));

        let err = registry
            .register_retry_manager(
                "broken",
                RetryConfig {
                    exponential_base: 1.0,
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, ResilienceError::InvalidConfiguration { .. }));
        assert!(registry.list_circuit_breakers().is_empty());
    }

    #[test]
    fn test_registries_are_isolated() {
        let a = Registry::new();
        let b = Registry::new();
        a.register_circuit_breaker("shared_name", CircuitBreakerConfig::default())
            .unwrap();
        assert!(b.circuit_breaker("shared_name").is_none());
    }

    #[test]
    fn test_clones_share_components() {
        let registry = Registry::new();
        let clone = registry.clone();
        registry
            .register_retry_manager("later", RetryConfig::default())
            .unwrap();
        assert!(clone.retry_manager("later").is_some());
    }

    #[test]
    fn test_require_lookup_errors() {
        let registry = Registry::new();
        assert!(matches!(
            registry.require_circuit_breaker("nope"),
            Err(ResilienceError::Registry(_))
        ));
        assert!(registry.require_retry_manager("nope").is_err());
    }

    #[test]
    fn test_force_all_and_summary() {
        let registry = Registry::with_state_store(Arc::new(NoOpStateStore));
        registry
            .register_circuit_breaker("database", CircuitBreakerConfig::for_database())
            .unwrap();
        registry
            .register_circuit_breaker("cache", CircuitBreakerConfig::for_cache())
            .unwrap();

        assert_eq!(registry.system_health_score(), 1.0);

        registry.force_open_all();
        let summary = registry.state_summary();
        assert_eq!(summary.get(&CircuitState::Open), Some(&2));
        assert_eq!(registry.system_health_score(), 0.0);

        registry.force_close_all();
        assert_eq!(registry.state_summary().get(&CircuitState::Closed), Some(&2));
    }

    #[test]
    fn test_remove_circuit_breaker() {
        let registry = Registry::new();
        registry
            .register_circuit_breaker("temp", CircuitBreakerConfig::default())
            .unwrap();
        assert!(registry.remove_circuit_breaker("temp"));
        assert!(!registry.remove_circuit_breaker("temp"));
        assert!(registry.component_metrics("temp").is_none());
    }

    #[test]
    fn test_system_metrics_aggregate() {
        let registry = Registry::new();
        let breaker = registry
            .register_circuit_breaker(
                "db",
                CircuitBreakerConfig {
                    failure_threshold: 10,
                    recovery_timeout: Duration::from_secs(1),
                    ..Default::default()
                },
            )
            .unwrap();
        let _ = breaker.guard(|| Ok::<_, &str>(()));
        let _ = breaker.guard(|| Err::<(), _>("boom"));

        let metrics = registry.system_metrics();
        assert_eq!(metrics.total_calls(), 2);
        assert_eq!(metrics.total_failures(), 1);
    }
}
