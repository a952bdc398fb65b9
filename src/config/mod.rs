//! # Resilience Configuration
//!
//! File- and environment-driven settings for the registry: which state store
//! to use, and the named circuit breakers and retry policies to register.
//!
//! ## Sources
//!
//! Loaded by [`ConfigManager`] in increasing precedence:
//!
//! 1. `resilience.yaml` (or `.yml` / `.toml`) in the configuration directory
//! 2. `resilience.{environment}.yaml` (or `.yml` / `.toml`), when present
//! 3. Environment variables prefixed `RESILIENCE__`, nested with `__`
//!    (`RESILIENCE__CIRCUIT_BREAKERS__DATABASE__FAILURE_THRESHOLD=3`)
//!
//! ## Example
//!
//! ```yaml
//! state_store:
//!   backend: memory
//!   sync_mode: authoritative
//! circuit_breakers:
//!   database:
//!     failure_threshold: 5
//!     recovery_timeout_seconds: 30
//!     success_threshold: 2
//! retry_policies:
//!   database:
//!     max_attempts: 3
//!     initial_delay_ms: 100
//!     max_delay_ms: 2000
//! ```

pub mod error;
pub mod loader;

use crate::resilience::config::{CircuitBreakerConfig, RetryConfig, StateSyncMode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

const KNOWN_BACKENDS: &[&str] = &["memory", "in-memory", "noop", "none", "disabled"];

/// Root configuration structure mirroring resilience.yaml
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ResilienceSettings {
    /// Shared state store selection
    #[serde(default)]
    pub state_store: StateStoreSettings,

    /// Circuit breakers to register, by name
    #[serde(default)]
    pub circuit_breakers: HashMap<String, CircuitBreakerComponentConfig>,

    /// Retry managers to register, by name
    #[serde(default)]
    pub retry_policies: HashMap<String, RetryPolicyConfig>,
}

/// State store configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StateStoreSettings {
    /// `memory` or `noop`
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Sync mode for breakers that do not set their own
    #[serde(default)]
    pub sync_mode: StateSyncMode,
}

fn default_backend() -> String {
    "memory".to_string()
}

impl Default for StateStoreSettings {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            sync_mode: StateSyncMode::default(),
        }
    }
}

/// Circuit breaker configuration for a specific component from YAML
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CircuitBreakerComponentConfig {
    /// Number of consecutive failures before opening circuit
    pub failure_threshold: u32,

    /// Time to wait in open state before attempting recovery (in seconds)
    pub recovery_timeout_seconds: u64,

    /// Number of successful calls in half-open state to close circuit
    pub success_threshold: u32,

    #[serde(default = "default_half_open_max_calls")]
    pub half_open_max_calls: u32,

    #[serde(default)]
    pub countable_error_kinds: Vec<String>,

    #[serde(default)]
    pub excluded_error_kinds: Vec<String>,

    /// Overrides `state_store.sync_mode`
    #[serde(default)]
    pub sync_mode: Option<StateSyncMode>,
}

fn default_half_open_max_calls() -> u32 {
    1
}

impl CircuitBreakerComponentConfig {
    /// Convert to resilience module's format
    pub fn to_resilience_config(&self, default_sync_mode: StateSyncMode) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: self.failure_threshold,
            recovery_timeout: Duration::from_secs(self.recovery_timeout_seconds),
            success_threshold: self.success_threshold,
            half_open_max_calls: self.half_open_max_calls,
            countable_error_kinds: self.countable_error_kinds.iter().cloned().collect(),
            excluded_error_kinds: self.excluded_error_kinds.iter().cloned().collect(),
            state_sync: self.sync_mode.unwrap_or(default_sync_mode),
        }
    }
}

impl Default for CircuitBreakerComponentConfig {
    fn default() -> Self {
        let defaults = CircuitBreakerConfig::default();
        Self {
            failure_threshold: defaults.failure_threshold,
            recovery_timeout_seconds: defaults.recovery_timeout.as_secs(),
            success_threshold: defaults.success_threshold,
            half_open_max_calls: defaults.half_open_max_calls,
            countable_error_kinds: Vec::new(),
            excluded_error_kinds: Vec::new(),
            sync_mode: None,
        }
    }
}

/// Retry policy configuration from YAML, delays in milliseconds
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RetryPolicyConfig {
    pub max_attempts: u32,

    pub initial_delay_ms: u64,

    pub max_delay_ms: u64,

    #[serde(default = "default_exponential_base")]
    pub exponential_base: f64,

    #[serde(default = "default_jitter")]
    pub jitter: bool,

    #[serde(default)]
    pub retryable_error_kinds: Vec<String>,

    #[serde(default)]
    pub non_retryable_error_kinds: Vec<String>,
}

fn default_exponential_base() -> f64 {
    2.0
}

fn default_jitter() -> bool {
    true
}

impl RetryPolicyConfig {
    /// Convert to resilience module's format
    pub fn to_resilience_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_attempts,
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            exponential_base: self.exponential_base,
            jitter: self.jitter,
            retryable_error_kinds: self.retryable_error_kinds.iter().cloned().collect(),
            non_retryable_error_kinds: self.non_retryable_error_kinds.iter().cloned().collect(),
        }
    }
}

impl Default for RetryPolicyConfig {
    fn default() -> Self {
        let defaults = RetryConfig::default();
        Self {
            max_attempts: defaults.max_attempts,
            initial_delay_ms: defaults.initial_delay.as_millis() as u64,
            max_delay_ms: defaults.max_delay.as_millis() as u64,
            exponential_base: defaults.exponential_base,
            jitter: defaults.jitter,
            retryable_error_kinds: Vec::new(),
            non_retryable_error_kinds: Vec::new(),
        }
    }
}

impl ResilienceSettings {
    /// Validate every section, reporting the first problem found
    pub fn validate(&self) -> ConfigResult<()> {
        if !KNOWN_BACKENDS.contains(&self.state_store.backend.as_str()) {
            return Err(ConfigurationError::invalid_value(
                "state_store.backend",
                self.state_store.backend.clone(),
                "expected 'memory' or 'noop'",
            ));
        }

        for (name, component) in &self.circuit_breakers {
            if name.trim().is_empty() {
                return Err(ConfigurationError::missing_required_field(
                    "name",
                    "circuit_breakers",
                ));
            }
            component
                .to_resilience_config(self.state_store.sync_mode)
                .validate()
                .map_err(|reason| ConfigurationError::invalid_component(name, reason))?;
        }

        for (name, policy) in &self.retry_policies {
            if name.trim().is_empty() {
                return Err(ConfigurationError::missing_required_field(
                    "name",
                    "retry_policies",
                ));
            }
            policy
                .to_resilience_config()
                .validate()
                .map_err(|reason| ConfigurationError::invalid_component(name, reason))?;
        }

        Ok(())
    }

    /// Runtime config for a named breaker, if configured
    pub fn circuit_breaker_config(&self, name: &str) -> Option<CircuitBreakerConfig> {
        self.circuit_breakers
            .get(name)
            .map(|component| component.to_resilience_config(self.state_store.sync_mode))
    }

    /// Runtime config for a named retry policy, if configured
    pub fn retry_config(&self, name: &str) -> Option<RetryConfig> {
        self.retry_policies
            .get(name)
            .map(RetryPolicyConfig::to_resilience_config)
    }
}
