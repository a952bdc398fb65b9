//! # Resilience Policy Configuration
//!
//! Runtime configuration for individual circuit breakers and retry managers.
//!
//! **Note**: these are the immutable per-instance configs handed to
//! `Registry::register_*`. For file-based configuration with
//! environment-aware overrides, use `crate::config::ResilienceSettings`,
//! whose component entries convert into these types.

use crate::constants::limits;
use crate::resilience::classification::matches_kind;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// How a breaker shares its state through the state store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateSyncMode {
    /// Stored state overrides local state before every admission; transitions
    /// write through and failures are tallied with the store's counter
    #[default]
    Authoritative,

    /// Transitions write through for observability; local state is never
    /// overridden
    Advisory,

    /// No state store traffic
    Disabled,
}

impl StateSyncMode {
    pub fn reads_store(self) -> bool {
        matches!(self, StateSyncMode::Authoritative)
    }

    pub fn writes_store(self) -> bool {
        !matches!(self, StateSyncMode::Disabled)
    }
}

/// Configuration for a single circuit breaker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Number of consecutive countable failures before opening circuit
    pub failure_threshold: u32,

    /// Time since the last failure before an open circuit admits a probe
    pub recovery_timeout: Duration,

    /// Number of consecutive successful probes in half-open state to close circuit
    pub success_threshold: u32,

    /// Concurrent probe budget while half-open
    pub half_open_max_calls: u32,

    /// Error kinds that count as failures; empty means every kind
    #[serde(default)]
    pub countable_error_kinds: HashSet<String>,

    /// Error kinds that never count as failures, checked first
    #[serde(default)]
    pub excluded_error_kinds: HashSet<String>,

    /// Distributed state sharing
    #[serde(default)]
    pub state_sync: StateSyncMode,
}

impl CircuitBreakerConfig {
    /// Create configuration for database operations
    pub fn for_database() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(30),
            success_threshold: 2,
            ..Default::default()
        }
    }

    /// Create configuration for cache operations
    pub fn for_cache() -> Self {
        Self {
            failure_threshold: 3,
            recovery_timeout: Duration::from_secs(15),
            success_threshold: 1,
            ..Default::default()
        }
    }

    /// Create configuration for external API calls
    pub fn for_external_api() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(45),
            success_threshold: 2,
            half_open_max_calls: 2,
            ..Default::default()
        }
    }

    pub fn with_countable_kinds<I, S>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.countable_error_kinds
            .extend(kinds.into_iter().map(Into::into));
        self
    }

    pub fn with_excluded_kinds<I, S>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_error_kinds
            .extend(kinds.into_iter().map(Into::into));
        self
    }

    pub fn with_state_sync(mut self, mode: StateSyncMode) -> Self {
        self.state_sync = mode;
        self
    }

    /// Whether an error of `kind` counts toward opening the circuit
    pub fn is_countable(&self, kind: &str) -> bool {
        matches_kind(&self.countable_error_kinds, &self.excluded_error_kinds, kind)
    }

    /// Whether `kind` is explicitly excluded from failure counting
    pub fn is_excluded(&self, kind: &str) -> bool {
        self.excluded_error_kinds.contains(kind)
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.failure_threshold == 0 {
            return Err("failure_threshold must be greater than 0".to_string());
        }

        if self.failure_threshold > limits::MAX_FAILURE_THRESHOLD {
            return Err(format!(
                "failure_threshold should not exceed {}",
                limits::MAX_FAILURE_THRESHOLD
            ));
        }

        if self.recovery_timeout.is_zero() {
            return Err("recovery_timeout must be greater than 0".to_string());
        }

        if self.recovery_timeout > limits::MAX_RECOVERY_TIMEOUT {
            return Err(format!(
                "recovery_timeout should not exceed {} seconds",
                limits::MAX_RECOVERY_TIMEOUT.as_secs()
            ));
        }

        if self.success_threshold == 0 {
            return Err("success_threshold must be greater than 0".to_string());
        }

        if self.success_threshold > limits::MAX_SUCCESS_THRESHOLD {
            return Err(format!(
                "success_threshold should not exceed {}",
                limits::MAX_SUCCESS_THRESHOLD
            ));
        }

        if self.half_open_max_calls == 0 {
            return Err("half_open_max_calls must be greater than 0".to_string());
        }

        if self.half_open_max_calls > limits::MAX_HALF_OPEN_CALLS {
            return Err(format!(
                "half_open_max_calls should not exceed {}",
                limits::MAX_HALF_OPEN_CALLS
            ));
        }

        Ok(())
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(30),
            success_threshold: 2,
            half_open_max_calls: 1,
            countable_error_kinds: HashSet::new(),
            excluded_error_kinds: HashSet::new(),
            state_sync: StateSyncMode::default(),
        }
    }
}

/// Configuration for a single retry manager
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts including the first one
    pub max_attempts: u32,

    /// Delay before the second attempt
    pub initial_delay: Duration,

    /// Cap applied before jitter
    pub max_delay: Duration,

    /// Multiplier applied per attempt; must exceed 1.0
    pub exponential_base: f64,

    /// Spread each delay uniformly over +/- 25%
    pub jitter: bool,

    /// Error kinds eligible for retry; empty means every kind
    #[serde(default)]
    pub retryable_error_kinds: HashSet<String>,

    /// Error kinds that are re-raised immediately, checked first
    #[serde(default)]
    pub non_retryable_error_kinds: HashSet<String>,
}

impl RetryConfig {
    /// Create configuration for database operations
    pub fn for_database() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
            ..Default::default()
        }
    }

    /// Create configuration for external API calls
    pub fn for_external_api() -> Self {
        Self {
            max_attempts: 4,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            ..Default::default()
        }
    }

    pub fn with_retryable_kinds<I, S>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.retryable_error_kinds
            .extend(kinds.into_iter().map(Into::into));
        self
    }

    pub fn with_non_retryable_kinds<I, S>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.non_retryable_error_kinds
            .extend(kinds.into_iter().map(Into::into));
        self
    }

    /// Whether an error of `kind` may be retried
    pub fn is_retryable(&self, kind: &str) -> bool {
        matches_kind(
            &self.retryable_error_kinds,
            &self.non_retryable_error_kinds,
            kind,
        )
    }

    /// Unjittered delay after failed attempt `attempt` (1-based):
    /// `min(initial_delay * exponential_base^(attempt - 1), max_delay)`
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let factor = self.exponential_base.powi(exponent);
        let delay_secs = self.initial_delay.as_secs_f64() * factor;

        if !delay_secs.is_finite() || delay_secs >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }

        Duration::from_secs_f64(delay_secs.max(0.0))
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("max_attempts must be greater than 0".to_string());
        }

        if self.max_attempts > limits::MAX_RETRY_ATTEMPTS {
            return Err(format!(
                "max_attempts should not exceed {}",
                limits::MAX_RETRY_ATTEMPTS
            ));
        }

        if !self.exponential_base.is_finite() || self.exponential_base <= 1.0 {
            return Err("exponential_base must be a finite number greater than 1.0".to_string());
        }

        if self.max_delay < self.initial_delay {
            return Err("max_delay must not be less than initial_delay".to_string());
        }

        if self.max_delay > limits::MAX_RETRY_DELAY {
            return Err(format!(
                "max_delay should not exceed {} seconds",
                limits::MAX_RETRY_DELAY.as_secs()
            ));
        }

        Ok(())
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            exponential_base: 2.0,
            jitter: true,
            retryable_error_kinds: HashSet::new(),
            non_retryable_error_kinds: HashSet::new(),
        }
    }
}
