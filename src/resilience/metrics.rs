//! # Circuit Breaker Metrics
//!
//! Snapshot types for breaker counters plus the [`MetricsCollector`] seam the
//! breaker reports transitions, timings and rejections through. Collectors
//! are observability only: a failing or absent collector never changes the
//! outcome of a guarded call.

use crate::constants::defaults;
use crate::resilience::CircuitState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Metrics for a single circuit breaker instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerMetrics {
    /// Every call that reached the breaker, including rejected ones
    pub total_calls: u64,

    /// Calls that returned `Ok`
    pub successful_calls: u64,

    /// Calls that failed with a countable error
    pub failed_calls: u64,

    /// Calls rejected without invoking the operation
    pub rejected_calls: u64,

    /// Number of state transitions, including adopted shared state
    pub state_transitions: u64,

    /// Consecutive countable failures in the current closed window
    pub failure_count: u32,

    /// Consecutive successful probes in the current half-open window
    pub success_count: u32,

    /// Probes currently admitted while half-open
    pub half_open_calls_in_flight: u32,

    /// Total duration of all executed operations
    pub total_duration: Duration,

    /// Current circuit breaker state
    pub current_state: CircuitState,

    /// Failed share of executed calls (0.0 to 1.0)
    pub failure_rate: f64,

    /// Successful share of executed calls (0.0 to 1.0)
    pub success_rate: f64,

    /// Average duration of executed calls
    pub average_duration: Duration,

    /// Wall-clock time of the most recent countable failure
    pub last_failure_time: Option<DateTime<Utc>>,
}

impl CircuitBreakerMetrics {
    /// Create new metrics instance with zero values
    pub fn new() -> Self {
        Self {
            total_calls: 0,
            successful_calls: 0,
            failed_calls: 0,
            rejected_calls: 0,
            state_transitions: 0,
            failure_count: 0,
            success_count: 0,
            half_open_calls_in_flight: 0,
            total_duration: Duration::ZERO,
            current_state: CircuitState::Closed,
            failure_rate: 0.0,
            success_rate: 0.0,
            average_duration: Duration::ZERO,
            last_failure_time: None,
        }
    }

    /// Calls that actually ran the wrapped operation and were classified
    pub fn executed_calls(&self) -> u64 {
        self.successful_calls + self.failed_calls
    }

    /// Check if metrics indicate healthy operation
    pub fn is_healthy(&self) -> bool {
        match self.current_state {
            CircuitState::Closed => self.failure_rate < defaults::UNHEALTHY_FAILURE_RATE,
            CircuitState::Open => false,
            CircuitState::HalfOpen => true,
        }
    }

    /// Get human-readable state description
    pub fn state_description(&self) -> &'static str {
        match self.current_state {
            CircuitState::Closed => "Healthy - Normal operation",
            CircuitState::Open => "Failing - Rejecting all calls",
            CircuitState::HalfOpen => "Recovering - Testing system health",
        }
    }

    /// Format metrics for logging
    pub fn format_summary(&self) -> String {
        format!(
            "State: {} | Calls: {} | Success: {:.1}% | Failures: {} | Rejected: {} | Avg Duration: {}ms",
            self.state_description(),
            self.total_calls,
            self.success_rate * 100.0,
            self.failed_calls,
            self.rejected_calls,
            self.average_duration.as_millis()
        )
    }
}

impl Default for CircuitBreakerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// System-wide circuit breaker metrics aggregator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemCircuitBreakerMetrics {
    /// Metrics for individual circuit breakers by name
    pub circuit_breakers: HashMap<String, CircuitBreakerMetrics>,

    /// Timestamp of last metrics collection
    pub collected_at: DateTime<Utc>,
}

impl SystemCircuitBreakerMetrics {
    pub fn new() -> Self {
        Self {
            circuit_breakers: HashMap::new(),
            collected_at: Utc::now(),
        }
    }

    /// Add metrics for a circuit breaker
    pub fn add_circuit_breaker(&mut self, name: String, metrics: CircuitBreakerMetrics) {
        self.circuit_breakers.insert(name, metrics);
        self.collected_at = Utc::now();
    }

    /// Get count of circuit breakers by state
    pub fn count_by_state(&self) -> HashMap<CircuitState, usize> {
        let mut counts = HashMap::new();

        for metrics in self.circuit_breakers.values() {
            *counts.entry(metrics.current_state).or_insert(0) += 1;
        }

        counts
    }

    /// Get list of unhealthy circuit breakers
    pub fn unhealthy_circuits(&self) -> Vec<(&String, &CircuitBreakerMetrics)> {
        self.circuit_breakers
            .iter()
            .filter(|(_, metrics)| !metrics.is_healthy())
            .collect()
    }

    /// Calculate system-wide health score (0.0 to 1.0)
    pub fn health_score(&self) -> f64 {
        if self.circuit_breakers.is_empty() {
            return 1.0;
        }

        let healthy_count = self
            .circuit_breakers
            .values()
            .filter(|metrics| metrics.is_healthy())
            .count();

        healthy_count as f64 / self.circuit_breakers.len() as f64
    }

    /// Get total calls across all circuit breakers
    pub fn total_calls(&self) -> u64 {
        self.circuit_breakers
            .values()
            .map(|metrics| metrics.total_calls)
            .sum()
    }

    /// Get total countable failures across all circuit breakers
    pub fn total_failures(&self) -> u64 {
        self.circuit_breakers
            .values()
            .map(|metrics| metrics.failed_calls)
            .sum()
    }

    /// Get total rejections across all circuit breakers
    pub fn total_rejections(&self) -> u64 {
        self.circuit_breakers
            .values()
            .map(|metrics| metrics.rejected_calls)
            .sum()
    }

    /// Failed share of executed calls across the system
    pub fn system_failure_rate(&self) -> f64 {
        let executed: u64 = self
            .circuit_breakers
            .values()
            .map(CircuitBreakerMetrics::executed_calls)
            .sum();
        if executed == 0 {
            return 0.0;
        }

        self.total_failures() as f64 / executed as f64
    }

    /// Format summary for logging
    pub fn format_summary(&self) -> String {
        let state_counts = self.count_by_state();
        let closed_count = state_counts.get(&CircuitState::Closed).unwrap_or(&0);
        let open_count = state_counts.get(&CircuitState::Open).unwrap_or(&0);
        let half_open_count = state_counts.get(&CircuitState::HalfOpen).unwrap_or(&0);

        format!(
            "Circuit Breakers: {} total | {} closed | {} open | {} half-open | Health: {:.1}% | System failure rate: {:.2}%",
            self.circuit_breakers.len(),
            closed_count,
            open_count,
            half_open_count,
            self.health_score() * 100.0,
            self.system_failure_rate() * 100.0
        )
    }
}

impl Default for SystemCircuitBreakerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Metrics collection trait for integration with monitoring systems
pub trait MetricsCollector: Send + Sync + std::fmt::Debug {
    /// Record circuit breaker metrics
    fn record_circuit_breaker_metrics(&self, name: &str, metrics: &CircuitBreakerMetrics);

    /// Record circuit breaker state transition
    fn record_state_transition(&self, name: &str, from: CircuitState, to: CircuitState);

    /// Record operation timing
    fn record_operation_timing(&self, name: &str, duration: Duration, success: bool);

    /// Record a call rejected without running the operation
    fn record_rejection(&self, name: &str, state: CircuitState);
}

/// Collector that emits structured `tracing` events
#[derive(Debug, Clone, Default)]
pub struct LoggingMetricsCollector;

impl MetricsCollector for LoggingMetricsCollector {
    fn record_circuit_breaker_metrics(&self, name: &str, metrics: &CircuitBreakerMetrics) {
        tracing::info!(
            circuit_breaker = name,
            total_calls = metrics.total_calls,
            successful_calls = metrics.successful_calls,
            failed_calls = metrics.failed_calls,
            rejected_calls = metrics.rejected_calls,
            failure_rate = metrics.failure_rate,
            state = %metrics.current_state,
            "Circuit breaker metrics"
        );
    }

    fn record_state_transition(&self, name: &str, from: CircuitState, to: CircuitState) {
        tracing::info!(
            circuit_breaker = name,
            from_state = %from,
            to_state = %to,
            "Circuit breaker state transition"
        );
    }

    fn record_operation_timing(&self, name: &str, duration: Duration, success: bool) {
        tracing::debug!(
            circuit_breaker = name,
            duration_ms = duration.as_millis(),
            success = success,
            "Operation timing"
        );
    }

    fn record_rejection(&self, name: &str, state: CircuitState) {
        tracing::debug!(circuit_breaker = name, state = %state, "Call rejected");
    }
}

/// Collector that discards everything
#[derive(Debug, Clone, Default)]
pub struct NoopMetricsCollector;

impl MetricsCollector for NoopMetricsCollector {
    fn record_circuit_breaker_metrics(&self, _name: &str, _metrics: &CircuitBreakerMetrics) {}

    fn record_state_transition(&self, _name: &str, _from: CircuitState, _to: CircuitState) {}

    fn record_operation_timing(&self, _name: &str, _duration: Duration, _success: bool) {}

    fn record_rejection(&self, _name: &str, _state: CircuitState) {}
}
