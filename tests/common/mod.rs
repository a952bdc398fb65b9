//! Shared helpers for integration tests

#![allow(dead_code)]

pub mod strategies;

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tasker_resilience::resilience::{
    CircuitBreakerMetrics, CircuitState, ClassifiableError, MetricsCollector,
};

/// Errors a downstream service might raise
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    #[error("request timed out")]
    Timeout,
    #[error("connection refused")]
    Connection,
    #[error("record not found")]
    NotFound,
    #[error("invalid request: {0}")]
    Validation(String),
}

impl ClassifiableError for ServiceError {
    fn error_kind(&self) -> &str {
        match self {
            ServiceError::Timeout => "timeout",
            ServiceError::Connection => "connection",
            ServiceError::NotFound => "not_found",
            ServiceError::Validation(_) => "validation",
        }
    }
}

/// Counts invocations of a fake downstream operation
#[derive(Debug, Clone, Default)]
pub struct CallCounter(Arc<AtomicU32>);

impl CallCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one invocation and return the running total
    pub fn hit(&self) -> u32 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn count(&self) -> u32 {
        self.0.load(Ordering::SeqCst)
    }
}

/// Collector that remembers state transitions and rejections
#[derive(Debug, Default)]
pub struct RecordingMetricsCollector {
    transitions: Mutex<Vec<(String, CircuitState, CircuitState)>>,
    rejections: AtomicU32,
    timings: AtomicU32,
}

impl RecordingMetricsCollector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn transitions(&self) -> Vec<(CircuitState, CircuitState)> {
        self.transitions
            .lock()
            .iter()
            .map(|(_, from, to)| (*from, *to))
            .collect()
    }

    pub fn rejections(&self) -> u32 {
        self.rejections.load(Ordering::SeqCst)
    }

    pub fn timings(&self) -> u32 {
        self.timings.load(Ordering::SeqCst)
    }
}

impl MetricsCollector for RecordingMetricsCollector {
    fn record_circuit_breaker_metrics(&self, _name: &str, _metrics: &CircuitBreakerMetrics) {}

    fn record_state_transition(&self, name: &str, from: CircuitState, to: CircuitState) {
        self.transitions.lock().push((name.to_string(), from, to));
    }

    fn record_operation_timing(&self, _name: &str, _duration: Duration, _success: bool) {
        self.timings.fetch_add(1, Ordering::SeqCst);
    }

    fn record_rejection(&self, _name: &str, _state: CircuitState) {
        self.rejections.fetch_add(1, Ordering::SeqCst);
    }
}

/// Install a test subscriber once; later calls are no-ops
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}
