//! # Circuit Breaker Implementation
//!
//! Provides fault isolation to prevent cascade failures in distributed systems.
//! This implementation follows the classic circuit breaker pattern with three states:
//! Closed (normal operation), Open (failing fast), and Half-Open (testing recovery).
//!
//! State and the per-window counters live behind one `parking_lot` mutex; the
//! cumulative counters are lock-free atomics. Nothing in admission or outcome
//! recording awaits, so the same state machine serves [`CircuitBreaker::guard`]
//! and [`CircuitBreaker::guard_async`].
//!
//! When a state store is attached, transitions are mirrored under
//! `circuit:{name}:state` and, in [`StateSyncMode::Authoritative`], the
//! mirrored value overrides local state before every admission. Store access
//! happens while the breaker lock is held, so a process never observes its own
//! writes out of order. Across processes the mirror is read-then-write and
//! therefore only eventually consistent.

use crate::constants::{defaults, keys, spans};
use crate::resilience::classification::ClassifiableError;
use crate::resilience::config::{CircuitBreakerConfig, StateSyncMode};
use crate::resilience::metrics::{
    CircuitBreakerMetrics, LoggingMetricsCollector, MetricsCollector,
};
use crate::resilience::tracer::{NoopTracer, OperationTracer};
use crate::state_store::StateStore;
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn, Instrument};

/// Circuit breaker states representing the current operational mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Normal operation - all calls are allowed through
    Closed = 0,
    /// Failure mode - all calls fail fast without executing
    Open = 1,
    /// Testing recovery - limited calls allowed to test system health
    HalfOpen = 2,
}

impl From<u8> for CircuitState {
    fn from(value: u8) -> Self {
        match value {
            0 => CircuitState::Closed,
            1 => CircuitState::Open,
            2 => CircuitState::HalfOpen,
            _ => CircuitState::Open, // Default to safest state
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
            CircuitState::HalfOpen => write!(f, "half_open"),
        }
    }
}

/// Errors surfaced by a guarded call
///
/// `CircuitOpen` means the operation was never attempted; `OperationFailed`
/// carries the operation's own error untouched.
#[derive(Debug, thiserror::Error)]
pub enum CircuitBreakerError<E> {
    /// Circuit is open (or half-open at capacity), rejecting calls
    #[error("Circuit breaker is open for {component}")]
    CircuitOpen { component: String },

    /// Operation ran and failed
    #[error("Operation failed: {0}")]
    OperationFailed(E),
}

impl<E> CircuitBreakerError<E> {
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, CircuitBreakerError::CircuitOpen { .. })
    }

    pub fn operation_error(&self) -> Option<&E> {
        match self {
            CircuitBreakerError::OperationFailed(e) => Some(e),
            CircuitBreakerError::CircuitOpen { .. } => None,
        }
    }

    pub fn into_operation_error(self) -> Option<E> {
        match self {
            CircuitBreakerError::OperationFailed(e) => Some(e),
            CircuitBreakerError::CircuitOpen { .. } => None,
        }
    }
}

impl<E: ClassifiableError> ClassifiableError for CircuitBreakerError<E> {
    fn error_kind(&self) -> &str {
        match self {
            CircuitBreakerError::CircuitOpen { .. } => "circuit_open",
            CircuitBreakerError::OperationFailed(e) => e.error_kind(),
        }
    }
}

/// Lock-free cumulative counters
#[derive(Debug, Default)]
struct CumulativeCounters {
    total_calls: AtomicU64,
    successful_calls: AtomicU64,
    failed_calls: AtomicU64,
    rejected_calls: AtomicU64,
    state_transitions: AtomicU64,
    total_duration_nanos: AtomicU64,
}

impl CumulativeCounters {
    #[inline]
    fn add_duration(&self, duration: Duration) {
        self.total_duration_nanos
            .fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);
    }

    fn reset(&self) {
        for counter in [
            &self.total_calls,
            &self.successful_calls,
            &self.failed_calls,
            &self.rejected_calls,
            &self.state_transitions,
            &self.total_duration_nanos,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// State and per-window counters, guarded by the breaker mutex
#[derive(Debug)]
struct BreakerCore {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    half_open_calls_in_flight: u32,
    /// Bumped on every transition so permits from an earlier window are
    /// recognised and do not release slots they never held
    generation: u64,
    last_failure_ms: Option<i64>,
}

impl BreakerCore {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            success_count: 0,
            half_open_calls_in_flight: 0,
            generation: 0,
            last_failure_ms: None,
        }
    }

    fn transition(&mut self, to: CircuitState, adopted: bool) -> Transition {
        let from = self.state;
        let failures = self.failure_count;
        self.state = to;
        self.failure_count = 0;
        self.success_count = 0;
        self.half_open_calls_in_flight = 0;
        self.generation = self.generation.wrapping_add(1);
        Transition {
            from,
            to,
            failures,
            adopted,
        }
    }

    fn recovery_elapsed(&self, now_ms: i64, recovery_timeout: Duration) -> bool {
        let since = self.last_failure_ms.unwrap_or(0);
        let elapsed_ms = now_ms.saturating_sub(since).max(0) as u128;
        elapsed_ms >= recovery_timeout.as_millis()
    }

    fn release_probe(&mut self, probe_generation: Option<u64>) {
        if probe_generation == Some(self.generation) && self.state == CircuitState::HalfOpen {
            self.half_open_calls_in_flight = self.half_open_calls_in_flight.saturating_sub(1);
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Transition {
    from: CircuitState,
    to: CircuitState,
    /// Consecutive failures observed when the transition fired
    failures: u32,
    /// Taken over from the state store rather than caused locally
    adopted: bool,
}

/// Value stored under `circuit:{name}:state`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct MirroredState {
    state: CircuitState,
    last_failure_ms: Option<i64>,
}

#[inline]
fn epoch_millis_now() -> i64 {
    Utc::now().timestamp_millis()
}

/// Admission granted by [`CircuitBreaker::try_acquire`]
///
/// Record the outcome with one of the `record_*` methods. A permit dropped
/// without a recorded outcome (a cancelled future, a panic) releases its
/// half-open probe slot and leaves every counter untouched.
#[must_use = "record the outcome of the admitted call"]
#[derive(Debug)]
pub struct CallPermit<'a> {
    breaker: &'a CircuitBreaker,
    probe_generation: Option<u64>,
    settled: bool,
}

impl CallPermit<'_> {
    /// Whether this call is a half-open probe
    pub fn is_probe(&self) -> bool {
        self.probe_generation.is_some()
    }

    pub fn record_success(mut self, duration: Duration) {
        self.settled = true;
        self.breaker.on_success(duration, self.probe_generation);
    }

    pub fn record_failure(mut self, duration: Duration) {
        self.settled = true;
        self.breaker.on_failure(duration, self.probe_generation);
    }

    /// Release the permit without affecting circuit state
    pub fn record_ignored(mut self, kind: &str) {
        self.settled = true;
        self.breaker.on_ignored(kind, self.probe_generation);
    }

    fn settle<T, E: ClassifiableError>(self, result: &Result<T, E>, duration: Duration) {
        match result {
            Ok(_) => self.record_success(duration),
            Err(e) => {
                let kind = e.error_kind();
                if self.breaker.config.is_countable(kind) {
                    self.record_failure(duration);
                } else {
                    self.record_ignored(kind);
                }
            }
        }
    }
}

impl Drop for CallPermit<'_> {
    fn drop(&mut self) {
        if !self.settled {
            debug!(component = %self.breaker.name, "Call abandoned before completion");
            self.breaker.core.lock().release_probe(self.probe_generation);
        }
    }
}

/// Core circuit breaker implementation
pub struct CircuitBreaker {
    /// Component name for logging, metrics and store keys
    name: String,

    /// Configuration parameters
    config: CircuitBreakerConfig,

    core: Mutex<BreakerCore>,

    counters: CumulativeCounters,

    store: Option<Arc<dyn StateStore>>,

    collector: Arc<dyn MetricsCollector>,

    tracer: Arc<dyn OperationTracer>,
}

impl fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("state", &self.core.lock().state)
            .field("config", &self.config)
            .field("store", &self.store.as_ref().map(|s| s.provider_name()))
            .finish()
    }
}

impl CircuitBreaker {
    /// Create a new circuit breaker with the given name and configuration
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        let name = name.into();
        info!(
            component = %name,
            failure_threshold = config.failure_threshold,
            recovery_timeout_ms = config.recovery_timeout.as_millis() as u64,
            success_threshold = config.success_threshold,
            half_open_max_calls = config.half_open_max_calls,
            "Circuit breaker initialized"
        );

        Self {
            name,
            config,
            core: Mutex::new(BreakerCore::new()),
            counters: CumulativeCounters::default(),
            store: None,
            collector: Arc::new(LoggingMetricsCollector),
            tracer: Arc::new(NoopTracer),
        }
    }

    /// Mirror state through a shared store
    pub fn with_state_store(mut self, store: Arc<dyn StateStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_metrics_collector(mut self, collector: Arc<dyn MetricsCollector>) -> Self {
        self.collector = collector;
        self
    }

    pub fn with_tracer(mut self, tracer: Arc<dyn OperationTracer>) -> Self {
        self.tracer = tracer;
        self
    }

    /// Get component name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Get current circuit state, merging any shared state first
    pub fn state(&self) -> CircuitState {
        let (state, adopted) = {
            let mut core = self.core.lock();
            let adopted = self.merge_shared_state(&mut core);
            (core.state, adopted)
        };
        if let Some(transition) = adopted {
            self.announce(transition);
        }
        state
    }

    /// Execute a synchronous operation with circuit breaker protection
    pub fn guard<T, E, F>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Result<T, E>,
        E: ClassifiableError,
    {
        let span = self.trace_span();
        let _entered = span.enter();

        let permit = self.admit()?;
        let start = Instant::now();
        let result = operation();
        permit.settle(&result, start.elapsed());

        result.map_err(CircuitBreakerError::OperationFailed)
    }

    /// Execute an asynchronous operation with circuit breaker protection
    ///
    /// Dropping the returned future before it completes abandons the call:
    /// no outcome is recorded and any half-open probe slot is released.
    pub async fn guard_async<T, E, F, Fut>(
        &self,
        operation: F,
    ) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: ClassifiableError,
    {
        let span = self.trace_span();

        async move {
            let permit = self.admit()?;
            let start = Instant::now();
            let result = operation().await;
            permit.settle(&result, start.elapsed());

            result.map_err(CircuitBreakerError::OperationFailed)
        }
        .instrument(span)
        .await
    }

    /// Ask for admission without wrapping the operation in a closure
    ///
    /// Returns `None` when the call must fail fast; the rejection is counted.
    pub fn try_acquire(&self) -> Option<CallPermit<'_>> {
        self.counters.total_calls.fetch_add(1, Ordering::Relaxed);
        let now_ms = epoch_millis_now();

        let mut transitions = Vec::with_capacity(2);
        let admission = {
            let mut core = self.core.lock();
            transitions.extend(self.merge_shared_state(&mut core));

            if core.state == CircuitState::Open
                && core.recovery_elapsed(now_ms, self.config.recovery_timeout)
            {
                transitions.push(self.apply_transition(&mut core, CircuitState::HalfOpen));
            }

            match core.state {
                CircuitState::Closed => Ok(None),
                CircuitState::Open => Err(CircuitState::Open),
                CircuitState::HalfOpen => {
                    if core.half_open_calls_in_flight < self.config.half_open_max_calls {
                        core.half_open_calls_in_flight += 1;
                        Ok(Some(core.generation))
                    } else {
                        Err(CircuitState::HalfOpen)
                    }
                }
            }
        };

        for transition in transitions {
            self.announce(transition);
        }

        match admission {
            Ok(probe_generation) => Some(CallPermit {
                breaker: self,
                probe_generation,
                settled: false,
            }),
            Err(state) => {
                self.counters.rejected_calls.fetch_add(1, Ordering::Relaxed);
                self.collector.record_rejection(&self.name, state);
                debug!(component = %self.name, state = %state, "Call rejected (failing fast)");
                None
            }
        }
    }

    fn admit<E>(&self) -> Result<CallPermit<'_>, CircuitBreakerError<E>> {
        self.try_acquire()
            .ok_or_else(|| CircuitBreakerError::CircuitOpen {
                component: self.name.clone(),
            })
    }

    fn trace_span(&self) -> tracing::Span {
        self.tracer.trace_operation(
            spans::CIRCUIT_BREAKER_GUARD,
            &[("circuit_breaker", self.name.clone())],
        )
    }

    fn on_success(&self, duration: Duration, probe_generation: Option<u64>) {
        self.counters.successful_calls.fetch_add(1, Ordering::Relaxed);
        self.counters.add_duration(duration);
        self.collector
            .record_operation_timing(&self.name, duration, true);

        debug!(
            component = %self.name,
            duration_ms = duration.as_millis() as u64,
            "Operation succeeded"
        );

        let transition = {
            let mut core = self.core.lock();
            core.release_probe(probe_generation);

            match core.state {
                CircuitState::HalfOpen => {
                    core.success_count += 1;
                    if core.success_count >= self.config.success_threshold {
                        Some(self.apply_transition(&mut core, CircuitState::Closed))
                    } else {
                        None
                    }
                }
                CircuitState::Closed => {
                    core.failure_count = 0;
                    self.clear_shared_failures();
                    None
                }
                CircuitState::Open => {
                    warn!(component = %self.name, "Success recorded while circuit is open");
                    None
                }
            }
        };

        if let Some(transition) = transition {
            self.announce(transition);
        }
    }

    fn on_failure(&self, duration: Duration, probe_generation: Option<u64>) {
        self.counters.failed_calls.fetch_add(1, Ordering::Relaxed);
        self.counters.add_duration(duration);
        self.collector
            .record_operation_timing(&self.name, duration, false);

        warn!(
            component = %self.name,
            duration_ms = duration.as_millis() as u64,
            "Operation failed"
        );

        let now_ms = epoch_millis_now();
        let transition = {
            let mut core = self.core.lock();
            core.last_failure_ms = Some(now_ms);
            core.release_probe(probe_generation);

            match core.state {
                CircuitState::HalfOpen => {
                    Some(self.apply_transition(&mut core, CircuitState::Open))
                }
                CircuitState::Closed => {
                    let local = core.failure_count.saturating_add(1);
                    core.failure_count = match self.increment_shared_failures() {
                        Some(shared) => local.max(shared),
                        None => local,
                    };
                    if core.failure_count >= self.config.failure_threshold {
                        Some(self.apply_transition(&mut core, CircuitState::Open))
                    } else {
                        None
                    }
                }
                // Already open, just record the failure
                CircuitState::Open => None,
            }
        };

        if let Some(transition) = transition {
            self.announce(transition);
        }
    }

    fn on_ignored(&self, kind: &str, probe_generation: Option<u64>) {
        debug!(
            component = %self.name,
            error_kind = kind,
            "Error kind not counted toward circuit state"
        );
        self.core.lock().release_probe(probe_generation);
    }

    /// Transition caused locally; mirrored to the store while the lock is held
    fn apply_transition(&self, core: &mut BreakerCore, to: CircuitState) -> Transition {
        let transition = core.transition(to, false);
        self.write_through(core);
        self.clear_shared_failures();
        transition
    }

    /// Log, count and report a transition after the lock is released
    fn announce(&self, transition: Transition) {
        self.counters
            .state_transitions
            .fetch_add(1, Ordering::Relaxed);
        self.collector
            .record_state_transition(&self.name, transition.from, transition.to);

        if transition.adopted {
            info!(
                component = %self.name,
                from_state = %transition.from,
                to_state = %transition.to,
                "Circuit breaker adopted shared state"
            );
            return;
        }

        match transition.to {
            CircuitState::Open => error!(
                component = %self.name,
                from_state = %transition.from,
                consecutive_failures = transition.failures,
                failure_threshold = self.config.failure_threshold,
                recovery_timeout_ms = self.config.recovery_timeout.as_millis() as u64,
                "Circuit breaker opened (failing fast)"
            ),
            CircuitState::HalfOpen => info!(
                component = %self.name,
                success_threshold = self.config.success_threshold,
                half_open_max_calls = self.config.half_open_max_calls,
                "Circuit breaker half-open (testing recovery)"
            ),
            CircuitState::Closed => info!(
                component = %self.name,
                total_calls = self.counters.total_calls.load(Ordering::Relaxed),
                "Circuit breaker closed (recovered)"
            ),
        }
    }

    fn sync_store(&self) -> Option<&Arc<dyn StateStore>> {
        self.store.as_ref()
    }

    fn state_key(&self) -> String {
        keys::circuit_state_key(&self.name)
    }

    fn failures_key(&self) -> String {
        format!("{}:failures", self.name)
    }

    /// Adopt the stored state when it differs from ours
    fn merge_shared_state(&self, core: &mut BreakerCore) -> Option<Transition> {
        if !self.config.state_sync.reads_store() {
            return None;
        }
        let store = self.sync_store()?;

        let raw = match store.get(keys::CIRCUIT_NAMESPACE, &self.state_key()) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(component = %self.name, error = %e, "Failed to read shared circuit state");
                return None;
            }
        };

        let mirrored: MirroredState = match serde_json::from_str(&raw) {
            Ok(mirrored) => mirrored,
            Err(e) => {
                warn!(component = %self.name, error = %e, "Ignoring malformed shared circuit state");
                return None;
            }
        };

        if mirrored.state == core.state {
            // Keep the later failure time so recovery windows line up across processes
            if let Some(remote) = mirrored.last_failure_ms {
                core.last_failure_ms = Some(core.last_failure_ms.map_or(remote, |l| l.max(remote)));
            }
            return None;
        }

        core.last_failure_ms = mirrored
            .last_failure_ms
            .or(core.last_failure_ms)
            .or_else(|| Some(epoch_millis_now()));
        Some(core.transition(mirrored.state, true))
    }

    fn write_through(&self, core: &BreakerCore) {
        if !self.config.state_sync.writes_store() {
            return;
        }
        let Some(store) = self.sync_store() else {
            return;
        };

        let mirrored = MirroredState {
            state: core.state,
            last_failure_ms: core.last_failure_ms,
        };
        let result = serde_json::to_string(&mirrored)
            .map_err(|e| e.to_string())
            .and_then(|value| {
                store
                    .set(
                        keys::CIRCUIT_NAMESPACE,
                        &self.state_key(),
                        &value,
                        defaults::CIRCUIT_STATE_TTL,
                    )
                    .map_err(|e| e.to_string())
            });

        if let Err(e) = result {
            warn!(component = %self.name, error = %e, "Failed to mirror circuit state");
        }
    }

    fn increment_shared_failures(&self) -> Option<u32> {
        if self.config.state_sync != StateSyncMode::Authoritative {
            return None;
        }
        let store = self.sync_store()?;

        match store.increment(
            keys::CIRCUIT_NAMESPACE,
            &self.failures_key(),
            defaults::CIRCUIT_STATE_TTL,
        ) {
            Ok(count) => Some(count.clamp(0, i64::from(u32::MAX)) as u32),
            Err(e) => {
                warn!(component = %self.name, error = %e, "Failed to increment shared failure count");
                None
            }
        }
    }

    fn clear_shared_failures(&self) {
        if self.config.state_sync != StateSyncMode::Authoritative {
            return;
        }
        if let Some(store) = self.sync_store() {
            if let Err(e) = store.delete(keys::CIRCUIT_NAMESPACE, &self.failures_key()) {
                warn!(component = %self.name, error = %e, "Failed to clear shared failure count");
            }
        }
    }

    /// Force circuit to open state (for emergency situations)
    pub fn force_open(&self) {
        warn!(component = %self.name, "Circuit breaker forced open");
        let transition = {
            let mut core = self.core.lock();
            core.last_failure_ms = Some(epoch_millis_now());
            if core.state == CircuitState::Open {
                self.write_through(&core);
                None
            } else {
                Some(self.apply_transition(&mut core, CircuitState::Open))
            }
        };
        if let Some(transition) = transition {
            self.announce(transition);
        }
    }

    /// Force circuit to closed state (for emergency recovery)
    pub fn force_closed(&self) {
        warn!(component = %self.name, "Circuit breaker forced closed");
        let transition = {
            let mut core = self.core.lock();
            if core.state == CircuitState::Closed {
                core.failure_count = 0;
                self.write_through(&core);
                self.clear_shared_failures();
                None
            } else {
                Some(self.apply_transition(&mut core, CircuitState::Closed))
            }
        };
        if let Some(transition) = transition {
            self.announce(transition);
        }
    }

    /// Return to a fresh closed breaker: counters zeroed, shared mirror removed
    pub fn reset(&self) {
        {
            let mut core = self.core.lock();
            *core = BreakerCore::new();
            if let Some(store) = self.sync_store() {
                if self.config.state_sync.writes_store() {
                    if let Err(e) = store.delete(keys::CIRCUIT_NAMESPACE, &self.state_key()) {
                        warn!(component = %self.name, error = %e, "Failed to remove shared circuit state");
                    }
                }
            }
            self.clear_shared_failures();
        }
        self.counters.reset();
        info!(component = %self.name, "Circuit breaker reset");
    }

    /// Get current metrics snapshot
    pub fn metrics(&self) -> CircuitBreakerMetrics {
        let (state, failure_count, success_count, in_flight, last_failure_ms) = {
            let core = self.core.lock();
            (
                core.state,
                core.failure_count,
                core.success_count,
                core.half_open_calls_in_flight,
                core.last_failure_ms,
            )
        };

        let total_calls = self.counters.total_calls.load(Ordering::Relaxed);
        let successful_calls = self.counters.successful_calls.load(Ordering::Relaxed);
        let failed_calls = self.counters.failed_calls.load(Ordering::Relaxed);
        let total_duration_nanos = self.counters.total_duration_nanos.load(Ordering::Relaxed);
        let executed = successful_calls + failed_calls;

        let (failure_rate, success_rate, average_duration) = if executed > 0 {
            (
                failed_calls as f64 / executed as f64,
                successful_calls as f64 / executed as f64,
                Duration::from_nanos(total_duration_nanos / executed),
            )
        } else {
            (0.0, 0.0, Duration::ZERO)
        };

        CircuitBreakerMetrics {
            total_calls,
            successful_calls,
            failed_calls,
            rejected_calls: self.counters.rejected_calls.load(Ordering::Relaxed),
            state_transitions: self.counters.state_transitions.load(Ordering::Relaxed),
            failure_count,
            success_count,
            half_open_calls_in_flight: in_flight,
            total_duration: Duration::from_nanos(total_duration_nanos),
            current_state: state,
            failure_rate,
            success_rate,
            average_duration,
            last_failure_time: last_failure_ms
                .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        }
    }

    /// Report the current snapshot through the metrics collector
    pub fn publish_metrics(&self) {
        let metrics = self.metrics();
        self.collector
            .record_circuit_breaker_metrics(&self.name, &metrics);
    }

    /// Check if circuit is healthy (closed state with low failure rate)
    pub fn is_healthy(&self) -> bool {
        if self.state() != CircuitState::Closed {
            return false;
        }

        let successful = self.counters.successful_calls.load(Ordering::Relaxed);
        let failed = self.counters.failed_calls.load(Ordering::Relaxed);
        let executed = successful + failed;
        if executed < defaults::MIN_CALLS_FOR_HEALTH {
            // Too few calls to determine health
            return true;
        }

        (failed as f64 / executed as f64) < defaults::UNHEALTHY_FAILURE_RATE
    }
}
