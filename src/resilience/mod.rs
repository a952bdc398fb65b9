//! # Resilience Module
//!
//! Fault tolerance for calls to unreliable dependencies: circuit breakers to
//! fail fast while a dependency is down, retries with jittered exponential
//! backoff for transient errors, and fallbacks that substitute a result when
//! both give up.
//!
//! ## Architecture
//!
//! - **Circuit Breakers**: Closed/Open/HalfOpen state machine per named component,
//!   optionally mirrored through a shared [`crate::state_store::StateStore`]
//! - **Retry Managers**: bounded attempts with exponential backoff and jitter
//! - **Fallbacks**: fixed value, cached value, last result or alternate function
//! - **Registry**: owns named components; [`Registry::resilient`] composes them
//! - **Metrics and Tracing**: collector and tracer seams, no-op by default
//!
//! Every entry point comes in a blocking and an async flavour:
//! `guard`/`guard_async`, `retry`/`retry_async`, `call`/`call_async`.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tasker_resilience::resilience::{
//!     CircuitBreakerConfig, Fallback, Registry, ResilientOptions, RetryConfig,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = Registry::new();
//! registry.register_circuit_breaker("inventory", CircuitBreakerConfig::for_external_api())?;
//! registry.register_retry_manager("inventory", RetryConfig::for_external_api())?;
//!
//! let stock_level = registry.resilient(
//!     ResilientOptions::<String, u32, std::io::Error>::new("stock_level")
//!         .circuit_breaker("inventory")
//!         .retry_policy("inventory")
//!         .fallback(Fallback::fixed(0)),
//! );
//!
//! let level = stock_level
//!     .call_async("sku-123".to_string(), |sku| async move {
//!         // Call the inventory service here
//!         let _ = sku;
//!         Ok::<u32, std::io::Error>(12)
//!     })
//!     .await?;
//! # let _ = level;
//! # Ok(())
//! # }
//! ```

pub mod circuit_breaker;
pub mod classification;
pub mod config;
pub mod fallback;
pub mod metrics;
pub mod orchestrator;
pub mod registry;
pub mod retry;
pub mod tracer;


pub use circuit_breaker::{CallPermit, CircuitBreaker, CircuitBreakerError, CircuitState};
pub use classification::{matches_kind, ClassifiableError};
pub use config::{CircuitBreakerConfig, RetryConfig, StateSyncMode};
pub use fallback::{AlternateAsyncFn, AlternateFn, Fallback};
pub use metrics::{
    CircuitBreakerMetrics, LoggingMetricsCollector, MetricsCollector, NoopMetricsCollector,
    SystemCircuitBreakerMetrics,
};
pub use orchestrator::{Resilient, ResilientOptions};
pub use registry::Registry;
pub use retry::RetryManager;
pub use tracer::{NoopTracer, OperationTracer, SpanTags, SpanTracer};
