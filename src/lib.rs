#![allow(clippy::doc_markdown)] // Allow technical terms like HalfOpen, TTL in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Tasker Resilience
//!
//! Circuit breaking, retry with backoff and fallback substitution for calls
//! to unreliable dependencies.
//!
//! ## Overview
//!
//! A call made through [`resilience::Resilient`] passes through up to three
//! stages. The circuit breaker fails fast while its dependency is known to be
//! down; inside it, the retry manager re-runs transient failures with
//! jittered exponential backoff; a failure that survives both can be replaced
//! by a fallback value. Breaker state can be mirrored through a shared
//! [`state_store::StateStore`] so that processes sharing a backend converge
//! on the same view of a dependency.
//!
//! ## Module Organization
//!
//! - [`resilience`] - Circuit breaker, retry manager, fallbacks, registry
//! - [`state_store`] - Shared key-value contract and providers
//! - [`config`] - File and environment driven settings
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured console and JSON file logging
//! - [`constants`] - Key layout, defaults and limits
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tasker_resilience::config::ConfigManager;
//! use tasker_resilience::resilience::Registry;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! tasker_resilience::logging::init_structured_logging();
//!
//! // Load config/resilience.yaml with environment overrides
//! let config = ConfigManager::load()?;
//! let registry = Registry::from_settings(config.settings())?;
//!
//! if let Some(breaker) = registry.circuit_breaker("database") {
//!     let rows = breaker.guard(|| Ok::<_, std::io::Error>(vec![1, 2, 3]))?;
//!     println!("fetched {} rows", rows.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod resilience;
pub mod state_store;

pub use error::{ResilienceError, Result};
pub use resilience::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitState, ClassifiableError,
    Fallback, Registry, Resilient, ResilientOptions, RetryConfig, RetryManager,
};
