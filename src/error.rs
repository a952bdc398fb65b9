//! Error types for the resilience core.
//!
//! Errors raised by wrapped operations are never converted into these types;
//! they travel untouched inside [`crate::resilience::CircuitBreakerError`].
//! `ResilienceError` covers the core's own failure modes: bad configuration,
//! registry misuse and state store trouble.

use crate::config::ConfigurationError;
use crate::state_store::StateStoreError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResilienceError {
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Invalid configuration for {component}: {reason}")]
    InvalidConfiguration { component: String, reason: String },
    #[error("State store error: {0}")]
    StateStore(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Registry error: {0}")]
    Registry(String),
}

impl ResilienceError {
    pub fn invalid_configuration(component: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            component: component.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for ResilienceError {
    fn from(error: serde_json::Error) -> Self {
        ResilienceError::Serialization(format!("JSON serialization error: {error}"))
    }
}

impl From<StateStoreError> for ResilienceError {
    fn from(error: StateStoreError) -> Self {
        ResilienceError::StateStore(error.to_string())
    }
}

impl From<ConfigurationError> for ResilienceError {
    fn from(error: ConfigurationError) -> Self {
        ResilienceError::Configuration(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ResilienceError>;
