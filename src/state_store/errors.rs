//! State store error types

use thiserror::Error;

/// Errors that can occur during state store operations
#[derive(Debug, Error)]
pub enum StateStoreError {
    /// Failed to connect to the store backend
    #[error("State store connection error: {0}")]
    ConnectionError(String),

    /// Stored value could not be interpreted
    #[error("State store serialization error: {0}")]
    SerializationError(String),

    /// Store operation timed out
    #[error("State store operation timed out: {0}")]
    Timeout(String),

    /// Generic backend error
    #[error("State store backend error: {0}")]
    BackendError(String),
}

/// Result type for state store operations
pub type StateStoreResult<T> = Result<T, StateStoreError>;
