//! # Fallback Strategies
//!
//! A fallback turns a failure that survived the breaker and retry stages into
//! a substitute value. Each strategy resolves against the failed call's
//! arguments and the state store:
//!
//! - [`Fallback::fixed`]: a pre-configured value
//! - [`Fallback::cached`]: a JSON value read from `namespace/key`
//! - [`Fallback::last_result`]: the last result cached for the same operation
//!   and arguments
//! - [`Fallback::alternate`]: another function called with the same arguments
//! - [`Fallback::alternate_async`]: the same, for async call sites
//!
//! Cache reads never fail the call. When nothing usable is stored and no
//! default was given, the original error is returned.
//!
//! Serialization bounds live on the constructors that need them, so a
//! fallback over a non-serializable result type is possible as long as it
//! does not read the store.

use crate::constants::keys;
use crate::resilience::circuit_breaker::CircuitBreakerError;
use crate::state_store::StateStore;
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Substitute function invoked with the original arguments
pub type AlternateFn<A, T, E> = Arc<dyn Fn(A) -> Result<T, E> + Send + Sync>;

/// Async substitute invoked with the original arguments
pub type AlternateAsyncFn<A, T, E> =
    Arc<dyn Fn(A) -> BoxFuture<'static, Result<T, E>> + Send + Sync>;

type Supplier<T> = Arc<dyn Fn() -> T + Send + Sync>;
type Decoder<T> = fn(&str) -> serde_json::Result<T>;
pub(crate) type Encoder<X> = fn(&X) -> serde_json::Result<String>;

pub(crate) fn encode_json<X: Serialize>(value: &X) -> serde_json::Result<String> {
    serde_json::to_string(value)
}

fn decode_json<T: DeserializeOwned>(raw: &str) -> serde_json::Result<T> {
    serde_json::from_str(raw)
}

fn supplier<T: Clone + Send + Sync + 'static>(value: T) -> Supplier<T> {
    Arc::new(move || value.clone())
}

enum Strategy<A, T, E> {
    Fixed(Supplier<T>),
    Cached {
        namespace: String,
        key: String,
        decode: Decoder<T>,
    },
    LastResult {
        encode_args: Encoder<A>,
        decode: Decoder<T>,
    },
    Alternate(AlternateFn<A, T, E>),
    AlternateAsync(AlternateAsyncFn<A, T, E>),
}

/// Strategy for producing a result when a call fails
pub struct Fallback<A, T, E> {
    strategy: Strategy<A, T, E>,
    default: Option<Supplier<T>>,
}

impl<A, T, E> Fallback<A, T, E> {
    fn from_strategy(strategy: Strategy<A, T, E>) -> Self {
        Self {
            strategy,
            default: None,
        }
    }

    /// Return a constant
    pub fn fixed(value: T) -> Self
    where
        T: Clone + Send + Sync + 'static,
    {
        Self::from_strategy(Strategy::Fixed(supplier(value)))
    }

    /// Decode a value stored by someone else under `namespace/key`
    pub fn cached(namespace: impl Into<String>, key: impl Into<String>) -> Self
    where
        T: DeserializeOwned,
    {
        Self::from_strategy(Strategy::Cached {
            namespace: namespace.into(),
            key: key.into(),
            decode: decode_json::<T>,
        })
    }

    /// Decode the result cached by `cache_result` for this operation and
    /// these arguments
    pub fn last_result() -> Self
    where
        A: Serialize,
        T: DeserializeOwned,
    {
        Self::from_strategy(Strategy::LastResult {
            encode_args: encode_json::<A>,
            decode: decode_json::<T>,
        })
    }

    /// Call a substitute; its error replaces the original one
    pub fn alternate<F>(function: F) -> Self
    where
        F: Fn(A) -> Result<T, E> + Send + Sync + 'static,
    {
        Self::from_strategy(Strategy::Alternate(Arc::new(function)))
    }

    /// Await a substitute; only usable from `call_async`
    ///
    /// A synchronous call site cannot await it and returns the original
    /// error instead.
    pub fn alternate_async<F, Fut>(function: F) -> Self
    where
        A: 'static,
        T: 'static,
        E: 'static,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let boxed: AlternateAsyncFn<A, T, E> =
            Arc::new(move |args: A| -> BoxFuture<'static, Result<T, E>> {
                Box::pin(function(args))
            });
        Self::from_strategy(Strategy::AlternateAsync(boxed))
    }

    /// Value returned when a cache read finds nothing usable
    ///
    /// Has no effect on fixed and alternate strategies.
    pub fn with_default(mut self, value: T) -> Self
    where
        T: Clone + Send + Sync + 'static,
    {
        self.default = Some(supplier(value));
        self
    }

    pub fn strategy_name(&self) -> &'static str {
        match &self.strategy {
            Strategy::Fixed(_) => "fixed_value",
            Strategy::Cached { .. } => "cached_value",
            Strategy::LastResult { .. } => "last_result",
            Strategy::Alternate(_) => "alternate_function",
            Strategy::AlternateAsync(_) => "alternate_async_function",
        }
    }

    /// Whether resolution needs an async call site
    pub fn is_async(&self) -> bool {
        matches!(self.strategy, Strategy::AlternateAsync(_))
    }

    /// Produce a substitute for `original` at a synchronous call site
    ///
    /// `operation` names the call whose cached results `last_result` reads.
    pub fn resolve(
        &self,
        operation: &str,
        args: A,
        original: CircuitBreakerError<E>,
        store: &dyn StateStore,
    ) -> Result<T, CircuitBreakerError<E>> {
        debug!(strategy = self.strategy_name(), "Resolving fallback");

        match &self.strategy {
            Strategy::Fixed(value) => Ok(value()),
            Strategy::Alternate(function) => {
                info!("Invoking alternate function fallback");
                function(args).map_err(CircuitBreakerError::OperationFailed)
            }
            Strategy::AlternateAsync(_) => {
                warn!(
                    operation = operation,
                    "Async alternate fallback cannot run from a synchronous call, propagating"
                );
                Err(original)
            }
            Strategy::Cached { .. } | Strategy::LastResult { .. } => {
                self.read_store(operation, &args, store).ok_or(original)
            }
        }
    }

    /// Produce a substitute for `original` at an async call site
    pub async fn resolve_async(
        &self,
        operation: &str,
        args: A,
        original: CircuitBreakerError<E>,
        store: &dyn StateStore,
    ) -> Result<T, CircuitBreakerError<E>> {
        match &self.strategy {
            Strategy::AlternateAsync(function) => {
                info!("Awaiting async alternate function fallback");
                function(args)
                    .await
                    .map_err(CircuitBreakerError::OperationFailed)
            }
            _ => self.resolve(operation, args, original, store),
        }
    }

    fn read_store(&self, operation: &str, args: &A, store: &dyn StateStore) -> Option<T> {
        let found = match &self.strategy {
            Strategy::Cached {
                namespace,
                key,
                decode,
            } => read_cached(store, namespace, key, *decode),
            Strategy::LastResult {
                encode_args,
                decode,
            } => match encode_args(args) {
                Ok(encoded) => read_cached(
                    store,
                    keys::RESULT_NAMESPACE,
                    &keys::result_key(operation, &encoded),
                    *decode,
                ),
                Err(e) => {
                    warn!(operation = operation, error = %e, "Arguments could not be encoded for the result cache");
                    None
                }
            },
            _ => None,
        };

        found.or_else(|| self.default.as_ref().map(|value| value()))
    }
}

fn read_cached<T>(store: &dyn StateStore, namespace: &str, key: &str, decode: Decoder<T>) -> Option<T> {
    let raw = match store.get(namespace, key) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            debug!(namespace = namespace, key = key, "No cached fallback value");
            return None;
        }
        Err(e) => {
            warn!(namespace = namespace, key = key, error = %e, "Failed to read cached fallback value");
            return None;
        }
    };

    match decode(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(namespace = namespace, key = key, error = %e, "Cached fallback value could not be decoded");
            None
        }
    }
}

impl<A, T, E> Clone for Fallback<A, T, E> {
    fn clone(&self) -> Self {
        let strategy = match &self.strategy {
            Strategy::Fixed(value) => Strategy::Fixed(Arc::clone(value)),
            Strategy::Cached {
                namespace,
                key,
                decode,
            } => Strategy::Cached {
                namespace: namespace.clone(),
                key: key.clone(),
                decode: *decode,
            },
            Strategy::LastResult {
                encode_args,
                decode,
            } => Strategy::LastResult {
                encode_args: *encode_args,
                decode: *decode,
            },
            Strategy::Alternate(function) => Strategy::Alternate(Arc::clone(function)),
            Strategy::AlternateAsync(function) => Strategy::AlternateAsync(Arc::clone(function)),
        };
        Self {
            strategy,
            default: self.default.clone(),
        }
    }
}

impl<A, T, E> fmt::Debug for Fallback<A, T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("Fallback");
        debug.field("strategy", &self.strategy_name());
        if let Strategy::Cached { namespace, key, .. } = &self.strategy {
            debug.field("namespace", namespace).field("key", key);
        }
        debug.field("has_default", &self.default.is_some()).finish()
    }
}
