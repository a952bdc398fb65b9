//! # Resilient Calls
//!
//! Composes the registered stages around an operation:
//!
//! ```text
//! circuit breaker ( retry manager ( operation ) )  -> cache result | fallback
//! ```
//!
//! The breaker's fail-fast check runs once per call, before any retry, and
//! sees the whole retry sequence as a single outcome. Stages are looked up by
//! name in the [`Registry`] on every call; a name with nothing registered
//! behind it is skipped. The retry stage never retries an error kind the
//! breaker stage excludes.
//!
//! Only result caching needs `Serialize` arguments and results; a wrapper
//! without it accepts any argument type that is `Clone`.

use crate::constants::{defaults, keys, spans};
use crate::resilience::circuit_breaker::{CircuitBreaker, CircuitBreakerError};
use crate::resilience::classification::ClassifiableError;
use crate::resilience::fallback::{encode_json, Encoder, Fallback};
use crate::resilience::registry::Registry;
use crate::resilience::retry::RetryManager;
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn, Instrument};

struct ResultCache<A, T> {
    ttl: Duration,
    encode_args: Encoder<A>,
    encode_value: Encoder<T>,
}

impl<A, T> Clone for ResultCache<A, T> {
    fn clone(&self) -> Self {
        Self {
            ttl: self.ttl,
            encode_args: self.encode_args,
            encode_value: self.encode_value,
        }
    }
}

/// What a [`Resilient`] wrapper should do around its operation
pub struct ResilientOptions<A, T, E> {
    name: String,
    circuit_breaker: Option<String>,
    retry_policy: Option<String>,
    fallback: Option<Fallback<A, T, E>>,
    cache_result: Option<ResultCache<A, T>>,
}

impl<A, T, E> ResilientOptions<A, T, E> {
    /// `name` identifies the operation in logs and result cache keys
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            circuit_breaker: None,
            retry_policy: None,
            fallback: None,
            cache_result: None,
        }
    }

    pub fn circuit_breaker(mut self, name: impl Into<String>) -> Self {
        self.circuit_breaker = Some(name.into());
        self
    }

    pub fn retry_policy(mut self, name: impl Into<String>) -> Self {
        self.retry_policy = Some(name.into());
        self
    }

    pub fn fallback(mut self, fallback: Fallback<A, T, E>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Store successful results in the state store for `ttl`
    pub fn cache_result(mut self, ttl: Duration) -> Self
    where
        A: Serialize,
        T: Serialize,
    {
        self.cache_result = Some(ResultCache {
            ttl,
            encode_args: encode_json::<A>,
            encode_value: encode_json::<T>,
        });
        self
    }

    pub fn cache_result_default(self) -> Self
    where
        A: Serialize,
        T: Serialize,
    {
        self.cache_result(defaults::RESULT_CACHE_TTL)
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<A, T, E> fmt::Debug for ResilientOptions<A, T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResilientOptions")
            .field("name", &self.name)
            .field("circuit_breaker", &self.circuit_breaker)
            .field("retry_policy", &self.retry_policy)
            .field("fallback", &self.fallback)
            .field("cache_result", &self.cache_result.as_ref().map(|cache| cache.ttl))
            .finish()
    }
}

/// An operation wrapper built by [`Registry::resilient`]
pub struct Resilient<A, T, E> {
    options: ResilientOptions<A, T, E>,
    registry: Registry,
}

impl<A, T, E> fmt::Debug for Resilient<A, T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resilient")
            .field("options", &self.options)
            .finish()
    }
}

/// Stages resolved for one call
struct Stages {
    breaker: Option<Arc<CircuitBreaker>>,
    retry: Option<Arc<RetryManager>>,
}

impl Stages {
    /// Kinds the breaker stage ignores end the retry sequence at once
    fn breaker_excludes(&self, kind: &str) -> bool {
        self.breaker
            .as_ref()
            .map_or(false, |breaker| breaker.config().is_excluded(kind))
    }
}

impl<A, T, E> Resilient<A, T, E>
where
    A: Clone,
    E: ClassifiableError,
{
    pub(crate) fn new(options: ResilientOptions<A, T, E>, registry: Registry) -> Self {
        Self { options, registry }
    }

    pub fn name(&self) -> &str {
        &self.options.name
    }

    /// Call a synchronous operation; retry delays block the current thread
    ///
    /// An async alternate fallback cannot run here; the original error is
    /// returned in its place.
    pub fn call<F>(&self, args: A, mut operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnMut(A) -> Result<T, E>,
    {
        let span = self.trace_span();
        let _entered = span.enter();

        let stages = self.resolve_stages();
        let retry = stages.retry.as_deref();
        let stop_on = |kind: &str| stages.breaker_excludes(kind);

        let mut run = || match retry {
            Some(manager) => manager.retry_with(|| operation(args.clone()), stop_on),
            None => operation(args.clone()),
        };

        let outcome = match stages.breaker.as_deref() {
            Some(breaker) => breaker.guard(run),
            None => run().map_err(CircuitBreakerError::OperationFailed),
        };

        match outcome {
            Ok(value) => Ok(self.store_result(&args, value)),
            Err(error) => match self.applicable_fallback(&error, &stages) {
                Some(fallback) => {
                    let store = self.registry.state_store();
                    fallback.resolve(&self.options.name, args, error, store.as_ref())
                }
                None => Err(error),
            },
        }
    }

    /// Call an asynchronous operation; retry delays suspend on the tokio timer
    ///
    /// Dropping the returned future abandons the call without recording an
    /// outcome or running the fallback.
    pub async fn call_async<F, Fut>(
        &self,
        args: A,
        mut operation: F,
    ) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnMut(A) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let span = self.trace_span();

        async move {
            let stages = self.resolve_stages();
            let retry = stages.retry.as_deref();
            let stages_ref = &stages;
            let stop_on = move |kind: &str| stages_ref.breaker_excludes(kind);
            let operation = &mut operation;
            let call_args = &args;

            let run = move || {
                // Moving the borrow makes this FnOnce, so the future may keep it
                let operation = operation;
                run_with_retry(retry, stop_on, call_args, operation)
            };

            let outcome = match stages.breaker.as_deref() {
                Some(breaker) => breaker.guard_async(run).await,
                None => run().await.map_err(CircuitBreakerError::OperationFailed),
            };

            match outcome {
                Ok(value) => Ok(self.store_result(&args, value)),
                Err(error) => match self.applicable_fallback(&error, &stages) {
                    Some(fallback) => {
                        let store = self.registry.state_store();
                        fallback
                            .resolve_async(&self.options.name, args, error, store.as_ref())
                            .await
                    }
                    None => Err(error),
                },
            }
        }
        .instrument(span)
        .await
    }

    fn trace_span(&self) -> tracing::Span {
        self.registry
            .tracer()
            .trace_operation(spans::RESILIENT_CALL, &[("operation", self.options.name.clone())])
    }

    fn resolve_stages(&self) -> Stages {
        let breaker = self.options.circuit_breaker.as_deref().and_then(|name| {
            let found = self.registry.circuit_breaker(name);
            if found.is_none() {
                debug!(operation = %self.options.name, circuit_breaker = name, "No circuit breaker registered, skipping stage");
            }
            found
        });

        let retry = self.options.retry_policy.as_deref().and_then(|name| {
            let found = self.registry.retry_manager(name);
            if found.is_none() {
                debug!(operation = %self.options.name, retry_policy = name, "No retry manager registered, skipping stage");
            }
            found
        });

        Stages { breaker, retry }
    }

    fn applicable_fallback(
        &self,
        error: &CircuitBreakerError<E>,
        stages: &Stages,
    ) -> Option<&Fallback<A, T, E>> {
        let fallback = self.options.fallback.as_ref()?;
        if !fallback_applies(error, stages) {
            debug!(
                operation = %self.options.name,
                error_kind = error.error_kind(),
                "Error outside fallback scope, propagating"
            );
            return None;
        }

        warn!(
            operation = %self.options.name,
            strategy = fallback.strategy_name(),
            circuit_open = error.is_circuit_open(),
            "Operation failed, using fallback"
        );
        Some(fallback)
    }

    /// Cache `value` under `{name}:{json(args)}` when result caching is on
    fn store_result(&self, args: &A, value: T) -> T {
        let Some(cache) = &self.options.cache_result else {
            return value;
        };

        let written = (cache.encode_args)(args)
            .and_then(|encoded_args| {
                (cache.encode_value)(&value).map(|encoded| (encoded_args, encoded))
            })
            .map_err(|e| e.to_string())
            .and_then(|(encoded_args, encoded)| {
                let key = keys::result_key(&self.options.name, &encoded_args);
                self.registry
                    .state_store()
                    .set(keys::RESULT_NAMESPACE, &key, &encoded, cache.ttl)
                    .map(|()| key)
                    .map_err(|e| e.to_string())
            });

        match written {
            Ok(key) => debug!(operation = %self.options.name, key = %key, "Cached operation result"),
            Err(e) => warn!(operation = %self.options.name, error = %e, "Failed to cache operation result"),
        }
        value
    }
}

async fn run_with_retry<A, T, E, F, Fut, S>(
    retry: Option<&RetryManager>,
    stop_on: S,
    args: &A,
    operation: &mut F,
) -> Result<T, E>
where
    A: Clone,
    F: FnMut(A) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: ClassifiableError,
    S: Fn(&str) -> bool,
{
    match retry {
        Some(manager) => {
            manager
                .retry_async_with(|| operation(args.clone()), stop_on)
                .await
        }
        None => operation(args.clone()).await,
    }
}

/// A rejection always qualifies. An operation error qualifies only when every
/// stage present treated it as a real failure: counted by the breaker and
/// eligible for retry.
fn fallback_applies<E: ClassifiableError>(error: &CircuitBreakerError<E>, stages: &Stages) -> bool {
    let kind = match error {
        CircuitBreakerError::CircuitOpen { .. } => return true,
        CircuitBreakerError::OperationFailed(e) => e.error_kind(),
    };

    let counted = stages
        .breaker
        .as_ref()
        .map_or(true, |breaker| breaker.config().is_countable(kind));
    let retryable = stages
        .retry
        .as_ref()
        .map_or(true, |manager| manager.config().is_retryable(kind));

    counted && retryable
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::config::{CircuitBreakerConfig, RetryConfig};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn registry() -> Registry {
        let registry = Registry::new();
        registry
            .register_circuit_breaker(
                "db",
                CircuitBreakerConfig {
                    failure_threshold: 2,
                    recovery_timeout: Duration::from_secs(60),
                    success_threshold: 1,
                    ..Default::default()
                },
            )
            .unwrap();
        registry
            .register_retry_manager(
                "quick",
                RetryConfig {
                    max_attempts: 3,
                    initial_delay: Duration::from_millis(1),
                    max_delay: Duration::from_millis(2),
                    jitter: false,
                    ..Default::default()
                },
            )
            .unwrap();
        registry
    }

    #[test]
    fn test_pass_through_without_stages() {
        let registry = Registry::new();
        let resilient = registry.resilient(ResilientOptions::<u32, u32, &str>::new("double"));

        assert_eq!(resilient.call(21, |n| Ok(n * 2)).unwrap(), 42);
        let err = resilient.call(1, |_| Err("boom")).unwrap_err();
        assert_eq!(err.into_operation_error(), Some("boom"));
    }

    #[test]
    fn test_unregistered_stage_names_are_skipped() {
        let registry = Registry::new();
        let resilient = registry.resilient(
            ResilientOptions::<(), u32, &str>::new("op")
                .circuit_breaker("missing")
                .retry_policy("missing"),
        );
        assert_eq!(resilient.call((), |_| Ok(7)).unwrap(), 7);
    }

    #[test]
    fn test_breaker_counts_one_failure_per_retried_call() {
        let registry = registry();
        let resilient = registry.resilient(
            ResilientOptions::<(), u32, &str>::new("op")
                .circuit_breaker("db")
                .retry_policy("quick"),
        );
        let calls = AtomicU32::new(0);

        let _ = resilient.call((), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            Err("down")
        });

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let breaker = registry.circuit_breaker("db").unwrap();
        assert_eq!(breaker.metrics().failure_count, 1);
        assert_eq!(breaker.metrics().total_calls, 1);
    }

    #[test]
    fn test_fixed_fallback_on_exhaustion() {
        let registry = registry();
        let resilient = registry.resilient(
            ResilientOptions::<(), u32, &str>::new("op")
                .circuit_breaker("db")
                .retry_policy("quick")
                .fallback(Fallback::fixed(42)),
        );

        assert_eq!(resilient.call((), |_| Err("down")).unwrap(), 42);
    }

    #[test]
    fn test_fallback_skipped_for_non_retryable_kind() {
        let registry = Registry::new();
        registry
            .register_retry_manager(
                "strict",
                RetryConfig {
                    max_attempts: 3,
                    initial_delay: Duration::from_millis(1),
                    max_delay: Duration::from_millis(1),
                    jitter: false,
                    ..Default::default()
                }
                .with_non_retryable_kinds(["validation"]),
            )
            .unwrap();
        let resilient = registry.resilient(
            ResilientOptions::<(), u32, &str>::new("op")
                .retry_policy("strict")
                .fallback(Fallback::fixed(0)),
        );

        let err = resilient.call((), |_| Err("validation")).unwrap_err();
        assert_eq!(err.into_operation_error(), Some("validation"));
    }

    #[test]
    fn test_fallback_on_rejection() {
        let registry = registry();
        registry.circuit_breaker("db").unwrap().force_open();
        let calls = AtomicU32::new(0);
        let resilient = registry.resilient(
            ResilientOptions::<(), u32, &str>::new("op")
                .circuit_breaker("db")
                .fallback(Fallback::fixed(5)),
        );

        let value = resilient
            .call((), |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(1)
            })
            .unwrap();
        assert_eq!(value, 5);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_cached_result_feeds_last_result_fallback() {
        let registry = registry();
        let resilient = registry.resilient(
            ResilientOptions::<String, u32, &str>::new("price")
                .cache_result_default()
                .fallback(Fallback::last_result()),
        );

        assert_eq!(resilient.call("usd".to_string(), |_| Ok(17)).unwrap(), 17);
        let stored = registry
            .state_store()
            .get(keys::RESULT_NAMESPACE, "price:\"usd\"")
            .unwrap();
        assert_eq!(stored, Some("17".to_string()));

        assert_eq!(resilient.call("usd".to_string(), |_| Err("down")).unwrap(), 17);
        // Different arguments have nothing cached
        assert!(resilient.call("eur".to_string(), |_| Err("down")).is_err());
    }

    #[tokio::test]
    async fn test_call_async_composes_stages() {
        let registry = registry();
        let resilient = registry.resilient(
            ResilientOptions::<u32, u32, &str>::new("op")
                .circuit_breaker("db")
                .retry_policy("quick"),
        );
        let calls = AtomicU32::new(0);

        let value = resilient
            .call_async(10, |n| {
                let attempt = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 2 {
                        Err("transient")
                    } else {
                        Ok(n + 1)
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(value, 11);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(registry.circuit_breaker("db").unwrap().metrics().successful_calls, 1);
    }

    #[tokio::test]
    async fn test_call_async_alternate_fallback() {
        let registry = registry();
        let resilient = registry.resilient(
            ResilientOptions::<u32, u32, &str>::new("op")
                .retry_policy("quick")
                .fallback(Fallback::alternate(|n| Ok(n * 100))),
        );

        let value = resilient
            .call_async(3, |_| async { Err("down") })
            .await
            .unwrap();
        assert_eq!(value, 300);
    }

    #[tokio::test]
    async fn test_call_async_awaits_async_alternate_fallback() {
        let registry = registry();
        let resilient = registry.resilient(
            ResilientOptions::<u32, u32, &str>::new("op")
                .circuit_breaker("db")
                .fallback(Fallback::alternate_async(|n| async move {
                    tokio::task::yield_now().await;
                    Ok(n + 1)
                })),
        );

        let value = resilient
            .call_async(41, |_| async { Err("down") })
            .await
            .unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_sync_call_propagates_error_for_async_alternate_fallback() {
        let registry = registry();
        let resilient = registry.resilient(
            ResilientOptions::<u32, u32, &str>::new("op")
                .fallback(Fallback::alternate_async(|n| async move { Ok(n) })),
        );

        let err = resilient.call(1, |_| Err("down")).unwrap_err();
        assert_eq!(err.into_operation_error(), Some("down"));
    }

    #[test]
    fn test_non_serializable_types_without_result_cache() {
        struct Connection {
            id: u32,
        }
        struct Endpoint(&'static str);
        impl Clone for Endpoint {
            fn clone(&self) -> Self {
                Endpoint(self.0)
            }
        }

        let registry = registry();
        let resilient = registry.resilient(
            ResilientOptions::<Endpoint, Connection, &str>::new("connect")
                .circuit_breaker("db")
                .retry_policy("quick")
                .fallback(Fallback::alternate(|endpoint: Endpoint| {
                    Ok(Connection {
                        id: endpoint.0.len() as u32,
                    })
                })),
        );

        let connection = resilient
            .call(Endpoint("replica"), |_| Err("refused"))
            .unwrap();
        assert_eq!(connection.id, 7);
    }
}
