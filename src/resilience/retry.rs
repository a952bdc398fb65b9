//! # Retry Manager
//!
//! Re-runs a failing operation with jittered exponential backoff.
//!
//! Attempt `n` (1-based) that fails with a retry-eligible error sleeps for
//! `min(initial_delay * exponential_base^(n-1), max_delay)`, spread over
//! +/- 25% when jitter is on, before attempt `n + 1`. The error of the final
//! attempt is returned unchanged; ineligible errors are returned at once.

use crate::constants::{defaults, spans};
use crate::resilience::classification::ClassifiableError;
use crate::resilience::config::RetryConfig;
use crate::resilience::tracer::{NoopTracer, OperationTracer};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn, Instrument};

/// What to do after an attempt finished
enum AttemptOutcome<T, E> {
    Finished(Result<T, E>),
    RetryAfter(Duration),
}

/// Retries operations according to a [`RetryConfig`]
pub struct RetryManager {
    name: String,
    config: RetryConfig,
    tracer: Arc<dyn OperationTracer>,
}

impl fmt::Debug for RetryManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryManager")
            .field("name", &self.name)
            .field("config", &self.config)
            .finish()
    }
}

impl RetryManager {
    pub fn new(name: impl Into<String>, config: RetryConfig) -> Self {
        let name = name.into();
        debug!(
            component = %name,
            max_attempts = config.max_attempts,
            initial_delay_ms = config.initial_delay.as_millis() as u64,
            max_delay_ms = config.max_delay.as_millis() as u64,
            jitter = config.jitter,
            "Retry manager initialized"
        );

        Self {
            name,
            config,
            tracer: Arc::new(NoopTracer),
        }
    }

    pub fn with_tracer(mut self, tracer: Arc<dyn OperationTracer>) -> Self {
        self.tracer = tracer;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Delay to sleep after failed attempt `attempt`, jitter included
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.config.base_delay(attempt);
        if self.config.jitter {
            apply_jitter(base, fastrand::f64())
        } else {
            base
        }
    }

    /// Run a synchronous operation, blocking the thread between attempts
    pub fn retry<T, E, F>(&self, operation: F) -> Result<T, E>
    where
        F: FnMut() -> Result<T, E>,
        E: ClassifiableError,
    {
        self.retry_with(operation, |_| false)
    }

    /// Like [`retry`](Self::retry), also stopping on kinds `stop_on` matches
    pub(crate) fn retry_with<T, E, F, S>(&self, mut operation: F, stop_on: S) -> Result<T, E>
    where
        F: FnMut() -> Result<T, E>,
        E: ClassifiableError,
        S: Fn(&str) -> bool,
    {
        let mut attempt = 1;
        loop {
            let span = self.attempt_span(attempt);
            let result = span.in_scope(&mut operation);

            match self.assess(result, attempt, &stop_on) {
                AttemptOutcome::Finished(result) => return result,
                AttemptOutcome::RetryAfter(delay) => std::thread::sleep(delay),
            }
            attempt += 1;
        }
    }

    /// Run an asynchronous operation, sleeping on the tokio timer between attempts
    pub async fn retry_async<T, E, F, Fut>(&self, operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: ClassifiableError,
    {
        self.retry_async_with(operation, |_| false).await
    }

    pub(crate) async fn retry_async_with<T, E, F, Fut, S>(
        &self,
        mut operation: F,
        stop_on: S,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: ClassifiableError,
        S: Fn(&str) -> bool,
    {
        let mut attempt = 1;
        loop {
            let span = self.attempt_span(attempt);
            let result = operation().instrument(span).await;

            match self.assess(result, attempt, &stop_on) {
                AttemptOutcome::Finished(result) => return result,
                AttemptOutcome::RetryAfter(delay) => tokio::time::sleep(delay).await,
            }
            attempt += 1;
        }
    }

    fn attempt_span(&self, attempt: u32) -> tracing::Span {
        self.tracer.trace_operation(
            spans::RETRY_ATTEMPT,
            &[
                ("retry_manager", self.name.clone()),
                ("attempt", attempt.to_string()),
            ],
        )
    }

    fn assess<T, E: ClassifiableError>(
        &self,
        result: Result<T, E>,
        attempt: u32,
        stop_on: &dyn Fn(&str) -> bool,
    ) -> AttemptOutcome<T, E> {
        let error = match result {
            Ok(value) => {
                if attempt > 1 {
                    info!(
                        component = %self.name,
                        attempt = attempt,
                        "Operation succeeded after retry"
                    );
                }
                return AttemptOutcome::Finished(Ok(value));
            }
            Err(error) => error,
        };

        let kind = error.error_kind();
        if !self.config.is_retryable(kind) || stop_on(kind) {
            debug!(
                component = %self.name,
                error_kind = kind,
                "Error kind is not retryable"
            );
            return AttemptOutcome::Finished(Err(error));
        }

        if attempt >= self.config.max_attempts {
            error!(
                component = %self.name,
                attempts = attempt,
                error_kind = kind,
                "Retry attempts exhausted"
            );
            return AttemptOutcome::Finished(Err(error));
        }

        let delay = self.delay_for_attempt(attempt);
        warn!(
            component = %self.name,
            attempt = attempt,
            max_attempts = self.config.max_attempts,
            delay_ms = delay.as_millis() as u64,
            error_kind = kind,
            "Operation failed, retrying"
        );
        AttemptOutcome::RetryAfter(delay)
    }
}

/// Spread `base` over `[base * 0.75, base * 1.25)` using `sample` in `[0, 1)`
fn apply_jitter(base: Duration, sample: f64) -> Duration {
    let offset = (sample * 2.0 - 1.0) * defaults::JITTER_RATIO;
    base.mul_f64((1.0 + offset).max(0.0))
}
