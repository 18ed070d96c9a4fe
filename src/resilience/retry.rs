//! Retry configuration and logic.

use crate::core::{CerberError, CerberResult};
use crate::resilience::timeout::with_timeout;

use rand::Rng;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Decides whether a failed attempt should be repeated.
pub type RetryPredicate = Arc<dyn Fn(&CerberError) -> bool + Send + Sync>;

/// Observes each retry as `(attempt_number, delay)` before the wait starts.
pub type RetryCallback = Arc<dyn Fn(u32, Duration) + Send + Sync>;

/// Configuration for retry behavior.
#[derive(Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first. Zero behaves as one.
    pub max_attempts: u32,

    /// Delay before the first retry.
    pub initial_delay: Duration,

    /// Upper bound for any delay, jitter included.
    pub max_delay: Duration,

    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,

    /// Fraction in `[0, 1]` of the delay added as uniform random jitter.
    pub jitter: f64,

    /// Custom retryability check; defaults to [`CerberError::is_recoverable`].
    pub is_retryable: Option<RetryPredicate>,

    /// Called before every backoff wait.
    pub on_retry: Option<RetryCallback>,

    /// Whether timed-out attempts are retried. Takes precedence over
    /// `is_retryable` for timeout errors.
    pub retry_on_timeout: bool,
}

impl fmt::Debug for RetryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryConfig")
            .field("max_attempts", &self.max_attempts)
            .field("initial_delay", &self.initial_delay)
            .field("max_delay", &self.max_delay)
            .field("backoff_multiplier", &self.backoff_multiplier)
            .field("jitter", &self.jitter)
            .field("is_retryable", &self.is_retryable.is_some())
            .field("on_retry", &self.on_retry.is_some())
            .field("retry_on_timeout", &self.retry_on_timeout)
            .finish()
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            jitter: 0.1,
            is_retryable: None,
            on_retry: None,
            retry_on_timeout: true,
        }
    }
}

impl RetryConfig {
    /// Creates a new retry configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Disables retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Sets the maximum number of attempts.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Sets the initial delay.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum delay.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the backoff multiplier.
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier.max(1.0);
        self
    }

    /// Sets the jitter fraction, clamped to `[0, 1]`.
    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.clamp(0.0, 1.0);
        self
    }

    /// Sets a custom retryability predicate.
    pub fn with_retry_if<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&CerberError) -> bool + Send + Sync + 'static,
    {
        self.is_retryable = Some(Arc::new(predicate));
        self
    }

    /// Sets a callback invoked before each backoff wait.
    pub fn with_on_retry<C>(mut self, callback: C) -> Self
    where
        C: Fn(u32, Duration) + Send + Sync + 'static,
    {
        self.on_retry = Some(Arc::new(callback));
        self
    }

    /// Sets whether timed-out attempts are retried by [`retry_with_timeout`].
    pub fn with_retry_on_timeout(mut self, retry: bool) -> Self {
        self.retry_on_timeout = retry;
        self
    }

    /// Returns the effective attempt limit.
    pub fn attempt_limit(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Calculates the wait after the given failed attempt (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        calculate_delay(
            attempt,
            self.initial_delay,
            self.max_delay,
            self.backoff_multiplier,
            self.jitter,
        )
    }

    /// Returns whether `error` should be retried.
    ///
    /// Timeouts follow `retry_on_timeout`; everything else goes to the
    /// predicate, or [`CerberError::is_recoverable`] when none is set.
    pub fn should_retry(&self, error: &CerberError) -> bool {
        if error.is_timeout() {
            return self.retry_on_timeout;
        }
        match &self.is_retryable {
            Some(predicate) => predicate(error),
            None => error.is_recoverable(),
        }
    }
}

/// Computes an exponential backoff delay.
///
/// The base delay is `min(initial * multiplier^attempt, max)`; up to
/// `jitter * base` of uniform random delay is added and the total is capped
/// at `max` again.
pub fn calculate_delay(
    attempt: u32,
    initial: Duration,
    max: Duration,
    multiplier: f64,
    jitter: f64,
) -> Duration {
    let max_nanos = max.as_nanos() as f64;
    let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
    let base = (initial.as_nanos() as f64 * multiplier.powi(exponent)).min(max_nanos);

    let jitter = jitter.clamp(0.0, 1.0);
    let extra = if jitter > 0.0 && base > 0.0 {
        rand::thread_rng().gen_range(0.0..=jitter * base)
    } else {
        0.0
    };

    Duration::from_nanos((base + extra).min(max_nanos) as u64)
}

/// The result of a retried operation together with the attempts it took.
#[derive(Debug)]
pub struct RetryOutcome<T> {
    /// Final result: the first success or the last error.
    pub result: CerberResult<T>,
    /// Attempts made, at least one.
    pub attempts: u32,
}

impl<T> RetryOutcome<T> {
    /// Returns `true` if the operation eventually succeeded.
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Executes an async operation with retry logic.
///
/// Returns the first success, or the last error once attempts are used up
/// or the error is not retryable.
pub async fn retry<F, Fut, T>(config: &RetryConfig, operation: F) -> CerberResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = CerberResult<T>>,
{
    retry_with_stats(config, operation).await.result
}

/// Like [`retry`], but also reports how many attempts were made.
pub async fn retry_with_stats<F, Fut, T>(config: &RetryConfig, operation: F) -> RetryOutcome<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = CerberResult<T>>,
{
    run_attempts(config, operation).await
}

/// Executes an operation with retry logic, bounding each attempt by
/// `timeout`.
///
/// Timed-out attempts are retried unless `retry_on_timeout` is disabled.
pub async fn retry_with_timeout<F, Fut, T>(
    config: &RetryConfig,
    timeout: Duration,
    operation_name: &str,
    mut operation: F,
) -> CerberResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = CerberResult<T>>,
{
    retry(config, || with_timeout(operation(), timeout, operation_name)).await
}

async fn run_attempts<F, Fut, T>(config: &RetryConfig, mut operation: F) -> RetryOutcome<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = CerberResult<T>>,
{
    let limit = config.attempt_limit();
    let mut attempt = 0;

    loop {
        attempt += 1;
        let error = match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::debug!(attempt, "Operation succeeded after retry");
                }
                return RetryOutcome {
                    result: Ok(value),
                    attempts: attempt,
                };
            }
            Err(error) => error,
        };

        if attempt >= limit || !config.should_retry(&error) {
            if attempt > 1 {
                tracing::warn!(attempts = attempt, error = %error, "Giving up after retries");
            }
            return RetryOutcome {
                result: Err(error),
                attempts: attempt,
            };
        }

        let delay = config.delay_for_attempt(attempt - 1);
        if let Some(callback) = &config.on_retry {
            callback(attempt, delay);
        }
        tracing::debug!(
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "Retrying after error"
        );
        tokio::time::sleep(delay).await;
    }
}
