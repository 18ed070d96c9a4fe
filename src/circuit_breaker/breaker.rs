//! Circuit breaker implementation.

use crate::circuit_breaker::config::CircuitBreakerConfig;
use crate::circuit_breaker::state::{transition, BreakerEvent, BreakerState, CircuitState};
use crate::circuit_breaker::window::{FailureWindow, StatsTracker};
use crate::core::{CerberError, CerberResult, SharedClock, SystemClock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

/// A per-resource fail-fast guard.
///
/// The breaker monitors failures of the calls it wraps and rejects calls
/// outright while the protected resource is considered unhealthy.
///
/// # States
///
/// - **Closed**: Calls pass through. Failures are counted in a sliding window
///   and the circuit opens once `failure_threshold` is reached.
/// - **Open**: Calls are rejected with [`CerberError::CircuitOpen`] without
///   running, until `reset_timeout` has elapsed.
/// - **Half-Open**: Calls run as probes. `success_threshold` consecutive
///   successes close the circuit; any failure reopens it.
///
/// # Example
///
/// ```rust,ignore
/// use cerber::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
///
/// let breaker = CircuitBreaker::new("actionlint", CircuitBreakerConfig::default());
/// let result = breaker.execute(|| adapter.run(&options)).await;
/// ```
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    clock: SharedClock,
    inner: Mutex<BreakerInner>,
}

#[derive(Debug)]
struct BreakerInner {
    state: BreakerState,
    last_state_change: Instant,
    last_state_change_at: DateTime<Utc>,
    window: FailureWindow,
    stats: StatsTracker,
    rejected_calls: u64,
    times_opened: u64,
}

/// A point-in-time snapshot of a breaker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakerStats {
    /// Breaker name.
    pub name: String,
    /// Current state.
    pub state: CircuitState,
    /// Calls that reached the wrapped function since the last close.
    pub total_calls: u64,
    /// Successful calls since the last close.
    pub total_successes: u64,
    /// Failed calls since the last close.
    pub total_failures: u64,
    /// Successes since the last failure.
    pub consecutive_successes: u32,
    /// Failures currently inside the window.
    pub recent_failures: usize,
    /// Calls rejected while open.
    pub rejected_calls: u64,
    /// Times the circuit has opened.
    pub times_opened: u64,
    /// When the last failure happened.
    pub last_failure_at: Option<DateTime<Utc>>,
    /// When the state last changed.
    pub last_state_change_at: DateTime<Utc>,
}

impl CircuitBreaker {
    /// Creates a breaker reading time from the system clock.
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self::with_clock(name, config, SystemClock::shared())
    }

    /// Creates a breaker with an explicit clock.
    pub fn with_clock(
        name: impl Into<String>,
        config: CircuitBreakerConfig,
        clock: SharedClock,
    ) -> Self {
        let now = clock.now();
        let window = FailureWindow::new(config.failure_window);
        Self {
            name: name.into(),
            config,
            clock,
            inner: Mutex::new(BreakerInner {
                state: BreakerState::Closed,
                last_state_change: now,
                last_state_change_at: Utc::now(),
                window,
                stats: StatsTracker::new(),
                rejected_calls: 0,
                times_opened: 0,
            }),
        }
    }

    /// Returns the breaker name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns a reference to the configuration.
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Returns the current state.
    pub fn state(&self) -> BreakerState {
        self.lock().state
    }

    /// Returns the instant of the last state change.
    pub fn last_state_change(&self) -> Instant {
        self.lock().last_state_change
    }

    /// Returns a snapshot of the counters.
    pub fn stats(&self) -> BreakerStats {
        let now = self.clock.now();
        let mut inner = self.lock();
        let recent_failures = inner.window.recent_count(now);
        BreakerStats {
            name: self.name.clone(),
            state: inner.state.kind(),
            total_calls: inner.stats.total_calls,
            total_successes: inner.stats.total_successes,
            total_failures: inner.stats.total_failures,
            consecutive_successes: inner.stats.consecutive_successes,
            recent_failures,
            rejected_calls: inner.rejected_calls,
            times_opened: inner.times_opened,
            last_failure_at: inner.stats.last_failure_time,
            last_state_change_at: inner.last_state_change_at,
        }
    }

    /// Runs `operation` under the breaker.
    ///
    /// While open (and the reset timeout has not elapsed) the call is rejected
    /// with [`CerberError::CircuitOpen`] and `operation` is not invoked. Errors
    /// from `operation` are returned unchanged, including on the call that
    /// opens the circuit.
    pub async fn execute<F, Fut, T>(&self, operation: F) -> CerberResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = CerberResult<T>>,
    {
        self.acquire()?;

        match operation().await {
            Ok(value) => {
                self.on_success();
                Ok(value)
            }
            Err(error) => {
                self.on_failure(&error);
                Err(error)
            }
        }
    }

    /// Forces the circuit open, re-arming the reset timeout.
    pub fn force_open(&self) {
        let now = self.clock.now();
        let mut inner = self.lock();
        let next = transition(inner.state, BreakerEvent::ForcedOpen, &self.config, now);
        tracing::warn!(breaker = %self.name, "Circuit forced open");
        self.apply(&mut inner, next, now);
    }

    /// Forces the circuit closed.
    pub fn force_close(&self) {
        let now = self.clock.now();
        let mut inner = self.lock();
        let next = transition(inner.state, BreakerEvent::ForcedClosed, &self.config, now);
        tracing::info!(breaker = %self.name, "Circuit forced closed");
        self.apply(&mut inner, next, now);
    }

    /// Resets state, window and every counter.
    pub fn reset(&self) {
        let now = self.clock.now();
        let mut inner = self.lock();
        inner.state = BreakerState::Closed;
        inner.last_state_change = now;
        inner.last_state_change_at = Utc::now();
        inner.window.reset();
        inner.stats.reset();
        inner.rejected_calls = 0;
        inner.times_opened = 0;
    }

    fn lock(&self) -> MutexGuard<'_, BreakerInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Admits or rejects a call, moving OPEN to HALF_OPEN once the reset
    /// timeout has elapsed.
    fn acquire(&self) -> CerberResult<()> {
        let now = self.clock.now();
        let mut inner = self.lock();

        if let Err(remaining) = inner.state.admits(now) {
            inner.rejected_calls += 1;
            tracing::debug!(
                breaker = %self.name,
                retry_in_ms = remaining.as_millis() as u64,
                "Circuit open, rejecting call"
            );
            return Err(CerberError::circuit_open(&self.name, Some(remaining)));
        }

        let next = transition(inner.state, BreakerEvent::CallRequested, &self.config, now);
        self.apply(&mut inner, next, now);
        inner.stats.record_call();
        Ok(())
    }

    fn on_success(&self) {
        let now = self.clock.now();
        let mut inner = self.lock();
        let consecutive_successes = inner.stats.record_success();
        let next = transition(
            inner.state,
            BreakerEvent::Succeeded {
                consecutive_successes,
            },
            &self.config,
            now,
        );
        self.apply(&mut inner, next, now);
    }

    fn on_failure(&self, error: &CerberError) {
        let now = self.clock.now();
        let mut inner = self.lock();
        inner.window.record_failure(now);
        inner.stats.record_failure();
        let recent_failures = inner.window.recent_count(now);

        tracing::debug!(
            breaker = %self.name,
            recent_failures,
            error = %error,
            "Call failed under circuit breaker"
        );

        let next = transition(
            inner.state,
            BreakerEvent::Failed { recent_failures },
            &self.config,
            now,
        );
        self.apply(&mut inner, next, now);
    }

    fn apply(&self, inner: &mut BreakerInner, next: BreakerState, now: Instant) {
        let previous = inner.state.kind();
        inner.state = next;
        if previous == next.kind() {
            return;
        }

        inner.last_state_change = now;
        inner.last_state_change_at = Utc::now();

        match next {
            BreakerState::Open { .. } => {
                inner.times_opened += 1;
                let recent_failures = inner.window.recent_count(now);
                tracing::warn!(
                    breaker = %self.name,
                    from = %previous,
                    recent_failures,
                    times_opened = inner.times_opened,
                    reset_timeout_ms = self.config.reset_timeout.as_millis() as u64,
                    "Circuit opened"
                );
                crate::audit::emit_circuit_opened(
                    &self.name,
                    recent_failures,
                    inner.times_opened,
                    self.config.reset_timeout,
                );
            }
            BreakerState::HalfOpen => {
                tracing::info!(breaker = %self.name, "Circuit half-open, probing");
            }
            BreakerState::Closed => {
                inner.window.reset();
                inner.stats.reset();
                tracing::info!(breaker = %self.name, from = %previous, "Circuit closed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MockClock;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn breaker(clock: &MockClock) -> CircuitBreaker {
        let config = CircuitBreakerConfig::default()
            .with_failure_threshold(3)
            .with_failure_window(Duration::from_secs(10))
            .with_reset_timeout(Duration::from_millis(100))
            .with_success_threshold(2);
        CircuitBreaker::with_clock("actionlint", config, clock.shared())
    }

    async fn fail(breaker: &CircuitBreaker) -> CerberResult<()> {
        breaker
            .execute(|| async { Err(CerberError::adapter("actionlint", "exit status 2")) })
            .await
    }

    async fn succeed(breaker: &CircuitBreaker) -> CerberResult<u32> {
        breaker.execute(|| async { Ok(7) }).await
    }

    #[tokio::test]
    async fn test_passes_through_when_closed() {
        let clock = MockClock::new();
        let breaker = breaker(&clock);

        assert_eq!(succeed(&breaker).await.unwrap(), 7);
        assert!(breaker.state().is_closed());
        assert_eq!(breaker.stats().total_calls, 1);
        assert_eq!(breaker.stats().total_successes, 1);
    }

    #[tokio::test]
    async fn test_opens_on_threshold_and_rethrows_original_error() {
        let clock = MockClock::new();
        let breaker = breaker(&clock);

        for _ in 0..2 {
            let _ = fail(&breaker).await;
        }
        assert!(breaker.state().is_closed());

        // The triggering call still surfaces the adapter's own error.
        let err = fail(&breaker).await.unwrap_err();
        assert!(matches!(err, CerberError::Adapter { .. }));
        assert!(breaker.state().is_open());
        assert_eq!(breaker.stats().times_opened, 1);
    }

    #[tokio::test]
    async fn test_open_rejects_without_invoking() {
        let clock = MockClock::new();
        let breaker = breaker(&clock);
        for _ in 0..3 {
            let _ = fail(&breaker).await;
        }

        let calls = AtomicU32::new(0);
        let result = breaker
            .execute(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(CerberError::CircuitOpen { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(breaker.stats().rejected_calls, 1);
    }

    #[tokio::test]
    async fn test_half_open_after_reset_timeout_invokes_once() {
        let clock = MockClock::new();
        let breaker = breaker(&clock);
        for _ in 0..3 {
            let _ = fail(&breaker).await;
        }

        clock.advance_millis(100);

        let calls = AtomicU32::new(0);
        let result = breaker
            .execute(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;

        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(breaker.state().is_half_open());
    }

    #[tokio::test]
    async fn test_half_open_closes_after_success_threshold() {
        let clock = MockClock::new();
        let breaker = breaker(&clock);
        for _ in 0..3 {
            let _ = fail(&breaker).await;
        }
        clock.advance_millis(150);

        succeed(&breaker).await.unwrap();
        assert!(breaker.state().is_half_open());
        succeed(&breaker).await.unwrap();
        assert!(breaker.state().is_closed());

        let stats = breaker.stats();
        assert_eq!(stats.total_calls, 0);
        assert_eq!(stats.recent_failures, 0);
        assert_eq!(stats.times_opened, 1);
    }

    #[tokio::test]
    async fn test_half_open_failure_reopens() {
        let clock = MockClock::new();
        let breaker = breaker(&clock);
        for _ in 0..3 {
            let _ = fail(&breaker).await;
        }
        clock.advance_millis(100);

        let err = fail(&breaker).await.unwrap_err();
        assert!(matches!(err, CerberError::Adapter { .. }));
        assert!(breaker.state().is_open());
        assert_eq!(breaker.stats().times_opened, 2);
    }

    #[tokio::test]
    async fn test_failures_outside_window_do_not_open() {
        let clock = MockClock::new();
        let breaker = breaker(&clock);

        let _ = fail(&breaker).await;
        let _ = fail(&breaker).await;
        clock.advance(Duration::from_secs(11));
        let _ = fail(&breaker).await;

        assert!(breaker.state().is_closed());
        assert_eq!(breaker.stats().recent_failures, 1);
    }

    #[test]
    fn test_force_open_close() {
        let clock = MockClock::new();
        let breaker = breaker(&clock);

        breaker.force_open();
        assert!(breaker.state().is_open());
        assert_eq!(breaker.stats().times_opened, 1);

        breaker.force_close();
        assert!(breaker.state().is_closed());

        breaker.force_open();
        breaker.reset();
        assert!(breaker.state().is_closed());
        assert_eq!(breaker.stats().times_opened, 0);
    }
}
