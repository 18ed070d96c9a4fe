//! Circuit breaker configuration.

use std::time::Duration;

/// Configuration for a circuit breaker.
#[derive(Debug, Clone, PartialEq)]
pub struct CircuitBreakerConfig {
    /// Number of failures inside `failure_window` that opens the circuit.
    pub failure_threshold: u32,

    /// Sliding window over which failures are counted.
    pub failure_window: Duration,

    /// How long the circuit stays open before admitting a probe.
    pub reset_timeout: Duration,

    /// Consecutive half-open successes required to close the circuit.
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            failure_window: Duration::from_secs(60),
            reset_timeout: Duration::from_secs(30),
            success_threshold: 2,
        }
    }
}

impl CircuitBreakerConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the failure threshold.
    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    /// Sets the failure window.
    pub fn with_failure_window(mut self, window: Duration) -> Self {
        self.failure_window = window;
        self
    }

    /// Sets the reset timeout.
    pub fn with_reset_timeout(mut self, timeout: Duration) -> Self {
        self.reset_timeout = timeout;
        self
    }

    /// Sets the success threshold.
    pub fn with_success_threshold(mut self, threshold: u32) -> Self {
        self.success_threshold = threshold;
        self
    }
}
