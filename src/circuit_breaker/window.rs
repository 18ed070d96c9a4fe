//! Failure window and call counters owned by each breaker.

use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Sliding time-window failure counter.
///
/// Holds failure timestamps in arrival order; entries older than the window
/// are pruned whenever a failure is recorded or the count is read.
#[derive(Debug, Clone)]
pub struct FailureWindow {
    window: Duration,
    failures: VecDeque<Instant>,
}

impl FailureWindow {
    /// Creates an empty window of the given span.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            failures: VecDeque::new(),
        }
    }

    /// Records a failure at `now`.
    pub fn record_failure(&mut self, now: Instant) {
        self.failures.push_back(now);
        self.prune(now);
    }

    /// Returns the number of failures still inside the window at `now`.
    pub fn recent_count(&mut self, now: Instant) -> usize {
        self.prune(now);
        self.failures.len()
    }

    /// Forgets every recorded failure.
    pub fn reset(&mut self) {
        self.failures.clear();
    }

    /// Returns the window span.
    pub fn span(&self) -> Duration {
        self.window
    }

    fn prune(&mut self, now: Instant) {
        while let Some(oldest) = self.failures.front() {
            if now.saturating_duration_since(*oldest) >= self.window {
                self.failures.pop_front();
            } else {
                break;
            }
        }
    }
}

/// Call counters for one breaker.
///
/// Counters only grow, except that everything resets when the breaker closes
/// and `consecutive_successes` resets on every failure.
#[derive(Debug, Clone, Default)]
pub struct StatsTracker {
    /// Calls that reached the wrapped function.
    pub total_calls: u64,
    /// Successful calls.
    pub total_successes: u64,
    /// Failed calls.
    pub total_failures: u64,
    /// Successes since the last failure.
    pub consecutive_successes: u32,
    /// When the last failure happened.
    pub last_failure_time: Option<DateTime<Utc>>,
}

impl StatsTracker {
    /// Creates zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that a call is being made.
    pub fn record_call(&mut self) {
        self.total_calls += 1;
    }

    /// Records a success and returns the consecutive-success count.
    pub fn record_success(&mut self) -> u32 {
        self.total_successes += 1;
        self.consecutive_successes = self.consecutive_successes.saturating_add(1);
        self.consecutive_successes
    }

    /// Records a failure.
    pub fn record_failure(&mut self) {
        self.total_failures += 1;
        self.consecutive_successes = 0;
        self.last_failure_time = Some(Utc::now());
    }

    /// Resets every counter.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_prunes_old_failures() {
        let start = Instant::now();
        let mut window = FailureWindow::new(Duration::from_millis(100));

        window.record_failure(start);
        window.record_failure(start + Duration::from_millis(50));
        assert_eq!(window.recent_count(start + Duration::from_millis(60)), 2);

        // The first failure falls out of the window.
        assert_eq!(window.recent_count(start + Duration::from_millis(100)), 1);

        window.record_failure(start + Duration::from_millis(200));
        assert_eq!(window.recent_count(start + Duration::from_millis(200)), 1);
    }

    #[test]
    fn test_window_reset() {
        let now = Instant::now();
        let mut window = FailureWindow::new(Duration::from_secs(1));
        window.record_failure(now);
        window.reset();
        assert_eq!(window.recent_count(now), 0);
    }

    #[test]
    fn test_stats_tracker() {
        let mut stats = StatsTracker::new();
        stats.record_call();
        assert_eq!(stats.record_success(), 1);
        stats.record_call();
        assert_eq!(stats.record_success(), 2);
        stats.record_call();
        stats.record_failure();

        assert_eq!(stats.total_calls, 3);
        assert_eq!(stats.total_successes, 2);
        assert_eq!(stats.total_failures, 1);
        assert_eq!(stats.consecutive_successes, 0);
        assert!(stats.last_failure_time.is_some());

        stats.reset();
        assert_eq!(stats.total_calls, 0);
        assert!(stats.last_failure_time.is_none());
    }
}
