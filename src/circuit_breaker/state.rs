//! Circuit breaker state machine.
//!
//! The state is a tagged union carrying only the data each state needs, and
//! every change goes through the pure [`transition`] function.

use crate::circuit_breaker::config::CircuitBreakerConfig;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

/// The current state of a circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    /// Calls pass through; failures are counted in the window.
    Closed,

    /// Calls are rejected until `retry_at`.
    Open {
        /// When the circuit opened.
        opened_at: Instant,
        /// When the next call will be admitted as a probe.
        retry_at: Instant,
    },

    /// Probing; successes count toward closing, any failure reopens.
    HalfOpen,
}

impl BreakerState {
    /// Creates the open state starting at `now`.
    pub fn open_at(now: Instant, config: &CircuitBreakerConfig) -> Self {
        Self::Open {
            opened_at: now,
            retry_at: now + config.reset_timeout,
        }
    }

    /// Returns `true` if the circuit is closed.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }

    /// Returns `true` if the circuit is open.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open { .. })
    }

    /// Returns `true` if the circuit is half-open.
    pub fn is_half_open(&self) -> bool {
        matches!(self, Self::HalfOpen)
    }

    /// Returns the data-free view of this state.
    pub fn kind(&self) -> CircuitState {
        match self {
            Self::Closed => CircuitState::Closed,
            Self::Open { .. } => CircuitState::Open,
            Self::HalfOpen => CircuitState::HalfOpen,
        }
    }

    /// Checks whether a call may proceed at `now`.
    ///
    /// Returns the remaining wait when the circuit is open and its reset
    /// timeout has not yet elapsed.
    pub fn admits(&self, now: Instant) -> Result<(), Duration> {
        match self {
            Self::Open { retry_at, .. } if now < *retry_at => Err(*retry_at - now),
            _ => Ok(()),
        }
    }
}

impl Default for BreakerState {
    fn default() -> Self {
        Self::Closed
    }
}

/// State names without state data, for stats and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    /// Closed.
    Closed,
    /// Open.
    Open,
    /// Half-open.
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "CLOSED"),
            Self::Open => write!(f, "OPEN"),
            Self::HalfOpen => write!(f, "HALF_OPEN"),
        }
    }
}

/// Inputs to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerEvent {
    /// A call is about to be attempted.
    CallRequested,
    /// A call succeeded; carries the updated consecutive-success count.
    Succeeded {
        /// Consecutive successes including this one.
        consecutive_successes: u32,
    },
    /// A call failed; carries the failure count inside the window.
    Failed {
        /// Failures inside the window including this one.
        recent_failures: usize,
    },
    /// Operator override to open.
    ForcedOpen,
    /// Operator override to close.
    ForcedClosed,
}

/// Computes the next state.
///
/// Legal transitions are CLOSED→OPEN (threshold reached inside the window),
/// OPEN→HALF_OPEN (reset timeout elapsed), HALF_OPEN→CLOSED (success threshold
/// reached) and HALF_OPEN→OPEN (any failure), plus the forced overrides.
pub fn transition(
    state: BreakerState,
    event: BreakerEvent,
    config: &CircuitBreakerConfig,
    now: Instant,
) -> BreakerState {
    use BreakerEvent::*;
    use BreakerState::*;

    match (state, event) {
        (Open { retry_at, .. }, CallRequested) if now >= retry_at => HalfOpen,

        (
            HalfOpen,
            Succeeded {
                consecutive_successes,
            },
        ) if consecutive_successes >= config.success_threshold => Closed,

        (Closed, Failed { recent_failures })
            if recent_failures >= config.failure_threshold as usize =>
        {
            BreakerState::open_at(now, config)
        }
        (HalfOpen, Failed { .. }) => BreakerState::open_at(now, config),

        (_, ForcedOpen) => BreakerState::open_at(now, config),
        (_, ForcedClosed) => Closed,

        (state, _) => state,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> CircuitBreakerConfig {
        CircuitBreakerConfig::default()
            .with_failure_threshold(3)
            .with_success_threshold(2)
            .with_reset_timeout(Duration::from_millis(100))
    }

    #[test]
    fn test_closed_opens_at_threshold() {
        let now = Instant::now();
        let cfg = config();

        let state = transition(
            BreakerState::Closed,
            BreakerEvent::Failed { recent_failures: 2 },
            &cfg,
            now,
        );
        assert!(state.is_closed());

        let state = transition(state, BreakerEvent::Failed { recent_failures: 3 }, &cfg, now);
        assert!(state.is_open());
        assert_eq!(state.admits(now), Err(Duration::from_millis(100)));
    }

    #[test]
    fn test_open_moves_to_half_open_after_reset_timeout() {
        let now = Instant::now();
        let cfg = config();
        let open = BreakerState::open_at(now, &cfg);

        let early = now + Duration::from_millis(50);
        assert!(transition(open, BreakerEvent::CallRequested, &cfg, early).is_open());

        let late = now + Duration::from_millis(100);
        assert!(open.admits(late).is_ok());
        assert!(transition(open, BreakerEvent::CallRequested, &cfg, late).is_half_open());
    }

    #[test]
    fn test_half_open_closes_or_reopens() {
        let now = Instant::now();
        let cfg = config();

        let state = transition(
            BreakerState::HalfOpen,
            BreakerEvent::Succeeded {
                consecutive_successes: 1,
            },
            &cfg,
            now,
        );
        assert!(state.is_half_open());

        let state = transition(
            state,
            BreakerEvent::Succeeded {
                consecutive_successes: 2,
            },
            &cfg,
            now,
        );
        assert!(state.is_closed());

        let state = transition(
            BreakerState::HalfOpen,
            BreakerEvent::Failed { recent_failures: 1 },
            &cfg,
            now,
        );
        assert!(state.is_open());
    }

    #[test]
    fn test_success_never_closes_from_closed_or_open() {
        let now = Instant::now();
        let cfg = config();
        let open = BreakerState::open_at(now, &cfg);
        let event = BreakerEvent::Succeeded {
            consecutive_successes: 10,
        };
        assert_eq!(transition(open, event, &cfg, now), open);
        assert!(transition(BreakerState::Closed, event, &cfg, now).is_closed());
    }

    #[test]
    fn test_state_names() {
        assert_eq!(BreakerState::Closed.kind().to_string(), "CLOSED");
        assert_eq!(BreakerState::HalfOpen.kind().to_string(), "HALF_OPEN");
        assert_eq!(
            serde_json::to_string(&CircuitState::HalfOpen).unwrap(),
            "\"HALF_OPEN\""
        );
    }
}
