//! Circuit breakers guarding adapter invocations.
//!
//! The circuit breaker pattern stops calling an adapter that keeps failing
//! and periodically probes it to detect recovery.
//!
//! ## States
//!
//! - **Closed**: Normal operation; calls pass through.
//! - **Open**: The adapter is failing; calls are rejected immediately.
//! - **Half-Open**: Probing the adapter to see if it has recovered.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cerber::circuit_breaker::{CircuitBreakerConfig, CircuitBreakerRegistry};
//! use std::time::Duration;
//!
//! let registry = CircuitBreakerRegistry::new();
//! let config = CircuitBreakerConfig::default()
//!     .with_failure_threshold(5)
//!     .with_reset_timeout(Duration::from_secs(30));
//!
//! let breaker = registry.get_or_create("actionlint", Some(config));
//! let result = breaker.execute(|| adapter.run(&options)).await;
//! ```

mod breaker;
mod config;
mod registry;
mod state;
mod window;

pub use breaker::{BreakerStats, CircuitBreaker};
pub use config::CircuitBreakerConfig;
pub use registry::{CircuitBreakerRegistry, CleanupTask, DEFAULT_TTL};
pub use state::{transition, BreakerEvent, BreakerState, CircuitState};
pub use window::{FailureWindow, StatsTracker};
