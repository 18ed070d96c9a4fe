//! Retry, timeout and profile configuration for adapter invocations.
//!
//! - [`retry`] repeats a failing operation with exponential backoff and
//!   jitter.
//! - [`with_timeout`] and friends bound how long the caller waits.
//! - [`ResilienceFactory`] turns a named profile plus overrides into a
//!   validated [`ResilienceConfig`].

mod factory;
mod retry;
mod timeout;

pub use factory::{ResilienceConfig, ResilienceFactory, ResilienceOverrides, ResilienceProfile};
pub use retry::{
    calculate_delay, retry, retry_with_stats, retry_with_timeout, RetryCallback, RetryConfig,
    RetryOutcome, RetryPredicate,
};
pub use timeout::{
    with_global_and_step_timeouts, with_timeout, with_timeouts, Step, TimedOperation,
    TimeoutManager,
};
