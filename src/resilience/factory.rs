//! Named resilience profiles and validated configuration bundles.

use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
use crate::core::{CerberError, CerberResult};
use crate::resilience::retry::RetryConfig;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// A named set of resilience defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResilienceProfile {
    /// Balanced defaults.
    #[default]
    Default,
    /// Opens fast and gives up early.
    Aggressive,
    /// Tolerates more failures and waits longer.
    Conservative,
    /// Defaults supplied by the caller through
    /// [`ResilienceFactory::with_custom_profile`].
    Custom,
}

impl ResilienceProfile {
    /// Returns the profile name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Aggressive => "aggressive",
            Self::Conservative => "conservative",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for ResilienceProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResilienceProfile {
    type Err = CerberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" => Ok(Self::Default),
            "aggressive" => Ok(Self::Aggressive),
            "conservative" => Ok(Self::Conservative),
            "custom" => Ok(Self::Custom),
            other => Err(CerberError::invalid_config(
                "profile",
                format!("must be one of default, aggressive, conservative, custom (got '{other}')"),
            )),
        }
    }
}

/// Caller overrides applied on top of a profile.
///
/// Durations are in milliseconds. Values are signed so that out-of-range
/// input is rejected by validation instead of at parse time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResilienceOverrides {
    /// Profile to start from.
    pub profile: Option<ResilienceProfile>,
    /// Failures inside the window that open a breaker.
    pub failure_threshold: Option<i64>,
    /// Failure window in milliseconds.
    pub failure_window: Option<i64>,
    /// Breaker reset timeout in milliseconds.
    pub reset_timeout: Option<i64>,
    /// Half-open successes required to close a breaker.
    pub success_threshold: Option<i64>,
    /// Maximum retry attempts.
    pub max_attempts: Option<i64>,
    /// Initial retry delay in milliseconds.
    pub initial_delay: Option<i64>,
    /// Maximum retry delay in milliseconds.
    pub max_delay: Option<i64>,
    /// Backoff multiplier.
    pub backoff_multiplier: Option<f64>,
    /// Jitter fraction.
    pub jitter: Option<f64>,
    /// Per-adapter timeout in milliseconds.
    pub timeout: Option<i64>,
}

impl ResilienceOverrides {
    /// Creates empty overrides for the given profile.
    pub fn for_profile(profile: ResilienceProfile) -> Self {
        Self {
            profile: Some(profile),
            ..Self::default()
        }
    }
}

/// A validated bundle of breaker, retry and timeout settings.
#[derive(Debug, Clone)]
pub struct ResilienceConfig {
    /// Profile the bundle was built from.
    pub profile: ResilienceProfile,
    /// Breaker settings.
    pub circuit_breaker: CircuitBreakerConfig,
    /// Retry settings.
    pub retry: RetryConfig,
    /// Per-adapter timeout.
    pub timeout: Duration,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Settings::for_builtin(ResilienceProfile::Default)
            .build(ResilienceProfile::Default, RetryConfig::new())
    }
}

/// Flat, unvalidated settings in override units.
#[derive(Debug, Clone, Copy)]
struct Settings {
    failure_threshold: i64,
    failure_window: i64,
    reset_timeout: i64,
    success_threshold: i64,
    max_attempts: i64,
    initial_delay: i64,
    max_delay: i64,
    backoff_multiplier: f64,
    jitter: f64,
    timeout: i64,
}

impl Settings {
    fn for_builtin(profile: ResilienceProfile) -> Self {
        match profile {
            ResilienceProfile::Aggressive => Self {
                failure_threshold: 3,
                failure_window: 30_000,
                reset_timeout: 15_000,
                success_threshold: 1,
                max_attempts: 2,
                initial_delay: 500,
                max_delay: 5_000,
                backoff_multiplier: 2.0,
                jitter: 0.1,
                timeout: 15_000,
            },
            ResilienceProfile::Conservative => Self {
                failure_threshold: 10,
                failure_window: 120_000,
                reset_timeout: 60_000,
                success_threshold: 3,
                max_attempts: 5,
                initial_delay: 2_000,
                max_delay: 30_000,
                backoff_multiplier: 2.0,
                jitter: 0.2,
                timeout: 60_000,
            },
            ResilienceProfile::Default | ResilienceProfile::Custom => Self {
                failure_threshold: 5,
                failure_window: 60_000,
                reset_timeout: 30_000,
                success_threshold: 2,
                max_attempts: 3,
                initial_delay: 1_000,
                max_delay: 10_000,
                backoff_multiplier: 2.0,
                jitter: 0.1,
                timeout: 30_000,
            },
        }
    }

    fn from_config(config: &ResilienceConfig) -> Self {
        let millis = |d: Duration| i64::try_from(d.as_millis()).unwrap_or(i64::MAX);
        Self {
            failure_threshold: config.circuit_breaker.failure_threshold.into(),
            failure_window: millis(config.circuit_breaker.failure_window),
            reset_timeout: millis(config.circuit_breaker.reset_timeout),
            success_threshold: config.circuit_breaker.success_threshold.into(),
            max_attempts: config.retry.max_attempts.into(),
            initial_delay: millis(config.retry.initial_delay),
            max_delay: millis(config.retry.max_delay),
            backoff_multiplier: config.retry.backoff_multiplier,
            jitter: config.retry.jitter,
            timeout: millis(config.timeout),
        }
    }

    fn apply(&mut self, overrides: &ResilienceOverrides) {
        macro_rules! merge {
            ($($field:ident),*) => {
                $(if let Some(value) = overrides.$field {
                    self.$field = value;
                })*
            };
        }
        merge!(
            failure_threshold,
            failure_window,
            reset_timeout,
            success_threshold,
            max_attempts,
            initial_delay,
            max_delay,
            backoff_multiplier,
            jitter,
            timeout
        );
    }

    fn validate(&self) -> CerberResult<()> {
        positive("failureThreshold", self.failure_threshold)?;
        positive("failureWindow", self.failure_window)?;
        non_negative("resetTimeout", self.reset_timeout)?;
        positive("successThreshold", self.success_threshold)?;
        non_negative("maxAttempts", self.max_attempts)?;
        non_negative("initialDelay", self.initial_delay)?;
        non_negative("maxDelay", self.max_delay)?;
        positive("timeout", self.timeout)?;

        for (field, value) in [
            ("failureThreshold", self.failure_threshold),
            ("successThreshold", self.success_threshold),
            ("maxAttempts", self.max_attempts),
        ] {
            if value > i64::from(u32::MAX) {
                return Err(CerberError::invalid_config(field, "is too large"));
            }
        }

        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(CerberError::invalid_config(
                "backoffMultiplier",
                format!("must be at least 1 (got {})", self.backoff_multiplier),
            ));
        }
        if !(0.0..=1.0).contains(&self.jitter) {
            return Err(CerberError::invalid_config(
                "jitter",
                format!("must be between 0 and 1 (got {})", self.jitter),
            ));
        }
        if self.success_threshold > self.max_attempts {
            return Err(CerberError::invalid_config(
                "successThreshold",
                format!(
                    "({}) must not exceed maxAttempts ({})",
                    self.success_threshold, self.max_attempts
                ),
            ));
        }
        Ok(())
    }

    /// Converts validated settings. The numeric retry fields are written onto
    /// `retry`, so its predicate, callback and timeout flag are kept.
    fn build(&self, profile: ResilienceProfile, retry: RetryConfig) -> ResilienceConfig {
        let millis = |v: i64| Duration::from_millis(v.max(0).unsigned_abs());
        let count = |v: i64| u32::try_from(v.max(0)).unwrap_or(u32::MAX);

        ResilienceConfig {
            profile,
            circuit_breaker: CircuitBreakerConfig::new()
                .with_failure_threshold(count(self.failure_threshold))
                .with_failure_window(millis(self.failure_window))
                .with_reset_timeout(millis(self.reset_timeout))
                .with_success_threshold(count(self.success_threshold)),
            retry: retry
                .with_max_attempts(count(self.max_attempts))
                .with_initial_delay(millis(self.initial_delay))
                .with_max_delay(millis(self.max_delay))
                .with_backoff_multiplier(self.backoff_multiplier)
                .with_jitter(self.jitter),
            timeout: millis(self.timeout),
        }
    }
}

fn positive(field: &str, value: i64) -> CerberResult<()> {
    if value > 0 {
        Ok(())
    } else {
        Err(CerberError::invalid_config(
            field,
            format!("must be greater than 0 (got {value})"),
        ))
    }
}

fn non_negative(field: &str, value: i64) -> CerberResult<()> {
    if value >= 0 {
        Ok(())
    } else {
        Err(CerberError::invalid_config(
            field,
            format!("must not be negative (got {value})"),
        ))
    }
}

/// Builds validated [`ResilienceConfig`] bundles from profiles and overrides.
#[derive(Debug, Clone, Default)]
pub struct ResilienceFactory {
    custom: Option<ResilienceConfig>,
}

impl ResilienceFactory {
    /// Creates a factory with only the built-in profiles.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the defaults used by [`ResilienceProfile::Custom`].
    pub fn with_custom_profile(mut self, config: ResilienceConfig) -> Self {
        self.custom = Some(config);
        self
    }

    /// Merges the selected profile with `overrides` and validates the result.
    pub fn create_config(&self, overrides: &ResilienceOverrides) -> CerberResult<ResilienceConfig> {
        let profile = overrides.profile.unwrap_or_default();
        let (mut settings, retry) = match profile {
            ResilienceProfile::Custom => match &self.custom {
                Some(custom) => (Settings::from_config(custom), custom.retry.clone()),
                None => {
                    return Err(CerberError::invalid_config(
                        "profile",
                        "is 'custom' but no custom profile was registered",
                    ))
                }
            },
            builtin => (Settings::for_builtin(builtin), RetryConfig::new()),
        };

        settings.apply(overrides);
        settings.validate()?;

        let config = settings.build(profile, retry);
        tracing::debug!(
            profile = %profile,
            failure_threshold = config.circuit_breaker.failure_threshold,
            max_attempts = config.retry.max_attempts,
            timeout_ms = config.timeout.as_millis() as u64,
            "Built resilience config"
        );
        Ok(config)
    }

    /// Builds a breaker named `name` from the validated configuration.
    pub fn create_circuit_breaker(
        &self,
        name: &str,
        overrides: &ResilienceOverrides,
    ) -> CerberResult<CircuitBreaker> {
        let config = self.create_config(overrides)?;
        Ok(CircuitBreaker::new(name, config.circuit_breaker))
    }

    /// Returns the validated retry configuration.
    pub fn create_retry_config(&self, overrides: &ResilienceOverrides) -> CerberResult<RetryConfig> {
        Ok(self.create_config(overrides)?.retry)
    }

    /// Returns the validated per-adapter timeout.
    pub fn get_timeout(&self, overrides: &ResilienceOverrides) -> CerberResult<Duration> {
        Ok(self.create_config(overrides)?.timeout)
    }
}
