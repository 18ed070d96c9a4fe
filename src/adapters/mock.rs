//! Mock adapter for testing.
//!
//! This module provides a configurable mock adapter that can be used in
//! tests and demos to simulate analyzer outcomes without installing any
//! real tool.

use crate::core::{Adapter, AdapterOptions, AdapterResult, CerberError, Violation};

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

/// How a [`MockAdapter`] responds to `run`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MockBehavior {
    /// Returns the configured violations.
    #[default]
    Succeed,
    /// Fails as if the binary were missing.
    NotFound,
    /// Fails as if the binary were not executable.
    PermissionDenied,
    /// Fails as if the tool crashed.
    Crash,
    /// Fails with a connection reset every time.
    Transient,
    /// Fails with a connection reset for the first `n` runs, then succeeds.
    FailFirst(u32),
    /// Fails as if the tool's output were malformed.
    InvalidOutput,
    /// Never completes.
    Hang,
}

/// A mock adapter for testing purposes.
///
/// # Examples
///
/// ```rust
/// use cerber::adapters::{MockAdapter, MockBehavior};
/// use cerber::core::{Severity, Violation};
/// use std::time::Duration;
///
/// // An adapter that reports one violation after 10ms
/// let adapter = MockAdapter::new("actionlint")
///     .with_violation(Violation::new("syntax", Severity::Error, "bad key", "actionlint"))
///     .with_latency(Duration::from_millis(10));
///
/// // An adapter whose binary is missing
/// let missing = MockAdapter::new("zizmor").with_behavior(MockBehavior::NotFound);
/// ```
#[derive(Debug)]
pub struct MockAdapter {
    name: String,
    version: String,
    exit_code: i32,
    violations: Vec<Violation>,
    latency: Option<Duration>,
    behavior: MockBehavior,
    run_count: AtomicU32,
}

impl MockAdapter {
    /// Creates a mock adapter that succeeds with no violations.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: "0.0.0-mock".to_string(),
            exit_code: 0,
            violations: Vec::new(),
            latency: None,
            behavior: MockBehavior::Succeed,
            run_count: AtomicU32::new(0),
        }
    }

    /// Sets the reported tool version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Sets the exit code reported on success.
    pub fn with_exit_code(mut self, exit_code: i32) -> Self {
        self.exit_code = exit_code;
        self
    }

    /// Adds a violation to every successful run.
    pub fn with_violation(mut self, violation: Violation) -> Self {
        self.violations.push(violation);
        self
    }

    /// Replaces the violations reported on success.
    pub fn with_violations(mut self, violations: Vec<Violation>) -> Self {
        self.violations = violations;
        self
    }

    /// Sets the simulated latency of every run.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Sets how the adapter responds.
    pub fn with_behavior(mut self, behavior: MockBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    /// Returns the number of times `run` was called.
    pub fn run_count(&self) -> u32 {
        self.run_count.load(Ordering::SeqCst)
    }

    fn transient(&self) -> CerberError {
        CerberError::connection_failed(&self.name, "ECONNRESET: socket hang up")
    }
}

#[async_trait]
impl Adapter for MockAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, _options: &AdapterOptions) -> Result<AdapterResult, CerberError> {
        let previous_runs = self.run_count.fetch_add(1, Ordering::SeqCst);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        match self.behavior {
            MockBehavior::Succeed => {}
            MockBehavior::FailFirst(n) if previous_runs >= n => {}
            MockBehavior::FailFirst(_) | MockBehavior::Transient => return Err(self.transient()),
            MockBehavior::NotFound => {
                return Err(CerberError::tool_not_found(
                    &self.name,
                    "executable not found in PATH",
                ))
            }
            MockBehavior::PermissionDenied => {
                return Err(CerberError::permission_denied(
                    &self.name,
                    "EACCES: cannot execute binary",
                ))
            }
            MockBehavior::Crash => {
                return Err(CerberError::adapter(
                    &self.name,
                    "process terminated by signal SIGSEGV",
                ))
            }
            MockBehavior::InvalidOutput => {
                return Err(CerberError::validation(format!(
                    "{} produced unparseable output",
                    self.name
                )))
            }
            MockBehavior::Hang => std::future::pending::<()>().await,
        }

        Ok(AdapterResult::new(&self.name, &self.version, self.exit_code)
            .with_violations(self.violations.clone())
            .with_execution_time(self.latency.unwrap_or(Duration::from_millis(1))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Severity;

    fn options() -> AdapterOptions {
        AdapterOptions::new(".").with_file(".github/workflows/ci.yml")
    }

    #[tokio::test]
    async fn test_mock_adapter_success() {
        let adapter = MockAdapter::new("actionlint")
            .with_version("1.7.1")
            .with_exit_code(1)
            .with_violation(Violation::new(
                "syntax-check",
                Severity::Error,
                "unexpected key",
                "actionlint",
            ));

        let result = adapter.run(&options()).await.unwrap();
        assert_eq!(result.tool, "actionlint");
        assert_eq!(result.version, "1.7.1");
        assert_eq!(result.exit_code, 1);
        assert_eq!(result.violations.len(), 1);
        assert_eq!(adapter.run_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_adapter_failures() {
        let missing = MockAdapter::new("zizmor").with_behavior(MockBehavior::NotFound);
        assert!(matches!(
            missing.run(&options()).await,
            Err(CerberError::ToolNotFound { .. })
        ));

        let denied = MockAdapter::new("gitleaks").with_behavior(MockBehavior::PermissionDenied);
        assert!(matches!(
            denied.run(&options()).await,
            Err(CerberError::PermissionDenied { .. })
        ));

        let crashed = MockAdapter::new("actionlint").with_behavior(MockBehavior::Crash);
        assert!(matches!(
            crashed.run(&options()).await,
            Err(CerberError::Adapter { .. })
        ));
    }

    #[tokio::test]
    async fn test_mock_adapter_fail_first() {
        let adapter = MockAdapter::new("zizmor").with_behavior(MockBehavior::FailFirst(2));

        assert!(adapter.run(&options()).await.is_err());
        assert!(adapter.run(&options()).await.is_err());
        assert!(adapter.run(&options()).await.is_ok());
        assert_eq!(adapter.run_count(), 3);
    }
}
