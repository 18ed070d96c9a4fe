//! Conversion from resilient results back to the per-adapter result shape.

use crate::classifier::ClassifiedError;
use crate::core::AdapterResult;

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Either the adapter's result or the classified reason it failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "lowercase")]
pub enum AdapterOutcome {
    /// The adapter produced a result.
    Success(AdapterResult),
    /// The adapter failed after breaker, retry and timeout handling.
    Failure(ClassifiedError),
}

/// The outcome of one resilient adapter invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResilientAdapterResult {
    /// Adapter name.
    pub adapter: String,
    /// Result or classified failure.
    pub outcome: AdapterOutcome,
    /// Total wall time including retries.
    #[serde(with = "crate::core::duration_serde")]
    pub duration: Duration,
}

impl ResilientAdapterResult {
    /// Creates a successful result.
    pub fn success(adapter: impl Into<String>, result: AdapterResult, duration: Duration) -> Self {
        Self {
            adapter: adapter.into(),
            outcome: AdapterOutcome::Success(result),
            duration,
        }
    }

    /// Creates a failed result.
    pub fn failure(adapter: impl Into<String>, error: ClassifiedError, duration: Duration) -> Self {
        Self {
            adapter: adapter.into(),
            outcome: AdapterOutcome::Failure(error),
            duration,
        }
    }

    /// Returns `true` if the adapter produced a result.
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, AdapterOutcome::Success(_))
    }

    /// Returns the adapter result, if any.
    pub fn result(&self) -> Option<&AdapterResult> {
        match &self.outcome {
            AdapterOutcome::Success(result) => Some(result),
            AdapterOutcome::Failure(_) => None,
        }
    }

    /// Returns the classified error, if any.
    pub fn error(&self) -> Option<&ClassifiedError> {
        match &self.outcome {
            AdapterOutcome::Success(_) => None,
            AdapterOutcome::Failure(error) => Some(error),
        }
    }
}

/// Translates [`ResilientAdapterResult`]s into [`AdapterResult`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultConverter;

impl ResultConverter {
    /// Converts one result.
    ///
    /// A failure becomes a skipped result whose exit code comes from the
    /// error kind and whose skip reason is the error message.
    pub fn convert(result: &ResilientAdapterResult) -> AdapterResult {
        match &result.outcome {
            AdapterOutcome::Success(inner) => inner.clone(),
            AdapterOutcome::Failure(error) => AdapterResult::skipped(
                &result.adapter,
                error.kind.exit_code(),
                &error.message,
                result.duration,
            ),
        }
    }

    /// Converts results, preserving order.
    pub fn convert_all(results: &[ResilientAdapterResult]) -> Vec<AdapterResult> {
        results.iter().map(Self::convert).collect()
    }
}

/// Success and failure counts over a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionStats {
    /// Adapters that produced a result.
    pub successful_adapters: usize,
    /// Adapters that failed.
    pub failed_adapters: usize,
    /// Successful share as a whole percentage.
    pub success_rate: u32,
}

/// Computes [`ExecutionStats`] and outcome predicates.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatsComputer;

impl StatsComputer {
    /// Counts successes and failures. The rate is 0 for an empty batch.
    pub fn compute(results: &[ResilientAdapterResult]) -> ExecutionStats {
        let successful_adapters = results.iter().filter(|r| r.is_success()).count();
        let failed_adapters = results.len() - successful_adapters;
        let success_rate = if results.is_empty() {
            0
        } else {
            (successful_adapters as f64 * 100.0 / results.len() as f64).round() as u32
        };

        ExecutionStats {
            successful_adapters,
            failed_adapters,
            success_rate,
        }
    }

    /// Returns `true` if the batch is non-empty and every adapter succeeded.
    pub fn is_complete_success(results: &[ResilientAdapterResult]) -> bool {
        !results.is_empty() && results.iter().all(|r| r.is_success())
    }

    /// Returns `true` if the batch is non-empty and every adapter failed.
    pub fn is_complete_failure(results: &[ResilientAdapterResult]) -> bool {
        !results.is_empty() && results.iter().all(|r| !r.is_success())
    }

    /// Returns `true` if the batch has both successes and failures.
    pub fn is_partial_success(results: &[ResilientAdapterResult]) -> bool {
        results.iter().any(|r| r.is_success()) && results.iter().any(|r| !r.is_success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ErrorKind;

    fn ok(name: &str) -> ResilientAdapterResult {
        ResilientAdapterResult::success(
            name,
            AdapterResult::new(name, "1.0.0", 0),
            Duration::from_millis(10),
        )
    }

    fn failed(name: &str, kind: ErrorKind) -> ResilientAdapterResult {
        ResilientAdapterResult::failure(
            name,
            ClassifiedError::new(kind, format!("{name} failed")),
            Duration::from_millis(20),
        )
    }

    #[test]
    fn test_convert_success_copies_result() {
        let result = ok("actionlint");
        let converted = ResultConverter::convert(&result);
        assert_eq!(Some(&converted), result.result());
        assert!(!converted.skipped);
    }

    #[test]
    fn test_convert_failure_exit_codes() {
        let table = [
            (ErrorKind::CircuitBreakerOpen, 129),
            (ErrorKind::Timeout, 124),
            (ErrorKind::NotFound, 127),
            (ErrorKind::Permission, 126),
            (ErrorKind::RetriesExhausted, 130),
            (ErrorKind::Crash, 3),
            (ErrorKind::Validation, 1),
            (ErrorKind::Unknown, 1),
        ];

        for (kind, exit_code) in table {
            let converted = ResultConverter::convert(&failed("zizmor", kind));
            assert_eq!(converted.exit_code, exit_code, "{kind}");
            assert!(converted.skipped);
            assert_eq!(converted.skip_reason.as_deref(), Some("zizmor failed"));
            assert_eq!(converted.tool, "zizmor");
            assert_eq!(converted.execution_time, Duration::from_millis(20));
        }
    }

    #[test]
    fn test_convert_all_preserves_order() {
        let results = vec![ok("a"), failed("b", ErrorKind::Timeout), ok("c")];
        let tools: Vec<String> = ResultConverter::convert_all(&results)
            .into_iter()
            .map(|r| r.tool)
            .collect();
        assert_eq!(tools, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_stats() {
        let results = vec![ok("a"), failed("b", ErrorKind::Crash), ok("c")];
        let stats = StatsComputer::compute(&results);
        assert_eq!(stats.successful_adapters, 2);
        assert_eq!(stats.failed_adapters, 1);
        assert_eq!(stats.success_rate, 67);

        assert!(StatsComputer::is_partial_success(&results));
        assert!(!StatsComputer::is_complete_success(&results));
        assert!(!StatsComputer::is_complete_failure(&results));
    }

    #[test]
    fn test_stats_predicates_edge_cases() {
        assert_eq!(StatsComputer::compute(&[]), ExecutionStats::default());
        assert!(!StatsComputer::is_complete_success(&[]));
        assert!(!StatsComputer::is_complete_failure(&[]));
        assert!(!StatsComputer::is_partial_success(&[]));

        let all_ok = vec![ok("a"), ok("b")];
        assert!(StatsComputer::is_complete_success(&all_ok));
        assert_eq!(StatsComputer::compute(&all_ok).success_rate, 100);

        let all_failed = vec![failed("a", ErrorKind::Timeout)];
        assert!(StatsComputer::is_complete_failure(&all_failed));
        assert_eq!(StatsComputer::compute(&all_failed).success_rate, 0);
    }

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_value(failed("gitleaks", ErrorKind::Timeout)).unwrap();
        assert_eq!(json["adapter"], "gitleaks");
        assert_eq!(json["outcome"]["status"], "failure");
        assert_eq!(json["outcome"]["value"]["type"], "timeout");
        assert_eq!(json["duration"], 20);
    }
}
