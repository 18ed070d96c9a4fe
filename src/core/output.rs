//! The aggregate report produced by the orchestrator.

use crate::core::types::{Severity, ToolMetadata, Violation};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Current report schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Violation counts by severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    /// Total number of violations.
    pub total: usize,
    /// Violations at `error` severity.
    pub errors: usize,
    /// Violations at `warning` severity.
    pub warnings: usize,
    /// Violations at `info` severity.
    pub info: usize,
}

impl Summary {
    /// Counts the given violations.
    pub fn from_violations(violations: &[Violation]) -> Self {
        violations
            .iter()
            .fold(Self::default(), |mut summary, violation| {
                summary.total += 1;
                match violation.severity {
                    Severity::Error => summary.errors += 1,
                    Severity::Warning => summary.warnings += 1,
                    Severity::Info => summary.info += 1,
                }
                summary
            })
    }
}

/// Deterministic report metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// One entry per adapter, in adapter order.
    pub tools: Vec<ToolMetadata>,
}

/// Per-run metadata. Varies between runs and is excluded from equality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunMetadata {
    /// Resilience profile used for the run.
    pub profile: String,
    /// When the report was generated.
    pub generated_at: DateTime<Utc>,
    /// Total wall time of the run.
    #[serde(with = "crate::core::duration_serde")]
    pub execution_time: Duration,
    /// Working directory of the run.
    pub cwd: PathBuf,
}

/// The aggregate report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CerberOutput {
    /// Report schema version, always [`SCHEMA_VERSION`].
    pub schema_version: u32,
    /// Marks the report as deterministic (ordering is stable).
    pub deterministic: bool,
    /// Counts by severity.
    pub summary: Summary,
    /// Deduplicated, sorted violations.
    pub violations: Vec<Violation>,
    /// Deterministic metadata.
    pub metadata: ReportMetadata,
    /// Non-deterministic run metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_metadata: Option<RunMetadata>,
}

impl CerberOutput {
    /// Creates a report. `violations` must already be aggregated.
    pub fn new(violations: Vec<Violation>, tools: Vec<ToolMetadata>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            deterministic: true,
            summary: Summary::from_violations(&violations),
            violations,
            metadata: ReportMetadata { tools },
            run_metadata: None,
        }
    }

    /// Attaches run metadata.
    pub fn with_run_metadata(mut self, run_metadata: RunMetadata) -> Self {
        self.run_metadata = Some(run_metadata);
        self
    }

    /// Compares two reports ignoring `run_metadata`.
    pub fn deterministic_eq(&self, other: &Self) -> bool {
        self.schema_version == other.schema_version
            && self.deterministic == other.deterministic
            && self.summary == other.summary
            && self.violations == other.violations
            && self.metadata == other.metadata
    }

    /// Serializes the report without `run_metadata`.
    pub fn to_deterministic_json(&self) -> serde_json::Result<String> {
        let mut stripped = self.clone();
        stripped.run_metadata = None;
        serde_json::to_string_pretty(&stripped)
    }

    /// Returns `true` if any tool was skipped.
    pub fn has_skipped_tools(&self) -> bool {
        self.metadata.tools.iter().any(|t| t.skipped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn violation(severity: Severity) -> Violation {
        Violation::new("rule", severity, "msg", "actionlint")
    }

    #[test]
    fn test_summary_counts() {
        let violations = vec![
            violation(Severity::Error),
            violation(Severity::Error),
            violation(Severity::Warning),
            violation(Severity::Info),
        ];
        let summary = Summary::from_violations(&violations);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.errors, 2);
        assert_eq!(summary.warnings, 1);
        assert_eq!(summary.info, 1);
    }

    #[test]
    fn test_deterministic_eq_ignores_run_metadata() {
        let a = CerberOutput::new(vec![violation(Severity::Error)], Vec::new());
        let b = a.clone().with_run_metadata(RunMetadata {
            profile: "default".into(),
            generated_at: Utc::now(),
            execution_time: Duration::from_millis(42),
            cwd: PathBuf::from("/repo"),
        });
        assert_ne!(a, b);
        assert!(a.deterministic_eq(&b));
        assert_eq!(
            a.to_deterministic_json().unwrap(),
            b.to_deterministic_json().unwrap()
        );
    }

    #[test]
    fn test_output_shape() {
        let output = CerberOutput::new(Vec::new(), Vec::new());
        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["schemaVersion"], 1);
        assert_eq!(json["deterministic"], true);
        assert_eq!(json["summary"]["total"], 0);
        assert!(json.get("runMetadata").is_none());
    }
}
