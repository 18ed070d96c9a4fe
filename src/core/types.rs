//! Core types used throughout the cerber library.
//!
//! This module defines violations, their severities, the options passed to
//! adapters and the per-adapter result shape every strategy produces.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Severity of a reported violation.
///
/// Ordering follows report order: errors first, then warnings, then info.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Must be fixed.
    Error,
    /// Should be fixed.
    Warning,
    /// Informational finding.
    Info,
}

impl Severity {
    /// Returns the sort rank (lower sorts first).
    pub fn rank(&self) -> u8 {
        match self {
            Self::Error => 0,
            Self::Warning => 1,
            Self::Info => 2,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// One issue reported by an adapter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    /// Rule identifier (e.g. `"expression-injection"`).
    pub id: String,

    /// Severity of the finding.
    pub severity: Severity,

    /// Human-readable message.
    pub message: String,

    /// Name of the adapter that reported it.
    pub source: String,

    /// Workflow file the finding refers to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// 1-based line number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,

    /// 1-based column number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,

    /// Suggested fix.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl Violation {
    /// Creates a new violation without a location.
    pub fn new(
        id: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            severity,
            message: message.into(),
            source: source.into(),
            path: None,
            line: None,
            column: None,
            hint: None,
        }
    }

    /// Sets the file path.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Sets the line and column.
    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }

    /// Sets the line only.
    pub fn with_line(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }

    /// Sets the hint.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// The identity used for deduplication: two violations with equal keys
    /// are the same finding even if their hints differ.
    pub fn dedup_key(&self) -> ViolationKey<'_> {
        ViolationKey {
            source: &self.source,
            id: &self.id,
            message: &self.message,
            path: self.path.as_deref(),
            line: self.line,
            column: self.column,
        }
    }
}

/// Borrowed deduplication key of a [`Violation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViolationKey<'a> {
    /// Reporting adapter.
    pub source: &'a str,
    /// Rule identifier.
    pub id: &'a str,
    /// Message text.
    pub message: &'a str,
    /// File path.
    pub path: Option<&'a str>,
    /// Line.
    pub line: Option<u32>,
    /// Column.
    pub column: Option<u32>,
}

/// Options handed to every adapter run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdapterOptions {
    /// Workflow files to analyze.
    pub files: Vec<PathBuf>,

    /// Working directory for the analyzer.
    pub cwd: PathBuf,

    /// Optional per-run deadline requested by the caller.
    #[serde(default, with = "crate::core::duration_serde::option")]
    pub timeout: Option<Duration>,
}

impl AdapterOptions {
    /// Creates options for the given working directory.
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            files: Vec::new(),
            cwd: cwd.into(),
            timeout: None,
        }
    }

    /// Adds a file.
    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.files.push(file.into());
        self
    }

    /// Sets the files.
    pub fn with_files<I, P>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.files = files.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the per-run timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// The result of running one adapter.
///
/// Failed adapters are represented as `skipped` results carrying the
/// classified exit code, so every adapter always has exactly one entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdapterResult {
    /// Tool name.
    pub tool: String,

    /// Tool version, `"unknown"` if it never ran.
    pub version: String,

    /// Process-style exit code.
    pub exit_code: i32,

    /// Reported violations.
    #[serde(default)]
    pub violations: Vec<Violation>,

    /// Wall time of the run.
    #[serde(with = "crate::core::duration_serde")]
    pub execution_time: Duration,

    /// Whether the tool was skipped (did not produce a usable result).
    #[serde(default)]
    pub skipped: bool,

    /// Why the tool was skipped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
}

/// Version reported for tools that never produced output.
pub const UNKNOWN_VERSION: &str = "unknown";

impl AdapterResult {
    /// Creates a successful result.
    pub fn new(tool: impl Into<String>, version: impl Into<String>, exit_code: i32) -> Self {
        Self {
            tool: tool.into(),
            version: version.into(),
            exit_code,
            violations: Vec::new(),
            execution_time: Duration::ZERO,
            skipped: false,
            skip_reason: None,
        }
    }

    /// Creates a skipped result for a tool that failed.
    pub fn skipped(
        tool: impl Into<String>,
        exit_code: i32,
        reason: impl Into<String>,
        execution_time: Duration,
    ) -> Self {
        Self {
            tool: tool.into(),
            version: UNKNOWN_VERSION.to_string(),
            exit_code,
            violations: Vec::new(),
            execution_time,
            skipped: true,
            skip_reason: Some(reason.into()),
        }
    }

    /// Sets the violations.
    pub fn with_violations(mut self, violations: Vec<Violation>) -> Self {
        self.violations = violations;
        self
    }

    /// Sets the execution time.
    pub fn with_execution_time(mut self, execution_time: Duration) -> Self {
        self.execution_time = execution_time;
        self
    }
}

/// Per-tool entry in the report metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolMetadata {
    /// Tool name.
    pub name: String,
    /// Tool version.
    pub version: String,
    /// Exit code of the run.
    pub exit_code: i32,
    /// Whether the tool was skipped.
    pub skipped: bool,
    /// Why the tool was skipped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
}

impl From<&AdapterResult> for ToolMetadata {
    fn from(result: &AdapterResult) -> Self {
        Self {
            name: result.tool.clone(),
            version: result.version.clone(),
            exit_code: result.exit_code,
            skipped: result.skipped,
            skip_reason: result.skip_reason.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_order() {
        assert!(Severity::Error < Severity::Warning);
        assert!(Severity::Warning < Severity::Info);
        assert_eq!(Severity::Info.rank(), 2);
        assert_eq!(Severity::Warning.to_string(), "warning");
    }

    #[test]
    fn test_dedup_key_ignores_hint() {
        let a = Violation::new("rule", Severity::Error, "msg", "actionlint")
            .with_path(".github/workflows/ci.yml")
            .at(3, 5)
            .with_hint("one");
        let b = a.clone().with_hint("two");
        assert_eq!(a.dedup_key(), b.dedup_key());

        let c = a.clone().at(4, 5);
        assert_ne!(a.dedup_key(), c.dedup_key());
    }

    #[test]
    fn test_violation_serializes_camel_case_without_empty_fields() {
        let v = Violation::new("secret", Severity::Warning, "leak", "gitleaks");
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["severity"], "warning");
        assert!(json.get("path").is_none());
        assert!(json.get("line").is_none());
    }

    #[test]
    fn test_skipped_result() {
        let result = AdapterResult::skipped("zizmor", 124, "timed out", Duration::from_millis(5));
        assert!(result.skipped);
        assert_eq!(result.version, UNKNOWN_VERSION);
        assert_eq!(result.skip_reason.as_deref(), Some("timed out"));

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["exitCode"], 124);
        assert_eq!(json["executionTime"], 5);
        assert_eq!(json["skipReason"], "timed out");
    }
}
