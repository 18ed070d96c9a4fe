//! Audit event types and emission functions.

use crate::classifier::ClassifiedError;
use crate::core::{AdapterOptions, AdapterResult, CerberOutput};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Base trait for audit events.
pub trait AuditEvent: Serialize {
    /// Returns the event type name.
    fn event_type(&self) -> &'static str;

    /// Returns the timestamp of the event.
    fn timestamp(&self) -> DateTime<Utc>;
}

/// Audit record for one finished adapter invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterAuditEvent {
    /// Timestamp of the event.
    pub timestamp: DateTime<Utc>,

    /// Adapter name.
    pub adapter: String,

    /// Adapter version, if it completed.
    pub version: Option<String>,

    /// Exit code reported or synthesized for the adapter.
    pub exit_code: i32,

    /// Number of violations reported.
    pub violation_count: usize,

    /// Wall time in milliseconds.
    pub duration_ms: u64,

    /// Whether the adapter was skipped.
    pub skipped: bool,

    /// Classified error type, if the adapter failed.
    pub error_type: Option<String>,

    /// Failure message or skip reason.
    pub reason: Option<String>,
}

impl AdapterAuditEvent {
    /// Builds an event from a completed adapter result.
    pub fn completed(result: &AdapterResult) -> Self {
        Self {
            timestamp: Utc::now(),
            adapter: result.tool.clone(),
            version: Some(result.version.clone()),
            exit_code: result.exit_code,
            violation_count: result.violations.len(),
            duration_ms: result.execution_time.as_millis() as u64,
            skipped: result.skipped,
            error_type: None,
            reason: result.skip_reason.clone(),
        }
    }

    /// Builds an event from a classified adapter failure.
    pub fn failed(adapter: &str, error: &ClassifiedError, duration: Duration) -> Self {
        Self {
            timestamp: Utc::now(),
            adapter: adapter.to_string(),
            version: None,
            exit_code: error.exit_code,
            violation_count: 0,
            duration_ms: duration.as_millis() as u64,
            skipped: true,
            error_type: Some(error.kind.to_string()),
            reason: Some(error.message.clone()),
        }
    }
}

impl AuditEvent for AdapterAuditEvent {
    fn event_type(&self) -> &'static str {
        if self.error_type.is_some() {
            "adapter_failed"
        } else {
            "adapter_completed"
        }
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Emits an audit event for an adapter starting.
pub fn emit_adapter_started(adapter: &str, options: &AdapterOptions, strategy: &str) {
    tracing::info!(
        target: "cerber::audit",
        event_type = "adapter_started",
        adapter = %adapter,
        strategy = %strategy,
        file_count = options.files.len(),
        cwd = %options.cwd.display(),
        timeout_ms = ?options.timeout.map(|t| t.as_millis() as u64),
        "Adapter started"
    );
}

/// Emits an audit event for a completed adapter.
pub fn emit_adapter_completed(result: &AdapterResult) {
    let event = AdapterAuditEvent::completed(result);
    tracing::info!(
        target: "cerber::audit",
        event_type = event.event_type(),
        adapter = %event.adapter,
        version = ?event.version,
        exit_code = event.exit_code,
        violation_count = event.violation_count,
        duration_ms = event.duration_ms,
        skipped = event.skipped,
        reason = ?event.reason,
        "Adapter completed"
    );
}

/// Emits an audit event for an adapter failure.
pub fn emit_adapter_failed(adapter: &str, error: &ClassifiedError, duration: Duration) {
    let event = AdapterAuditEvent::failed(adapter, error, duration);
    tracing::info!(
        target: "cerber::audit",
        event_type = event.event_type(),
        adapter = %event.adapter,
        error_type = ?event.error_type,
        exit_code = event.exit_code,
        attempts = ?error.attempts,
        duration_ms = event.duration_ms,
        reason = ?event.reason,
        "Adapter failed"
    );
}

/// Emits an audit event for a circuit opening.
pub fn emit_circuit_opened(
    breaker: &str,
    recent_failures: usize,
    times_opened: u64,
    reset_timeout: Duration,
) {
    tracing::info!(
        target: "cerber::audit",
        event_type = "circuit_opened",
        breaker = %breaker,
        recent_failures,
        times_opened,
        reset_timeout_ms = reset_timeout.as_millis() as u64,
        "Circuit opened"
    );
}

/// Emits an audit event for a generated report.
pub fn emit_report_generated(output: &CerberOutput) {
    let tools: Vec<&str> = output
        .metadata
        .tools
        .iter()
        .map(|t| t.name.as_str())
        .collect();
    let skipped = output.metadata.tools.iter().filter(|t| t.skipped).count();

    tracing::info!(
        target: "cerber::audit",
        event_type = "report_generated",
        total = output.summary.total,
        errors = output.summary.errors,
        warnings = output.summary.warnings,
        info = output.summary.info,
        tools = ?tools,
        skipped_tools = skipped,
        profile = ?output.run_metadata.as_ref().map(|m| m.profile.as_str()),
        "Report generated"
    );
}
