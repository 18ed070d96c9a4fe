//! Structured audit logging for CI runs.
//!
//! Events are emitted through `tracing` on the `cerber::audit` target, so any
//! subscriber (JSON file, OpenTelemetry, etc.) can capture a per-run record of
//! which adapters ran, which failed, and when circuits opened.

mod events;

pub use events::{
    emit_adapter_completed, emit_adapter_failed, emit_adapter_started, emit_circuit_opened,
    emit_report_generated, AdapterAuditEvent, AuditEvent,
};
