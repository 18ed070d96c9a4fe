//! Orchestration of adapter runs into a single report.
//!
//! The [`Orchestrator`] picks an execution strategy, runs every adapter and
//! hands the results to [`build_output`], which deduplicates, sorts and
//! counts the findings.

mod aggregate;
#[allow(clippy::module_inception)]
mod orchestrator;

pub use aggregate::{aggregate_violations, build_output, compare_violations};
pub use orchestrator::{Orchestrator, OrchestratorBuilder, OrchestratorConfig};
