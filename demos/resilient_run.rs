//! Resilient run example demonstrating the full execution pipeline.
//!
//! This example shows how to:
//! - Register adapters with an orchestrator
//! - Pick a resilience profile
//! - Observe a flaky adapter recover through retries
//! - See a missing tool reported as a skipped entry
//! - Inspect circuit breaker stats after the run
//!
//! Run with: cargo run --example resilient_run

use cerber::adapters::{MockAdapter, MockBehavior};
use cerber::prelude::*;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing; audit events go to the `cerber::audit` target
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,cerber=debug".into()),
        )
        .init();

    println!("=== Cerber Resilient Run Example ===\n");

    let actionlint = MockAdapter::new("actionlint")
        .with_version("1.7.1")
        .with_exit_code(1)
        .with_latency(Duration::from_millis(40))
        .with_violation(
            Violation::new(
                "expression",
                Severity::Error,
                "property \"ref_nme\" is not defined in object type",
                "actionlint",
            )
            .with_path(".github/workflows/ci.yml")
            .at(18, 24),
        );

    // Fails once with a connection reset, then succeeds
    let zizmor = MockAdapter::new("zizmor")
        .with_version("1.2.0")
        .with_behavior(MockBehavior::FailFirst(1))
        .with_violation(
            Violation::new(
                "unpinned-uses",
                Severity::Warning,
                "action is not pinned to a hash",
                "zizmor",
            )
            .with_path(".github/workflows/ci.yml")
            .at(12, 9)
            .with_hint("pin actions/checkout to a full commit SHA"),
        );

    // Not installed on this machine
    let gitleaks = MockAdapter::new("gitleaks").with_behavior(MockBehavior::NotFound);

    let registry = Arc::new(CircuitBreakerRegistry::new());
    let overrides = ResilienceOverrides {
        initial_delay: Some(100),
        ..ResilienceOverrides::for_profile(ResilienceProfile::Aggressive)
    };

    let orchestrator = Orchestrator::builder()
        .add_adapter(actionlint)
        .add_adapter(zizmor)
        .add_adapter(gitleaks)
        .with_registry(Arc::clone(&registry))
        .with_config(OrchestratorConfig::new().with_resilience(overrides))
        .build()?;

    let resilience = orchestrator.resilience();
    println!("Resilience profile: {}", resilience.profile);
    println!("  Failure threshold: {}", resilience.circuit_breaker.failure_threshold);
    println!("  Max attempts: {}", resilience.retry.max_attempts);
    println!("  Timeout: {:?}", resilience.timeout);
    println!();

    let options = AdapterOptions::new(".")
        .with_file(".github/workflows/ci.yml")
        .with_file(".github/workflows/release.yml");

    let report = orchestrator.run(&options).await;

    println!("\n=== Report ===");
    println!(
        "Summary: {} total, {} errors, {} warnings, {} info",
        report.summary.total, report.summary.errors, report.summary.warnings, report.summary.info
    );
    for tool in &report.metadata.tools {
        match &tool.skip_reason {
            Some(reason) => println!("  {} skipped (exit {}): {}", tool.name, tool.exit_code, reason),
            None => println!("  {} {} (exit {})", tool.name, tool.version, tool.exit_code),
        }
    }

    println!("\n=== Circuit Breakers ===");
    for stats in registry.all_stats() {
        println!(
            "  {}: {} ({} calls, {} failures, opened {} times)",
            stats.name, stats.state, stats.total_calls, stats.total_failures, stats.times_opened
        );
    }

    println!("\n=== Deterministic JSON ===");
    println!("{}", report.to_deterministic_json()?);

    Ok(())
}
