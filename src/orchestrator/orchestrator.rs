//! The orchestrator that runs adapters and builds the report.

use crate::audit;
use crate::circuit_breaker::CircuitBreakerRegistry;
use crate::core::{Adapter, AdapterOptions, ArcAdapter, CerberError, CerberOutput, RunMetadata};
use crate::execution::{
    ExecutionStrategy, LegacyExecutionStrategy, ResilientExecutionStrategy, StrategyKind,
};
use crate::orchestrator::aggregate::build_output;
use crate::resilience::{ResilienceConfig, ResilienceFactory, ResilienceOverrides};

use chrono::Utc;
use std::sync::Arc;
use tokio::time::Instant;

/// Configuration for the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Which execution strategy to use.
    pub strategy: StrategyKind,

    /// Whether adapters run concurrently.
    pub parallel: bool,

    /// Maximum number of adapters in flight when parallel.
    pub max_concurrency: Option<usize>,

    /// Resilience profile and overrides for the resilient strategy.
    pub resilience: ResilienceOverrides,

    /// Whether to attach run metadata to the report.
    pub include_run_metadata: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::Resilient,
            parallel: true,
            max_concurrency: None,
            resilience: ResilienceOverrides::default(),
            include_run_metadata: true,
        }
    }
}

impl OrchestratorConfig {
    /// Creates a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the execution strategy.
    pub fn with_strategy(mut self, strategy: StrategyKind) -> Self {
        self.strategy = strategy;
        self
    }

    /// Enables or disables parallel execution.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Caps the number of adapters in flight.
    pub fn with_max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = Some(limit);
        self
    }

    /// Sets the resilience overrides.
    pub fn with_resilience(mut self, overrides: ResilienceOverrides) -> Self {
        self.resilience = overrides;
        self
    }

    /// Enables or disables run metadata in the report.
    pub fn with_run_metadata(mut self, include: bool) -> Self {
        self.include_run_metadata = include;
        self
    }
}

/// Builder for creating an `Orchestrator`.
#[derive(Debug, Default)]
pub struct OrchestratorBuilder {
    adapters: Vec<ArcAdapter>,
    config: OrchestratorConfig,
    registry: Option<Arc<CircuitBreakerRegistry>>,
    factory: ResilienceFactory,
}

impl OrchestratorBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an adapter.
    pub fn add_adapter<A: Adapter + 'static>(mut self, adapter: A) -> Self {
        self.adapters.push(Arc::new(adapter));
        self
    }

    /// Adds an adapter wrapped in an Arc.
    pub fn add_arc_adapter(mut self, adapter: ArcAdapter) -> Self {
        self.adapters.push(adapter);
        self
    }

    /// Sets the configuration.
    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Shares an existing breaker registry instead of creating one.
    pub fn with_registry(mut self, registry: Arc<CircuitBreakerRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Sets the factory used to resolve resilience profiles.
    pub fn with_factory(mut self, factory: ResilienceFactory) -> Self {
        self.factory = factory;
        self
    }

    /// Builds the orchestrator, validating the resilience configuration.
    pub fn build(self) -> Result<Orchestrator, CerberError> {
        if self.adapters.is_empty() {
            return Err(CerberError::invalid_config(
                "adapters",
                "must contain at least one adapter",
            ));
        }

        let resilience = self.factory.create_config(&self.config.resilience)?;
        let registry = self.registry.unwrap_or_default();

        let strategy: Arc<dyn ExecutionStrategy> = match self.config.strategy {
            StrategyKind::Legacy => {
                let mut legacy = LegacyExecutionStrategy::new();
                if let Some(limit) = self.config.max_concurrency {
                    legacy = legacy.with_max_concurrency(limit);
                }
                Arc::new(legacy)
            }
            StrategyKind::Resilient => {
                let mut resilient =
                    ResilientExecutionStrategy::new(Arc::clone(&registry), resilience.clone());
                if let Some(limit) = self.config.max_concurrency {
                    resilient = resilient.with_max_concurrency(limit);
                }
                Arc::new(resilient)
            }
        };

        Ok(Orchestrator {
            adapters: self.adapters,
            strategy,
            registry,
            resilience,
            config: self.config,
        })
    }
}

/// Runs a fixed set of adapters and produces a deterministic report.
#[derive(Debug)]
pub struct Orchestrator {
    adapters: Vec<ArcAdapter>,
    strategy: Arc<dyn ExecutionStrategy>,
    registry: Arc<CircuitBreakerRegistry>,
    resilience: ResilienceConfig,
    config: OrchestratorConfig,
}

impl Orchestrator {
    /// Creates a new builder.
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::new()
    }

    /// Returns the adapters in execution order.
    pub fn adapters(&self) -> &[ArcAdapter] {
        &self.adapters
    }

    /// Returns the breaker registry.
    pub fn registry(&self) -> &Arc<CircuitBreakerRegistry> {
        &self.registry
    }

    /// Returns the validated resilience configuration.
    pub fn resilience(&self) -> &ResilienceConfig {
        &self.resilience
    }

    /// Returns the configuration.
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Runs every adapter and aggregates the findings.
    ///
    /// Adapter failures never fail the run: each adapter has exactly one
    /// entry in `metadata.tools`, skipped if it failed.
    pub async fn run(&self, options: &AdapterOptions) -> CerberOutput {
        let started = Instant::now();
        tracing::info!(
            adapters = self.adapters.len(),
            strategy = %self.strategy.kind(),
            parallel = self.config.parallel,
            files = options.files.len(),
            "Starting orchestration"
        );

        let results = if self.config.parallel {
            self.strategy.execute_parallel(&self.adapters, options).await
        } else {
            self.strategy
                .execute_sequential(&self.adapters, options)
                .await
        };

        let mut output = build_output(&results);
        if self.config.include_run_metadata {
            output = output.with_run_metadata(RunMetadata {
                profile: self.resilience.profile.to_string(),
                generated_at: Utc::now(),
                execution_time: started.elapsed(),
                cwd: options.cwd.clone(),
            });
        }

        tracing::info!(
            total = output.summary.total,
            errors = output.summary.errors,
            skipped = output.metadata.tools.iter().filter(|t| t.skipped).count(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Orchestration completed"
        );
        audit::emit_report_generated(&output);

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{MockAdapter, MockBehavior};
    use crate::core::{Severity, Violation};
    use crate::resilience::ResilienceProfile;
    use std::time::Duration;

    fn violation(id: &str, source: &str, line: u32) -> Violation {
        Violation::new(id, Severity::Warning, "pin actions to a full SHA", source)
            .with_path(".github/workflows/ci.yml")
            .at(line, 7)
    }

    #[test]
    fn test_builder_requires_adapters() {
        let err = Orchestrator::builder().build().unwrap_err();
        assert!(matches!(err, CerberError::InvalidConfig { .. }));
    }

    #[test]
    fn test_builder_validates_resilience() {
        let overrides = ResilienceOverrides {
            timeout: Some(0),
            ..Default::default()
        };
        let err = Orchestrator::builder()
            .add_adapter(MockAdapter::new("actionlint"))
            .with_config(OrchestratorConfig::new().with_resilience(overrides))
            .build()
            .unwrap_err();
        assert!(matches!(err, CerberError::InvalidConfig { field, .. } if field == "timeout"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_produces_report() {
        let orchestrator = Orchestrator::builder()
            .add_adapter(
                MockAdapter::new("actionlint")
                    .with_violation(violation("unpinned", "actionlint", 12))
                    .with_violation(violation("unpinned", "actionlint", 12))
                    .with_latency(Duration::from_millis(20)),
            )
            .add_adapter(MockAdapter::new("zizmor").with_behavior(MockBehavior::NotFound))
            .with_config(OrchestratorConfig::new().with_resilience(
                ResilienceOverrides::for_profile(ResilienceProfile::Aggressive),
            ))
            .build()
            .unwrap();

        let output = orchestrator.run(&AdapterOptions::new("/repo")).await;

        assert_eq!(output.violations.len(), 1);
        assert_eq!(output.summary.warnings, 1);
        assert_eq!(output.metadata.tools.len(), 2);
        assert!(output.metadata.tools[1].skipped);
        assert_eq!(output.metadata.tools[1].exit_code, 127);

        let run = output.run_metadata.as_ref().unwrap();
        assert_eq!(run.profile, "aggressive");
        assert_eq!(run.cwd, std::path::PathBuf::from("/repo"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_strategies_agree_on_report() {
        let build = |strategy: StrategyKind, parallel: bool| {
            Orchestrator::builder()
                .add_adapter(
                    MockAdapter::new("actionlint").with_violation(violation("a", "actionlint", 3)),
                )
                .add_adapter(MockAdapter::new("gitleaks").with_violation(violation("b", "gitleaks", 1)))
                .with_config(
                    OrchestratorConfig::new()
                        .with_strategy(strategy)
                        .with_parallel(parallel),
                )
                .build()
                .unwrap()
        };

        let options = AdapterOptions::new(".");
        let legacy = build(StrategyKind::Legacy, true).run(&options).await;
        let resilient = build(StrategyKind::Resilient, false).run(&options).await;

        assert!(legacy.deterministic_eq(&resilient));
        assert_eq!(
            legacy.to_deterministic_json().unwrap(),
            resilient.to_deterministic_json().unwrap()
        );
    }

    #[tokio::test]
    async fn test_shared_registry_is_used() {
        let registry = Arc::new(CircuitBreakerRegistry::new());
        let orchestrator = Orchestrator::builder()
            .add_adapter(MockAdapter::new("actionlint"))
            .with_registry(Arc::clone(&registry))
            .with_config(OrchestratorConfig::new().with_run_metadata(false))
            .build()
            .unwrap();

        let output = orchestrator.run(&AdapterOptions::new(".")).await;
        assert!(output.run_metadata.is_none());
        assert!(registry.get("actionlint").is_some());
    }
}
