//! Direct adapter execution without resilience wrappers.

use crate::audit;
use crate::classifier::ErrorClassifier;
use crate::core::{AdapterOptions, AdapterResult, ArcAdapter};
use crate::execution::{fan_out, invoke, ExecutionStrategy, StrategyKind};

use async_trait::async_trait;
use tokio::time::Instant;

/// Calls every adapter once and folds failures into skipped results.
#[derive(Debug, Clone, Default)]
pub struct LegacyExecutionStrategy {
    max_concurrency: Option<usize>,
}

impl LegacyExecutionStrategy {
    /// Creates the strategy with unbounded parallelism.
    pub fn new() -> Self {
        Self::default()
    }

    /// Caps how many adapters run at once in
    /// [`execute_parallel`](ExecutionStrategy::execute_parallel).
    pub fn with_max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = Some(limit);
        self
    }

    async fn run_one(&self, adapter: &ArcAdapter, options: &AdapterOptions) -> AdapterResult {
        let name = adapter.name();
        audit::emit_adapter_started(name, options, StrategyKind::Legacy.as_str());
        let started = Instant::now();

        match invoke(adapter.as_ref(), options).await {
            Ok(result) => {
                audit::emit_adapter_completed(&result);
                result
            }
            Err(error) => {
                let elapsed = started.elapsed();
                let classified = ErrorClassifier::classify(&error);
                tracing::warn!(
                    adapter = %name,
                    error_type = %classified.kind,
                    exit_code = classified.exit_code,
                    error = %error,
                    "Adapter failed, marking as skipped"
                );
                audit::emit_adapter_failed(name, &classified, elapsed);
                AdapterResult::skipped(name, classified.exit_code, classified.message, elapsed)
            }
        }
    }
}

#[async_trait]
impl ExecutionStrategy for LegacyExecutionStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Legacy
    }

    async fn execute_parallel(
        &self,
        adapters: &[ArcAdapter],
        options: &AdapterOptions,
    ) -> Vec<AdapterResult> {
        fan_out(adapters, self.max_concurrency, |adapter| {
            self.run_one(adapter, options)
        })
        .await
    }

    async fn execute_sequential(
        &self,
        adapters: &[ArcAdapter],
        options: &AdapterOptions,
    ) -> Vec<AdapterResult> {
        let mut results = Vec::with_capacity(adapters.len());
        for adapter in adapters {
            results.push(self.run_one(adapter, options).await);
        }
        results
    }
}
