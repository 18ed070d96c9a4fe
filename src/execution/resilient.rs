//! Adapter execution through circuit breaker, retry and timeout.

use crate::audit;
use crate::circuit_breaker::CircuitBreakerRegistry;
use crate::classifier::{ClassificationContext, ErrorClassifier};
use crate::core::{AdapterOptions, AdapterResult, ArcAdapter, CerberError};
use crate::execution::converter::{ResilientAdapterResult, ResultConverter};
use crate::execution::{fan_out, invoke, ExecutionStrategy, StrategyKind};
use crate::resilience::{retry_with_stats, with_timeout, ResilienceConfig, RetryConfig};

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::time::Instant;

/// Runs each adapter as `breaker(retry(timeout(adapter.run)))`.
///
/// Breakers are looked up by adapter name in a shared registry, so breaker
/// state carries over between batches that share the registry.
#[derive(Debug, Clone)]
pub struct ResilientExecutionStrategy {
    registry: Arc<CircuitBreakerRegistry>,
    config: ResilienceConfig,
    retry: RetryConfig,
    max_concurrency: Option<usize>,
}

impl ResilientExecutionStrategy {
    /// Creates the strategy.
    ///
    /// Unless `config.retry` carries its own predicate, retries follow
    /// [`ErrorClassifier::is_retryable`]. Timeouts follow
    /// [`RetryConfig::retry_on_timeout`] either way.
    pub fn new(registry: Arc<CircuitBreakerRegistry>, config: ResilienceConfig) -> Self {
        let retry = if config.retry.is_retryable.is_some() {
            config.retry.clone()
        } else {
            config
                .retry
                .clone()
                .with_retry_if(|error: &CerberError| ErrorClassifier::is_retryable(error))
        };

        Self {
            registry,
            config,
            retry,
            max_concurrency: None,
        }
    }

    /// Caps how many adapters run at once.
    pub fn with_max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = Some(limit);
        self
    }

    /// Returns the breaker registry.
    pub fn registry(&self) -> &Arc<CircuitBreakerRegistry> {
        &self.registry
    }

    /// Returns the resilience configuration.
    pub fn config(&self) -> &ResilienceConfig {
        &self.config
    }

    /// Runs one adapter under its breaker, retry and timeout.
    ///
    /// The per-attempt timeout is `options.timeout` when set, otherwise the
    /// configured one. Failures are classified with the attempt count, so a
    /// retryable failure that used every attempt reports as retries
    /// exhausted.
    pub async fn execute_resilient_adapter(
        &self,
        adapter: &ArcAdapter,
        options: &AdapterOptions,
    ) -> ResilientAdapterResult {
        let name = adapter.name();
        audit::emit_adapter_started(name, options, StrategyKind::Resilient.as_str());

        let started = Instant::now();
        let breaker = self
            .registry
            .get_or_create(name, Some(self.config.circuit_breaker.clone()));
        let timeout = options.timeout.unwrap_or(self.config.timeout);
        let attempts = AtomicU32::new(0);

        let outcome = breaker
            .execute(|| async {
                let outcome = retry_with_stats(&self.retry, || {
                    with_timeout(invoke(adapter.as_ref(), options), timeout, name)
                })
                .await;
                attempts.store(outcome.attempts, Ordering::SeqCst);
                outcome.result
            })
            .await;
        let duration = started.elapsed();

        match outcome {
            Ok(result) => {
                audit::emit_adapter_completed(&result);
                ResilientAdapterResult::success(name, result, duration)
            }
            Err(error) => {
                let attempts = attempts.load(Ordering::SeqCst);
                let context = if attempts > 0 {
                    ClassificationContext::with_attempts(attempts, self.retry.attempt_limit())
                } else {
                    ClassificationContext::default()
                };
                let classified = ErrorClassifier::classify_with(&error, &context);

                tracing::warn!(
                    adapter = %name,
                    error_type = %classified.kind,
                    attempts,
                    breaker_state = %breaker.state().kind(),
                    error = %error,
                    "Adapter failed under resilience policy"
                );
                audit::emit_adapter_failed(name, &classified, duration);
                ResilientAdapterResult::failure(name, classified, duration)
            }
        }
    }

    /// Runs adapters concurrently. Results are in input order.
    pub async fn execute_resilient_adapters(
        &self,
        adapters: &[ArcAdapter],
        options: &AdapterOptions,
    ) -> Vec<ResilientAdapterResult> {
        fan_out(adapters, self.max_concurrency, |adapter| {
            self.execute_resilient_adapter(adapter, options)
        })
        .await
    }

    /// Runs adapters one after another.
    pub async fn execute_resilient_sequential(
        &self,
        adapters: &[ArcAdapter],
        options: &AdapterOptions,
    ) -> Vec<ResilientAdapterResult> {
        let mut results = Vec::with_capacity(adapters.len());
        for adapter in adapters {
            results.push(self.execute_resilient_adapter(adapter, options).await);
        }
        results
    }
}

#[async_trait]
impl ExecutionStrategy for ResilientExecutionStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Resilient
    }

    async fn execute_parallel(
        &self,
        adapters: &[ArcAdapter],
        options: &AdapterOptions,
    ) -> Vec<AdapterResult> {
        let results = self.execute_resilient_adapters(adapters, options).await;
        ResultConverter::convert_all(&results)
    }

    async fn execute_sequential(
        &self,
        adapters: &[ArcAdapter],
        options: &AdapterOptions,
    ) -> Vec<AdapterResult> {
        let results = self.execute_resilient_sequential(adapters, options).await;
        ResultConverter::convert_all(&results)
    }
}
