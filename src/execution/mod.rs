//! Execution strategies for running a batch of adapters.
//!
//! Both strategies turn every adapter into exactly one
//! [`AdapterResult`](crate::core::AdapterResult), in adapter order. A failing
//! adapter becomes a skipped result; it never aborts the batch.
//!
//! - [`LegacyExecutionStrategy`] calls each adapter directly.
//! - [`ResilientExecutionStrategy`] wraps each call in a circuit breaker,
//!   retry and timeout, then converts back with [`ResultConverter`].

mod converter;
mod legacy;
mod resilient;

pub use converter::{
    AdapterOutcome, ExecutionStats, ResilientAdapterResult, ResultConverter, StatsComputer,
};
pub use legacy::LegacyExecutionStrategy;
pub use resilient::ResilientExecutionStrategy;

use crate::core::{Adapter, AdapterOptions, AdapterResult, ArcAdapter, CerberError, CerberResult};

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::str::FromStr;

/// Runs a set of adapters and reports one result per adapter.
#[async_trait]
pub trait ExecutionStrategy: Send + Sync + fmt::Debug {
    /// Returns which strategy this is.
    fn kind(&self) -> StrategyKind;

    /// Runs all adapters concurrently. Results are in input order.
    async fn execute_parallel(
        &self,
        adapters: &[ArcAdapter],
        options: &AdapterOptions,
    ) -> Vec<AdapterResult>;

    /// Runs adapters one after another.
    async fn execute_sequential(
        &self,
        adapters: &[ArcAdapter],
        options: &AdapterOptions,
    ) -> Vec<AdapterResult>;
}

/// Selects an execution strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Direct adapter calls.
    Legacy,
    /// Breaker, retry and timeout around every call.
    #[default]
    Resilient,
}

impl StrategyKind {
    /// Returns the strategy name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Legacy => "legacy",
            Self::Resilient => "resilient",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = CerberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "legacy" => Ok(Self::Legacy),
            "resilient" => Ok(Self::Resilient),
            other => Err(CerberError::invalid_config(
                "strategy",
                format!("must be 'legacy' or 'resilient' (got '{other}')"),
            )),
        }
    }
}

/// Calls `adapter.run`, turning a panic into an adapter error.
pub(crate) async fn invoke(
    adapter: &dyn Adapter,
    options: &AdapterOptions,
) -> CerberResult<AdapterResult> {
    match AssertUnwindSafe(adapter.run(options)).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => {
            let detail = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic payload".to_string());
            Err(CerberError::adapter(adapter.name(), format!("panicked: {detail}")))
        }
    }
}

/// Maps `run` over `items` with at most `limit` in flight, keeping input
/// order.
pub(crate) async fn fan_out<'a, I, T, F, Fut>(
    items: &'a [I],
    limit: Option<usize>,
    run: F,
) -> Vec<T>
where
    F: Fn(&'a I) -> Fut,
    Fut: Future<Output = T>,
{
    let limit = limit.unwrap_or(items.len()).max(1);
    // Built up front so the stream holds futures, not the borrowing closure.
    let futures: Vec<Fut> = items.iter().map(run).collect();
    stream::iter(futures)
        .buffered(limit)
        .collect()
        .await
}
