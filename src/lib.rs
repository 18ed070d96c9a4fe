//! # Cerber
//!
//! The resilient execution core of a CI workflow analyzer: runs several
//! external analyzers ("adapters") over a set of workflow files and merges
//! their findings into one deterministic report.
//!
//! ## Overview
//!
//! Cerber treats each analyzer as a black box behind the [`Adapter`] trait and
//! takes care of invoking it safely:
//!
//! - Per-adapter circuit breakers that stop calling a tool that keeps failing
//! - Retry with exponential backoff and jitter
//! - Per-attempt, per-step and global timeouts
//! - Classification of every failure into a closed taxonomy with exit codes
//! - Deduplicated, stably sorted output with summary counts
//! - Structured audit logging
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cerber::adapters::MockAdapter;
//! use cerber::{AdapterOptions, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let orchestrator = Orchestrator::builder()
//!         .add_adapter(MockAdapter::new("actionlint"))
//!         .add_adapter(MockAdapter::new("zizmor"))
//!         .build()?;
//!
//!     let options = AdapterOptions::new(".").with_file(".github/workflows/ci.yml");
//!     let report = orchestrator.run(&options).await;
//!
//!     println!("{}", report.to_deterministic_json()?);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! The library is organized into several layers:
//!
//! - **Core**: Fundamental types, traits, and error handling
//! - **Adapters**: Adapter implementations (a mock for testing)
//! - **Circuit Breaker**: Breaker state machine and the breaker registry
//! - **Classifier**: Failure taxonomy and exit codes
//! - **Resilience**: Retry, timeouts and configuration profiles
//! - **Execution**: Legacy and resilient execution strategies
//! - **Orchestrator**: Running adapters and aggregating the report
//! - **Audit**: Structured logging for CI runs

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod adapters;
pub mod audit;
pub mod circuit_breaker;
pub mod classifier;
pub mod core;
pub mod execution;
pub mod orchestrator;
pub mod resilience;

// Re-export commonly used types at the crate root
pub use crate::core::{
    Adapter, AdapterOptions, AdapterResult, ArcAdapter, CerberError, CerberOutput, CerberResult,
    Severity, Summary, ToolMetadata, Violation,
};

pub use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerRegistry};
pub use crate::classifier::{ClassifiedError, ErrorClassifier, ErrorKind};
pub use crate::execution::{ExecutionStrategy, StrategyKind};
pub use crate::orchestrator::{Orchestrator, OrchestratorConfig};
pub use crate::resilience::{ResilienceFactory, ResilienceOverrides, ResilienceProfile, RetryConfig};

/// Prelude module for convenient imports.
///
/// ```rust
/// use cerber::prelude::*;
/// ```
pub mod prelude {
    pub use crate::circuit_breaker::{
        CircuitBreaker, CircuitBreakerConfig, CircuitBreakerRegistry, CircuitState,
    };
    pub use crate::classifier::{ClassifiedError, ErrorClassifier, ErrorKind};
    pub use crate::core::{
        Adapter, AdapterOptions, AdapterResult, ArcAdapter, CerberError, CerberOutput,
        CerberResult, Severity, Violation,
    };
    pub use crate::execution::{
        ExecutionStrategy, LegacyExecutionStrategy, ResilientExecutionStrategy, StrategyKind,
    };
    pub use crate::orchestrator::{Orchestrator, OrchestratorConfig};
    pub use crate::resilience::{
        retry, with_timeout, ResilienceConfig, ResilienceFactory, ResilienceOverrides,
        ResilienceProfile, RetryConfig,
    };
}
