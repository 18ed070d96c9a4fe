//! Core traits for the cerber library.
//!
//! This module defines the `Adapter` trait every external analyzer wrapper
//! implements. The execution core only ever sees this contract; it never
//! inspects how an adapter parses its tool's output.

use crate::core::error::CerberError;
use crate::core::types::{AdapterOptions, AdapterResult};

use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;

/// An external analyzer invoked as a black box.
///
/// # Implementation Notes
///
/// - Implementations must be `Send + Sync`; strategies run several adapters
///   concurrently and share them behind `Arc`.
/// - A timed-out `run` is abandoned, not killed. Implementations must not rely
///   on shared mutable state that a later call would reuse.
/// - Implementations should never panic; failures are returned as
///   `CerberError` and classified by the caller.
///
/// # Example Implementation
///
/// ```rust,ignore
/// use cerber::core::{Adapter, AdapterOptions, AdapterResult, CerberError};
/// use async_trait::async_trait;
///
/// #[derive(Debug)]
/// struct Actionlint;
///
/// #[async_trait]
/// impl Adapter for Actionlint {
///     fn name(&self) -> &str {
///         "actionlint"
///     }
///
///     async fn run(&self, options: &AdapterOptions) -> Result<AdapterResult, CerberError> {
///         // Spawn the tool, parse its output...
///         Ok(AdapterResult::new("actionlint", "1.7.1", 0))
///     }
/// }
/// ```
#[async_trait]
pub trait Adapter: Send + Sync + Debug {
    /// Returns the stable name of this adapter, e.g. `"actionlint"`.
    ///
    /// The name keys the adapter's circuit breaker.
    fn name(&self) -> &str;

    /// Runs the analyzer over `options.files`.
    ///
    /// # Errors
    ///
    /// Returns `CerberError` when the tool is missing, not executable, times
    /// out internally, or crashes.
    async fn run(&self, options: &AdapterOptions) -> Result<AdapterResult, CerberError>;
}

/// An arc-wrapped adapter for shared ownership.
pub type ArcAdapter = Arc<dyn Adapter>;
