//! Adapter implementations.
//!
//! Concrete analyzer wrappers (actionlint, zizmor, gitleaks, ...) live
//! outside the execution core; they only need to implement
//! [`Adapter`](crate::core::Adapter).
//!
//! ## Available Adapters
//!
//! - [`mock`] - A configurable mock adapter for testing
//!
//! ## Implementing an Adapter
//!
//! ```rust,ignore
//! use cerber::core::{Adapter, AdapterOptions, AdapterResult, CerberError};
//! use async_trait::async_trait;
//!
//! #[derive(Debug)]
//! pub struct Zizmor;
//!
//! #[async_trait]
//! impl Adapter for Zizmor {
//!     fn name(&self) -> &str {
//!         "zizmor"
//!     }
//!
//!     async fn run(&self, options: &AdapterOptions) -> Result<AdapterResult, CerberError> {
//!         // Spawn zizmor over options.files and parse its SARIF output
//!         todo!()
//!     }
//! }
//! ```

pub mod mock;

pub use mock::{MockAdapter, MockBehavior};
