//! Core types and traits for the cerber library.
//!
//! - [`types`] - Violations, severities, adapter options and results
//! - [`traits`] - The `Adapter` contract
//! - [`error`] - The crate-wide error type
//! - [`output`] - The aggregate `CerberOutput` report
//! - [`clock`] - Injectable time source

pub mod clock;
pub(crate) mod duration_serde;
pub mod error;
pub mod output;
pub mod traits;
pub mod types;

pub use clock::{Clock, MockClock, SharedClock, SystemClock};
pub use error::{CerberError, CerberResult};
pub use output::{CerberOutput, ReportMetadata, RunMetadata, Summary, SCHEMA_VERSION};
pub use traits::{Adapter, ArcAdapter};
pub use types::{
    AdapterOptions, AdapterResult, Severity, ToolMetadata, Violation, ViolationKey,
    UNKNOWN_VERSION,
};
