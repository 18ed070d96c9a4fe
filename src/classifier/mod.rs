//! Error classification.
//!
//! Maps any failure an adapter run can produce onto a closed taxonomy with
//! fixed exit codes. Classification is priority-ordered, most specific first:
//!
//! `circuit_breaker_open` > `timeout` > `not_found` > `permission` >
//! `validation` > `retries_exhausted` > `crash` > `unknown`

#[allow(clippy::module_inception)]
mod classifier;
mod kind;

pub use classifier::{ClassificationContext, ClassifiedError, ErrorClassifier, Failure};
pub use kind::ErrorKind;
