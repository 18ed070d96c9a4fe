//! The closed error taxonomy and its exit codes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of an adapter failure.
///
/// The set is closed; each kind maps to a fixed process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The tool binary was not found.
    NotFound,
    /// The tool could not be executed.
    Permission,
    /// The run exceeded its deadline.
    Timeout,
    /// The adapter's circuit breaker rejected the call.
    CircuitBreakerOpen,
    /// Input or output failed validation.
    Validation,
    /// Every retry attempt failed.
    RetriesExhausted,
    /// The adapter crashed with a real error.
    Crash,
    /// Anything else.
    Unknown,
}

impl ErrorKind {
    /// Every kind, in classification priority order.
    pub const ALL: [ErrorKind; 8] = [
        ErrorKind::CircuitBreakerOpen,
        ErrorKind::Timeout,
        ErrorKind::NotFound,
        ErrorKind::Permission,
        ErrorKind::Validation,
        ErrorKind::RetriesExhausted,
        ErrorKind::Crash,
        ErrorKind::Unknown,
    ];

    /// Returns the process exit code for this kind.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NotFound => 127,
            Self::Permission => 126,
            Self::Timeout => 124,
            Self::CircuitBreakerOpen => 129,
            Self::Validation => 1,
            Self::RetriesExhausted => 130,
            Self::Crash => 3,
            Self::Unknown => 1,
        }
    }

    /// Returns `false` for failures that repeating cannot fix.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Self::NotFound | Self::Permission | Self::Validation | Self::RetriesExhausted
        )
    }

    /// Returns the wire name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Permission => "permission",
            Self::Timeout => "timeout",
            Self::CircuitBreakerOpen => "circuit_breaker_open",
            Self::Validation => "validation",
            Self::RetriesExhausted => "retries_exhausted",
            Self::Crash => "crash",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
