//! Error types for the cerber execution core.
//!
//! Every failure surfaced by adapters, breakers, retries and timeouts is a
//! [`CerberError`]. Adapter-level errors never abort a batch; they are
//! classified and folded into a skipped result by the execution strategies.

use std::time::Duration;
use thiserror::Error;

/// The crate-wide error type.
#[derive(Debug, Error)]
pub enum CerberError {
    /// The circuit breaker for a resource is open and the call was rejected.
    #[error("circuit breaker is open for '{name}'")]
    CircuitOpen {
        /// Name of the breaker (the adapter name).
        name: String,
        /// Time left until the breaker will admit a probe, if known.
        retry_in: Option<Duration>,
    },

    /// A single operation exceeded its deadline.
    #[error("operation '{operation}' timed out after {timeout:?}")]
    Timeout {
        /// Name of the operation that timed out.
        operation: String,
        /// The deadline that was exceeded.
        timeout: Duration,
    },

    /// The aggregate deadline of a multi-step operation was exhausted.
    #[error("global timeout of {budget:?} exceeded for '{operation}'")]
    GlobalTimeout {
        /// Name of the aggregate operation.
        operation: String,
        /// The global budget.
        budget: Duration,
    },

    /// The analyzer binary could not be found.
    #[error("tool '{tool}' not found: {detail}")]
    ToolNotFound {
        /// Tool name.
        tool: String,
        /// Additional detail (usually the lookup path).
        detail: String,
    },

    /// The analyzer could not be executed due to permissions.
    #[error("permission denied for '{tool}': {detail}")]
    PermissionDenied {
        /// Tool name.
        tool: String,
        /// Additional detail.
        detail: String,
    },

    /// Input or output failed validation.
    #[error("validation failed: {message}")]
    Validation {
        /// What failed validation.
        message: String,
    },

    /// A resilience configuration value is out of range.
    #[error("invalid resilience configuration: '{field}' {reason}")]
    InvalidConfig {
        /// The offending field.
        field: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The adapter failed while running.
    #[error("adapter '{adapter}' failed: {message}")]
    Adapter {
        /// Adapter name.
        adapter: String,
        /// Failure description.
        message: String,
    },

    /// A network connection failed.
    #[error("connection to '{target}' failed: {message}")]
    ConnectionFailed {
        /// Remote target.
        target: String,
        /// Error message.
        message: String,
    },

    /// The remote side asked us to slow down.
    #[error("rate limit exceeded for '{target}': retry after {retry_after:?}")]
    RateLimited {
        /// Remote target.
        target: String,
        /// Suggested wait time before retrying.
        retry_after: Option<Duration>,
    },

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An internal error occurred.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl CerberError {
    /// Returns an errno-like code for this error, if one applies.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            Self::CircuitOpen { .. } => Some("ECIRCUITOPEN"),
            Self::Timeout { .. } | Self::GlobalTimeout { .. } => Some("ETIMEDOUT"),
            Self::ToolNotFound { .. } => Some("ENOENT"),
            Self::PermissionDenied { .. } => Some("EACCES"),
            Self::ConnectionFailed { .. } => Some("ECONNREFUSED"),
            Self::RateLimited { .. } => Some("ERATELIMIT"),
            Self::Io(err) => io_error_code(err),
            _ => None,
        }
    }

    /// Returns `true` if the error is transient (network, rate limit, service
    /// unavailability or timeout) and the operation may succeed if repeated.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::ConnectionFailed { .. } | Self::RateLimited { .. } => {
                true
            }
            Self::Io(err) => matches!(
                err.kind(),
                std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::Interrupted
            ),
            Self::Adapter { message, .. } | Self::Internal { message } => {
                looks_transient(message)
            }
            _ => false,
        }
    }

    /// Returns `true` if this is a timeout of either kind.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::GlobalTimeout { .. })
    }

    /// The text the classifier scans: the variant's meaning plus any free-form
    /// detail, without tool or operation names.
    pub(crate) fn classification_text(&self) -> String {
        match self {
            Self::CircuitOpen { .. } => "circuit breaker is open".to_string(),
            Self::Timeout { .. } => "operation timed out".to_string(),
            Self::GlobalTimeout { .. } => "global timeout exceeded".to_string(),
            Self::ToolNotFound { detail, .. } => format!("tool not found: {detail}"),
            Self::PermissionDenied { detail, .. } => format!("permission denied: {detail}"),
            Self::Validation { message } => format!("validation failed: {message}"),
            Self::InvalidConfig { reason, .. } => format!("invalid configuration: {reason}"),
            Self::RateLimited { .. } => "rate limit exceeded".to_string(),
            Self::Io(err) => err.to_string(),
            Self::Adapter { message, .. }
            | Self::ConnectionFailed { message, .. }
            | Self::Internal { message } => message.clone(),
        }
    }

    /// Creates a `CircuitOpen` error.
    pub fn circuit_open(name: impl Into<String>, retry_in: Option<Duration>) -> Self {
        Self::CircuitOpen {
            name: name.into(),
            retry_in,
        }
    }

    /// Creates a `Timeout` error.
    pub fn timeout(operation: impl Into<String>, timeout: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout,
        }
    }

    /// Creates a `ToolNotFound` error.
    pub fn tool_not_found(tool: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::ToolNotFound {
            tool: tool.into(),
            detail: detail.into(),
        }
    }

    /// Creates a `PermissionDenied` error.
    pub fn permission_denied(tool: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::PermissionDenied {
            tool: tool.into(),
            detail: detail.into(),
        }
    }

    /// Creates a `Validation` error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates an `InvalidConfig` error naming the offending field.
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates an `Adapter` error.
    pub fn adapter(adapter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Adapter {
            adapter: adapter.into(),
            message: message.into(),
        }
    }

    /// Creates a `ConnectionFailed` error.
    pub fn connection_failed(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            target: target.into(),
            message: message.into(),
        }
    }

    /// Creates an `Internal` error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

/// Maps an I/O error kind to the errno-like code the classifier understands.
pub(crate) fn io_error_code(err: &std::io::Error) -> Option<&'static str> {
    use std::io::ErrorKind;

    match err.kind() {
        ErrorKind::NotFound => Some("ENOENT"),
        ErrorKind::PermissionDenied => Some("EACCES"),
        ErrorKind::TimedOut => Some("ETIMEDOUT"),
        ErrorKind::ConnectionRefused => Some("ECONNREFUSED"),
        ErrorKind::ConnectionReset => Some("ECONNRESET"),
        _ => None,
    }
}

const TRANSIENT_MARKERS: &[&str] = &[
    "econnreset",
    "econnrefused",
    "etimedout",
    "socket hang up",
    "network",
    "rate limit",
    "too many requests",
    "429",
    "502",
    "503",
    "504",
    "service unavailable",
    "temporarily unavailable",
];

/// Heuristic for free-form messages coming out of external tools.
pub(crate) fn looks_transient(message: &str) -> bool {
    let lower = message.to_lowercase();
    TRANSIENT_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// A specialized `Result` type for cerber operations.
pub type CerberResult<T> = Result<T, CerberError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            CerberError::timeout("zizmor", Duration::from_secs(1)).code(),
            Some("ETIMEDOUT")
        );
        assert_eq!(
            CerberError::tool_not_found("actionlint", "not on PATH").code(),
            Some("ENOENT")
        );
        let io = CerberError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "nope",
        ));
        assert_eq!(io.code(), Some("EACCES"));
        assert_eq!(CerberError::validation("bad").code(), None);
    }

    #[test]
    fn test_is_recoverable() {
        assert!(CerberError::connection_failed("registry", "reset").is_recoverable());
        assert!(CerberError::adapter("gitleaks", "HTTP 503 Service Unavailable").is_recoverable());
        assert!(!CerberError::adapter("gitleaks", "segfault").is_recoverable());
        assert!(!CerberError::tool_not_found("gitleaks", "missing").is_recoverable());
    }

    #[test]
    fn test_display_mentions_context() {
        let err = CerberError::invalid_config("successThreshold", "must be greater than 0");
        let text = err.to_string();
        assert!(text.contains("successThreshold"));
        assert!(text.contains("invalid"));

        let err = CerberError::circuit_open("actionlint", None);
        assert!(err.to_string().contains("circuit breaker is open"));
    }
}
