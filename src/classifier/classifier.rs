//! Priority-ordered failure classification.

use crate::classifier::kind::ErrorKind;
use crate::core::error::{io_error_code, CerberError};

use serde::{Deserialize, Serialize};
use std::error::Error as StdError;

/// Anything that can be handed to the classifier.
///
/// Adapters are external code, so the classifier accepts real errors as well
/// as bare messages, JSON values and the absence of any value. Only
/// [`Failure::Error`] can ever classify as [`ErrorKind::Crash`].
#[derive(Debug, Clone, Copy)]
pub enum Failure<'a> {
    /// A real error value.
    Error(&'a (dyn StdError + 'static)),
    /// A bare message with no error type behind it.
    Message(&'a str),
    /// An arbitrary structured value (e.g. decoded from a tool's JSON output).
    Value(&'a serde_json::Value),
    /// No value at all.
    Absent,
}

impl<'a> From<&'a CerberError> for Failure<'a> {
    fn from(error: &'a CerberError) -> Self {
        Self::Error(error)
    }
}

impl<'a> From<&'a std::io::Error> for Failure<'a> {
    fn from(error: &'a std::io::Error) -> Self {
        Self::Error(error)
    }
}

impl<'a> From<&'a str> for Failure<'a> {
    fn from(message: &'a str) -> Self {
        Self::Message(message)
    }
}

impl<'a> From<&'a String> for Failure<'a> {
    fn from(message: &'a String) -> Self {
        Self::Message(message)
    }
}

impl<'a> From<&'a serde_json::Value> for Failure<'a> {
    fn from(value: &'a serde_json::Value) -> Self {
        Self::Value(value)
    }
}

impl<'a, T> From<Option<T>> for Failure<'a>
where
    T: Into<Failure<'a>>,
{
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Absent, Into::into)
    }
}

impl Failure<'_> {
    /// Lower-cased text and errno-like code of the failure.
    fn inspect(&self) -> (String, Option<String>) {
        match self {
            Self::Error(error) => (error_text(*error).to_lowercase(), error_code(*error)),
            Self::Message(message) => (message.to_lowercase(), None),
            Self::Value(serde_json::Value::String(text)) => (text.to_lowercase(), None),
            Self::Value(serde_json::Value::Object(map)) => {
                let message = map
                    .get("message")
                    .and_then(serde_json::Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| serde_json::Value::Object(map.clone()).to_string());
                let code = map
                    .get("code")
                    .and_then(serde_json::Value::as_str)
                    .map(str::to_uppercase);
                (message.to_lowercase(), code)
            }
            Self::Value(other) => (other.to_string().to_lowercase(), None),
            Self::Absent => (String::new(), None),
        }
    }

    /// Original (not lower-cased) message for reporting.
    fn message(&self) -> String {
        match self {
            Self::Error(error) => error.to_string(),
            Self::Message(message) => (*message).to_string(),
            Self::Value(serde_json::Value::String(text)) => text.clone(),
            Self::Value(serde_json::Value::Object(map)) => map
                .get("message")
                .and_then(serde_json::Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| serde_json::Value::Object(map.clone()).to_string()),
            Self::Value(other) => other.to_string(),
            Self::Absent => "unknown error".to_string(),
        }
    }
}

/// Text of an error for matching. Our own errors leave out the names they
/// carry, so a tool called `timeout-lint` is not taken for a timeout.
fn error_text(error: &(dyn StdError + 'static)) -> String {
    match error.downcast_ref::<CerberError>() {
        Some(cerber) => cerber.classification_text(),
        None => error.to_string(),
    }
}

/// Walks the source chain looking for a known error type carrying a code.
fn error_code(error: &(dyn StdError + 'static)) -> Option<String> {
    let mut current = Some(error);
    while let Some(err) = current {
        if let Some(cerber) = err.downcast_ref::<CerberError>() {
            if let Some(code) = cerber.code() {
                return Some(code.to_string());
            }
        } else if let Some(io) = err.downcast_ref::<std::io::Error>() {
            if let Some(code) = io_error_code(io) {
                return Some(code.to_string());
            }
        }
        current = err.source();
    }
    None
}

/// Caller-supplied retry context.
///
/// `retries_exhausted` is only ever reported when the caller provides both
/// fields; the classifier does not infer attempt counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationContext {
    /// Attempts made so far.
    pub attempts: Option<u32>,
    /// Maximum attempts allowed.
    pub max_retries: Option<u32>,
}

impl ClassificationContext {
    /// Creates a context describing `attempts` out of `max_retries`.
    pub fn with_attempts(attempts: u32, max_retries: u32) -> Self {
        Self {
            attempts: Some(attempts),
            max_retries: Some(max_retries),
        }
    }

    fn exhausted(&self) -> bool {
        matches!(
            (self.attempts, self.max_retries),
            (Some(attempts), Some(max)) if attempts >= max
        )
    }
}

/// The classification of one failure. Computed fresh for every failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedError {
    /// The error kind.
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    /// Exit code for the kind.
    pub exit_code: i32,
    /// Short description of the kind.
    pub reason: String,
    /// Message of the original failure.
    pub message: String,
    /// Attempts made, when the caller supplied them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u32>,
}

impl ClassifiedError {
    /// Creates a classification of the given kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            exit_code: kind.exit_code(),
            reason: default_reason(kind, None),
            message: message.into(),
            attempts: None,
        }
    }

    /// Returns `true` if the failure may succeed when repeated.
    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

fn default_reason(kind: ErrorKind, attempts: Option<u32>) -> String {
    match kind {
        ErrorKind::CircuitBreakerOpen => "circuit breaker is open".to_string(),
        ErrorKind::Timeout => "operation timed out".to_string(),
        ErrorKind::NotFound => "tool not found".to_string(),
        ErrorKind::Permission => "permission denied".to_string(),
        ErrorKind::Validation => "validation failed".to_string(),
        ErrorKind::RetriesExhausted => match attempts {
            Some(n) => format!("all {n} attempts failed"),
            None => "retries exhausted".to_string(),
        },
        ErrorKind::Crash => "adapter crashed".to_string(),
        ErrorKind::Unknown => "unknown error".to_string(),
    }
}

/// Maps raw failures to the closed [`ErrorKind`] taxonomy.
///
/// Classification is total and pure: it never panics and never caches.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// Classifies a failure without retry context.
    pub fn classify<'a>(failure: impl Into<Failure<'a>>) -> ClassifiedError {
        Self::classify_with(failure, &ClassificationContext::default())
    }

    /// Classifies a failure, most specific kind first.
    pub fn classify_with<'a>(
        failure: impl Into<Failure<'a>>,
        context: &ClassificationContext,
    ) -> ClassifiedError {
        let failure = failure.into();
        let (text, code) = failure.inspect();
        let kind = Self::kind_of(&failure, &text, code.as_deref(), context);

        ClassifiedError {
            kind,
            exit_code: kind.exit_code(),
            reason: default_reason(kind, context.attempts),
            message: failure.message(),
            attempts: context.attempts,
        }
    }

    /// Returns `true` unless the failure classifies as not found, permission,
    /// validation or retries exhausted.
    pub fn is_retryable<'a>(failure: impl Into<Failure<'a>>) -> bool {
        Self::classify(failure).is_retryable()
    }

    fn kind_of(
        failure: &Failure<'_>,
        text: &str,
        code: Option<&str>,
        context: &ClassificationContext,
    ) -> ErrorKind {
        let code_is = |candidates: &[&str]| code.is_some_and(|c| candidates.contains(&c));

        if code_is(&["ECIRCUITOPEN"])
            || (text.contains("circuit breaker") && text.contains("open"))
        {
            ErrorKind::CircuitBreakerOpen
        } else if code_is(&["ETIMEDOUT"])
            || text.contains("timeout")
            || text.contains("timed out")
            || text.contains("etimedout")
        {
            ErrorKind::Timeout
        } else if code_is(&["ENOENT"])
            || text.contains("enoent")
            || text.contains("not found")
            || text.contains("no such file")
        {
            ErrorKind::NotFound
        } else if code_is(&["EACCES", "EPERM"])
            || text.contains("permission denied")
            || text.contains("eacces")
            || text.contains("eperm")
        {
            ErrorKind::Permission
        } else if text.contains("validation") || text.contains("invalid") {
            ErrorKind::Validation
        } else if context.exhausted() {
            ErrorKind::RetriesExhausted
        } else if matches!(failure, Failure::Error(_)) {
            ErrorKind::Crash
        } else {
            ErrorKind::Unknown
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn test_classify_known_errors() {
        let cases = [
            (
                CerberError::circuit_open("actionlint", None),
                ErrorKind::CircuitBreakerOpen,
            ),
            (
                CerberError::timeout("zizmor", Duration::from_secs(1)),
                ErrorKind::Timeout,
            ),
            (
                CerberError::tool_not_found("gitleaks", "not on PATH"),
                ErrorKind::NotFound,
            ),
            (
                CerberError::permission_denied("gitleaks", "mode 0644"),
                ErrorKind::Permission,
            ),
            (CerberError::validation("bad sarif"), ErrorKind::Validation),
            (CerberError::adapter("zizmor", "panicked"), ErrorKind::Crash),
        ];

        for (error, expected) in cases {
            let classified = ErrorClassifier::classify(&error);
            assert_eq!(classified.kind, expected, "{error}");
            assert_eq!(classified.exit_code, expected.exit_code());
            assert_eq!(classified.message, error.to_string());
        }
    }

    #[test]
    fn test_priority_most_specific_first() {
        // Mentions both a timeout and a missing file; timeout wins.
        let error = CerberError::adapter("zizmor", "timed out waiting: file not found");
        assert_eq!(ErrorClassifier::classify(&error).kind, ErrorKind::Timeout);

        // Circuit open beats everything.
        let classified = ErrorClassifier::classify("Circuit breaker OPEN after timeout");
        assert_eq!(classified.kind, ErrorKind::CircuitBreakerOpen);
    }

    #[test]
    fn test_names_do_not_drive_classification() {
        let missing = CerberError::tool_not_found("timeout-lint", "not on PATH");
        let classified = ErrorClassifier::classify(&missing);
        assert_eq!(classified.kind, ErrorKind::NotFound);
        assert_eq!(classified.message, missing.to_string());

        let crashed = CerberError::adapter("invalid-yaml-check", "exited with signal 11");
        assert_eq!(ErrorClassifier::classify(&crashed).kind, ErrorKind::Crash);

        let denied = CerberError::permission_denied("validation-tool", "mode 0644");
        assert_eq!(ErrorClassifier::classify(&denied).kind, ErrorKind::Permission);
    }

    #[test]
    fn test_io_error_codes() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "spawn failed");
        assert_eq!(ErrorClassifier::classify(&io).kind, ErrorKind::NotFound);

        let wrapped = CerberError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "spawn failed",
        ));
        assert_eq!(
            ErrorClassifier::classify(&wrapped).kind,
            ErrorKind::Permission
        );
    }

    #[test]
    fn test_classify_is_total() {
        let none: Option<&CerberError> = None;
        let absent = ErrorClassifier::classify(none);
        assert_eq!(absent.kind, ErrorKind::Unknown);
        assert_eq!(absent.exit_code, 1);

        for value in [
            json!(null),
            json!(42),
            json!(true),
            json!({}),
            json!({"foo": "bar"}),
            json!([1, 2, 3]),
        ] {
            let classified = ErrorClassifier::classify(&value);
            assert_eq!(classified.kind, ErrorKind::Unknown, "{value}");
            assert_eq!(classified.exit_code, 1);
        }

        assert_eq!(ErrorClassifier::classify("").kind, ErrorKind::Unknown);
    }

    #[test]
    fn test_plain_objects_use_message_and_code() {
        let value = json!({"code": "ENOENT", "message": "spawn actionlint"});
        let classified = ErrorClassifier::classify(&value);
        assert_eq!(classified.kind, ErrorKind::NotFound);
        assert_eq!(classified.message, "spawn actionlint");

        let value = json!({"message": "Permission denied"});
        assert_eq!(
            ErrorClassifier::classify(&value).kind,
            ErrorKind::Permission
        );
    }

    #[test]
    fn test_retries_exhausted_requires_context() {
        let error = CerberError::adapter("zizmor", "exit status 2");

        let without = ErrorClassifier::classify(&error);
        assert_eq!(without.kind, ErrorKind::Crash);
        assert_eq!(without.attempts, None);

        let context = ClassificationContext::with_attempts(3, 3);
        let with = ErrorClassifier::classify_with(&error, &context);
        assert_eq!(with.kind, ErrorKind::RetriesExhausted);
        assert_eq!(with.exit_code, 130);
        assert_eq!(with.attempts, Some(3));

        let partial = ClassificationContext {
            attempts: Some(5),
            max_retries: None,
        };
        assert_eq!(
            ErrorClassifier::classify_with(&error, &partial).kind,
            ErrorKind::Crash
        );

        let not_yet = ClassificationContext::with_attempts(1, 3);
        assert_eq!(
            ErrorClassifier::classify_with(&error, &not_yet).kind,
            ErrorKind::Crash
        );
    }

    #[test]
    fn test_string_failures_never_crash() {
        assert_eq!(
            ErrorClassifier::classify("exit status 2").kind,
            ErrorKind::Unknown
        );
    }

    #[test]
    fn test_is_retryable() {
        assert!(ErrorClassifier::is_retryable(&CerberError::timeout(
            "x",
            Duration::from_secs(1)
        )));
        assert!(ErrorClassifier::is_retryable(&CerberError::adapter(
            "x", "boom"
        )));
        assert!(!ErrorClassifier::is_retryable(
            &CerberError::tool_not_found("x", "missing")
        ));
        assert!(!ErrorClassifier::is_retryable(&CerberError::validation(
            "schema"
        )));
    }

    #[test]
    fn test_serialized_shape() {
        let classified = ErrorClassifier::classify_with(
            &CerberError::adapter("zizmor", "boom"),
            &ClassificationContext::with_attempts(2, 2),
        );
        let json = serde_json::to_value(&classified).unwrap();
        assert_eq!(json["type"], "retries_exhausted");
        assert_eq!(json["exitCode"], 130);
        assert_eq!(json["attempts"], 2);
        assert_eq!(json["reason"], "all 2 attempts failed");
    }
}
