use std::fmt::Display;

use thiserror::Error;

/// Fallback display text used when nothing meaningful can be extracted from
/// a raw error.
pub const UNKNOWN_ERROR: &str = "UNKNOWN_ERROR";

/// Optional machine-readable discriminator carried by an error value.
///
/// The display normalization chain consults [`ErrorType::error_type`] before
/// the error's `Display` text, so errors that categorize themselves surface
/// their category to observers. The default implementation carries none.
pub trait ErrorType {
    /// Short discriminator for this error, when it has one.
    fn error_type(&self) -> Option<&str> {
        None
    }
}

impl ErrorType for String {}
impl ErrorType for &str {}

/// The raw error recorded for a failed invocation.
///
/// `Call` wraps the error the operation itself settled with. `Task` covers
/// failures outside the operation, such as a panic in the call's task.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RequestError<E> {
    #[error("{0}")]
    Call(E),
    #[error("request task failed: {0}")]
    Task(String),
}

impl<E> RequestError<E> {
    pub fn is_call(&self) -> bool {
        matches!(self, RequestError::Call(_))
    }

    pub fn is_task(&self) -> bool {
        matches!(self, RequestError::Task(_))
    }

    /// The wrapped call error, if this is one.
    pub fn call_error(&self) -> Option<&E> {
        match self {
            RequestError::Call(error) => Some(error),
            RequestError::Task(_) => None,
        }
    }
}

impl<E: ErrorType> ErrorType for RequestError<E> {
    fn error_type(&self) -> Option<&str> {
        match self {
            RequestError::Call(error) => error.error_type(),
            RequestError::Task(_) => None,
        }
    }
}

impl<E: ErrorType + Display> RequestError<E> {
    /// Display text for this error before any configured transform runs:
    /// the type discriminator if present, else the non-empty `Display`
    /// text, else [`UNKNOWN_ERROR`].
    pub fn display_message(&self) -> String {
        if let Some(kind) = self.error_type() {
            if !kind.is_empty() {
                return kind.to_string();
            }
        }
        let message = self.to_string();
        if message.is_empty() {
            UNKNOWN_ERROR.to_string()
        } else {
            message
        }
    }
}

/// Construction-time misconfiguration.
///
/// Unlike invocation failures, these are programmer errors and are reported
/// synchronously and loudly.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("\"call\" parameter not provided")]
    MissingCall,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct KindedError {
        kind: Option<&'static str>,
        message: &'static str,
    }

    impl Display for KindedError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{}", self.message)
        }
    }

    impl ErrorType for KindedError {
        fn error_type(&self) -> Option<&str> {
            self.kind
        }
    }

    #[test]
    fn test_display_message_prefers_the_error_type() {
        let error = RequestError::Call(KindedError {
            kind: Some("TIMEOUT"),
            message: "took too long",
        });
        assert_eq!(error.display_message(), "TIMEOUT");
    }

    #[test]
    fn test_display_message_falls_back_to_display_text() {
        let error = RequestError::Call(KindedError {
            kind: None,
            message: "took too long",
        });
        assert_eq!(error.display_message(), "took too long");
    }

    #[test]
    fn test_display_message_ignores_empty_candidates() {
        let error = RequestError::Call(KindedError {
            kind: Some(""),
            message: "",
        });
        assert_eq!(error.display_message(), UNKNOWN_ERROR);
    }

    #[test]
    fn test_string_errors_carry_no_type() {
        let error: RequestError<String> = RequestError::Call("boom".to_string());
        assert_eq!(error.error_type(), None);
        assert_eq!(error.display_message(), "boom");
    }

    #[test]
    fn test_task_errors_describe_the_task_failure() {
        let error: RequestError<String> = RequestError::Task("task 1 panicked".to_string());
        assert!(error.is_task());
        assert_eq!(error.call_error(), None);
        assert_eq!(error.display_message(), "request task failed: task 1 panicked");
    }

    #[test]
    fn test_config_error_names_the_missing_parameter() {
        assert_eq!(
            ConfigError::MissingCall.to_string(),
            "\"call\" parameter not provided"
        );
    }
}
