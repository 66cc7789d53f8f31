//! Caller-facing result of a remote service execution

use serde_json::Value;

use crate::error::{StatusCode, TerminalError};

/// Result of one remote service execution
///
/// Success carries the server's output, if any. Failure carries a stable
/// status code, a message, and whatever output the server attached when the
/// session still closed cleanly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T = String> {
    Success(Option<T>),
    Failure {
        status: StatusCode,
        message: String,
        data: Option<T>,
    },
}

impl<T> Outcome<T> {
    pub fn failure(error: &TerminalError, data: Option<T>) -> Self {
        Outcome::Failure {
            status: error.status(),
            message: error.message().to_string(),
            data,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    /// Status code of a failure, `None` on success
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Outcome::Success(_) => None,
            Outcome::Failure { status, .. } => Some(*status),
        }
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            Outcome::Success(data) => data.as_ref(),
            Outcome::Failure { data, .. } => data.as_ref(),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Success(data) => Outcome::Success(data.map(f)),
            Outcome::Failure {
                status,
                message,
                data,
            } => Outcome::Failure {
                status,
                message,
                data: data.map(f),
            },
        }
    }
}

/// Text form of a server `outputData` value
///
/// A JSON string yields its content unquoted; any other value yields its JSON
/// text. Absent and `null` both yield `None`.
pub fn output_text(value: Option<Value>) -> Option<String> {
    value.filter(|v| !v.is_null()).map(value_text)
}

/// Text form of a JSON value; strings are not quoted
pub fn value_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_output_text() {
        assert_eq!(output_text(Some(json!("42"))), Some("42".to_string()));
        assert_eq!(
            output_text(Some(json!({"balance": 3}))),
            Some(r#"{"balance":3}"#.to_string())
        );
        assert_eq!(output_text(Some(Value::Null)), None);
        assert_eq!(output_text(None), None);
    }

    #[test]
    fn test_failure_from_error() {
        let outcome: Outcome =
            Outcome::failure(&TerminalError::CardCommand("bad".into()), Some("x".into()));
        assert!(!outcome.is_success());
        assert_eq!(outcome.status(), Some(StatusCode::CardCommandError));
        assert_eq!(outcome.data().map(String::as_str), Some("x"));
    }

    #[test]
    fn test_map_keeps_variant() {
        let outcome: Outcome<usize> = Outcome::Success(Some("abc".to_string())).map(|s| s.len());
        assert_eq!(outcome, Outcome::Success(Some(3)));
    }
}
