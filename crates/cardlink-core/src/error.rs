//! Error taxonomy for remote service sessions

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::codec::CodecError;
use crate::models::{ErrorCode, ReplyError};
use crate::network::NetworkError;
use crate::reader::ReaderError;

/// Result type for terminal operations
pub type TerminalResult<T> = Result<T, TerminalError>;

/// Errors that can end or degrade a remote service session
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TerminalError {
    /// Hardware or driver failure talking to the reader device
    #[error("Reader communication error: {0}")]
    ReaderCommunication(String),

    /// No or invalid response from the card, or the channel was lost
    #[error("Card communication error: {0}")]
    CardCommunication(String),

    /// The card answered with a status word outside the accepted set
    #[error("Card command error: {0}")]
    CardCommand(String),

    /// Network failure reaching the server
    #[error("Server communication error: {0}")]
    ServerCommunication(String),

    /// Unknown server command, decode failure, anything unclassified
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TerminalError {
    /// Stable status code reported to the caller
    pub fn status(&self) -> StatusCode {
        match self {
            TerminalError::ReaderCommunication(_) => StatusCode::ReaderCommunicationError,
            TerminalError::CardCommunication(_) => StatusCode::CardCommunicationError,
            TerminalError::CardCommand(_) => StatusCode::CardCommandError,
            TerminalError::ServerCommunication(_) => StatusCode::ServerCommunicationError,
            TerminalError::Internal(_) => StatusCode::InternalError,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            TerminalError::ReaderCommunication(m)
            | TerminalError::CardCommunication(m)
            | TerminalError::CardCommand(m)
            | TerminalError::ServerCommunication(m)
            | TerminalError::Internal(m) => m,
        }
    }

    /// Whether the failure came from the reader or the card link itself
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            TerminalError::ReaderCommunication(_) | TerminalError::CardCommunication(_)
        )
    }

    /// Error to embed in a reply body, for the classes the server knows about
    pub fn to_reply_error(&self) -> Option<ReplyError> {
        let code = match self {
            TerminalError::ReaderCommunication(_) => ErrorCode::ReaderCommunicationError,
            TerminalError::CardCommunication(_) => ErrorCode::CardCommunicationError,
            TerminalError::CardCommand(_) => ErrorCode::CardCommandError,
            _ => return None,
        };
        Some(ReplyError::new(code, self.message()))
    }
}

impl From<ReaderError> for TerminalError {
    fn from(err: ReaderError) -> Self {
        match err {
            ReaderError::ReaderIo(m) => TerminalError::ReaderCommunication(m),
            ReaderError::CardIo(m) => TerminalError::CardCommunication(m),
        }
    }
}

impl From<NetworkError> for TerminalError {
    fn from(err: NetworkError) -> Self {
        match err {
            NetworkError::ServerIo(m) => TerminalError::ServerCommunication(m),
        }
    }
}

impl From<CodecError> for TerminalError {
    fn from(err: CodecError) -> Self {
        TerminalError::Internal(err.to_string())
    }
}

/// Status code carried by a failed [`Outcome`](crate::Outcome)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusCode {
    ReaderCommunicationError,
    CardCommunicationError,
    CardCommandError,
    ServerCommunicationError,
    InternalError,
}

impl StatusCode {
    /// Numeric code, stable across releases
    pub fn code(self) -> u8 {
        match self {
            StatusCode::ReaderCommunicationError => 1,
            StatusCode::CardCommunicationError => 2,
            StatusCode::CardCommandError => 3,
            StatusCode::ServerCommunicationError => 4,
            StatusCode::InternalError => 5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StatusCode::ReaderCommunicationError => "READER_COMMUNICATION_ERROR",
            StatusCode::CardCommunicationError => "CARD_COMMUNICATION_ERROR",
            StatusCode::CardCommandError => "CARD_COMMAND_ERROR",
            StatusCode::ServerCommunicationError => "SERVER_COMMUNICATION_ERROR",
            StatusCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_are_stable() {
        let all = [
            (TerminalError::ReaderCommunication(String::new()), 1),
            (TerminalError::CardCommunication(String::new()), 2),
            (TerminalError::CardCommand(String::new()), 3),
            (TerminalError::ServerCommunication(String::new()), 4),
            (TerminalError::Internal(String::new()), 5),
        ];
        for (err, code) in all {
            assert_eq!(err.status().code(), code);
        }
    }

    #[test]
    fn test_boundary_errors_are_classified() {
        assert_eq!(
            TerminalError::from(ReaderError::CardIo("removed".into())).status(),
            StatusCode::CardCommunicationError
        );
        assert_eq!(
            TerminalError::from(ReaderError::ReaderIo("unplugged".into())).status(),
            StatusCode::ReaderCommunicationError
        );
        assert_eq!(
            TerminalError::from(NetworkError::ServerIo("refused".into())).status(),
            StatusCode::ServerCommunicationError
        );
    }

    #[test]
    fn test_only_card_side_errors_reach_the_server() {
        let reply = TerminalError::CardCommand("Unexpected status word: 6A82".into())
            .to_reply_error()
            .unwrap();
        assert_eq!(reply.code, ErrorCode::CardCommandError);
        assert_eq!(reply.message.as_deref(), Some("Unexpected status word: 6A82"));
        assert!(TerminalError::Internal("x".into()).to_reply_error().is_none());
        assert!(TerminalError::ServerCommunication("x".into())
            .to_reply_error()
            .is_none());
    }

    #[test]
    fn test_status_code_wire_name() {
        assert_eq!(
            serde_json::to_string(&StatusCode::CardCommandError).unwrap(),
            "\"CARD_COMMAND_ERROR\""
        );
        assert_eq!(StatusCode::InternalError.to_string(), "INTERNAL_ERROR");
    }
}
