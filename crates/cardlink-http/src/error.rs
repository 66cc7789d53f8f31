//! Error types for the HTTP transport

use cardlink_core::NetworkError;
use thiserror::Error;

/// Result type alias for HTTP transport operations
pub type Result<T> = std::result::Result<T, HttpError>;

#[derive(Error, Debug)]
pub enum HttpError {
    /// HTTP request failed (connection, timeout, body)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid server URL or endpoint
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Server answered with a non-success status
    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    /// Response body was not a list of envelopes
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// Response list was empty
    #[error("Server returned no message")]
    EmptyResponse,
}

impl From<HttpError> for NetworkError {
    fn from(err: HttpError) -> Self {
        NetworkError::ServerIo(format!("Comm error: {}", err))
    }
}
