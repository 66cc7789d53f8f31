//! Network capability used to reach the remote service server

use async_trait::async_trait;
use thiserror::Error;

use crate::models::Envelope;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetworkError {
    /// Any transport failure: connection, status, timeout, or undecodable reply
    #[error("Server I/O error: {0}")]
    ServerIo(String),
}

/// Synchronous request/reply exchange with the server
///
/// Each call sends one envelope and yields exactly one envelope back.
/// Dropping the returned future cancels the exchange.
#[async_trait]
pub trait NetworkClient: Send + Sync {
    async fn send_request(&self, message: &Envelope) -> Result<Envelope, NetworkError>;
}
