//! Test utilities for cardlink-terminal
//!
//! [`ScriptedServer`] stands in for the remote server: it answers each
//! request with the next queued reply and records every envelope it was sent.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use cardlink_core::protocol::{action, service};
use cardlink_core::{encode_body, EndRemoteServiceBody, Envelope, NetworkClient, NetworkError};

enum Reply {
    /// Server message; session id and client node id are copied from the request
    Message { action: String, body: String },
    Error(NetworkError),
    /// Never answers
    Pending,
}

/// In-memory server replaying queued replies
#[derive(Clone, Default)]
pub struct ScriptedServer {
    replies: Arc<Mutex<VecDeque<Reply>>>,
    sent: Arc<Mutex<Vec<Envelope>>>,
}

impl ScriptedServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a server command with the given `service` body
    pub fn then_command(self, body: impl Into<String>) -> Self {
        self.push(Reply::Message {
            action: "CMD".to_string(),
            body: body.into(),
        })
    }

    /// Queue an `IS_CARD_PRESENT` command
    pub fn then_is_card_present(self) -> Self {
        self.then_command(format!(
            r#"{{"coreApiLevel":2,"service":"{}"}}"#,
            service::IS_CARD_PRESENT
        ))
    }

    /// Queue the end of the session with an optional output
    pub fn then_end(self, output_data: Option<serde_json::Value>) -> Self {
        let body = encode_body(&EndRemoteServiceBody { output_data }).unwrap_or_default();
        self.then_end_raw(body)
    }

    pub fn then_end_raw(self, body: impl Into<String>) -> Self {
        self.push(Reply::Message {
            action: action::END_REMOTE_SERVICE.to_string(),
            body: body.into(),
        })
    }

    pub fn then_error(self, error: NetworkError) -> Self {
        self.push(Reply::Error(error))
    }

    /// Queue a reply that never arrives
    pub fn then_hang(self) -> Self {
        self.push(Reply::Pending)
    }

    /// Envelopes received so far
    pub fn sent(&self) -> Vec<Envelope> {
        self.sent.lock().clone()
    }

    fn push(self, reply: Reply) -> Self {
        self.replies.lock().push_back(reply);
        self
    }
}

#[async_trait]
impl NetworkClient for ScriptedServer {
    async fn send_request(&self, message: &Envelope) -> Result<Envelope, NetworkError> {
        self.sent.lock().push(message.clone());
        let reply = self.replies.lock().pop_front();

        match reply {
            Some(Reply::Message { action, body }) => {
                let mut envelope =
                    Envelope::new(&message.session_id, action, &message.client_node_id, body);
                envelope.server_node_id = Some("scripted-server".to_string());
                Ok(envelope)
            }
            Some(Reply::Error(err)) => Err(err),
            Some(Reply::Pending) => std::future::pending().await,
            None => Err(NetworkError::ServerIo("No scripted reply left".to_string())),
        }
    }
}
