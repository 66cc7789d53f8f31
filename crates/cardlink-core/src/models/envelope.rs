//! Envelope carried by every exchange with the server

use serde::{Deserialize, Serialize};

use crate::protocol::{self, action};

/// Outer message of every client/server exchange
///
/// `body` is itself a JSON document serialized to a string. Optional fields
/// left unset are omitted from the encoded form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    #[serde(default = "default_api_level")]
    pub api_level: i32,
    pub session_id: String,
    pub action: String,
    pub client_node_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_node_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_reader_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_reader_name: Option<String>,
    #[serde(default)]
    pub body: String,
}

fn default_api_level() -> i32 {
    protocol::API_LEVEL
}

impl Envelope {
    /// New client message for `session_id` with no server or remote reader set
    pub fn new(
        session_id: impl Into<String>,
        action: impl Into<String>,
        client_node_id: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            api_level: protocol::API_LEVEL,
            session_id: session_id.into(),
            action: action.into(),
            client_node_id: client_node_id.into(),
            server_node_id: None,
            local_reader_name: None,
            remote_reader_name: None,
            body: body.into(),
        }
    }

    pub fn with_local_reader_name(mut self, name: impl Into<String>) -> Self {
        self.local_reader_name = Some(name.into());
        self
    }

    /// Copy the server-side routing fields of a received message
    pub fn routed_like(mut self, received: &Envelope) -> Self {
        self.server_node_id = received.server_node_id.clone();
        self.remote_reader_name = received.remote_reader_name.clone();
        self
    }

    pub fn is_end_of_service(&self) -> bool {
        self.action == action::END_REMOTE_SERVICE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_unset_fields_are_omitted() {
        let envelope = Envelope::new("s1", action::EXECUTE_REMOTE_SERVICE, "node", "{}");
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "apiLevel": 3,
                "sessionId": "s1",
                "action": "EXECUTE_REMOTE_SERVICE",
                "clientNodeId": "node",
                "body": "{}"
            })
        );
    }

    #[test]
    fn test_reply_keeps_routing() {
        let mut cmd = Envelope::new("s1", "CMD", "node", "{}");
        cmd.server_node_id = Some("srv".into());
        cmd.remote_reader_name = Some("remote".into());
        let resp = Envelope::new("s1", action::RESP, "node", "{\"x\":1}")
            .with_local_reader_name("NFC")
            .routed_like(&cmd);
        assert_eq!(resp.server_node_id.as_deref(), Some("srv"));
        assert_eq!(resp.remote_reader_name.as_deref(), Some("remote"));
        assert_eq!(resp.local_reader_name.as_deref(), Some("NFC"));
        assert_eq!(resp.action, "RESP");
    }

    #[test]
    fn test_decode_server_message() {
        let json = r#"{"apiLevel":3,"sessionId":"s","action":"END_REMOTE_SERVICE",
            "clientNodeId":"c","serverNodeId":"srv","body":"{}","unknown":true}"#;
        let envelope: Envelope = serde_json::from_str(json).unwrap();
        assert!(envelope.is_end_of_service());
        assert_eq!(envelope.local_reader_name, None);
    }
}
