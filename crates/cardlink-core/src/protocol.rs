//! Protocol levels and wire discriminators

/// Envelope protocol level sent in every message
pub const API_LEVEL: i32 = 3;

/// Body protocol level sent in every outbound body
pub const CORE_API_LEVEL: i32 = 2;

/// Class name the server expects next to pre-computed selection results
pub const INITIAL_CARD_CONTENT_CLASS_NAME: &str = "java.util.Properties";

/// Envelope `action` values
pub mod action {
    /// Client to server: start a remote service
    pub const EXECUTE_REMOTE_SERVICE: &str = "EXECUTE_REMOTE_SERVICE";
    /// Client to server: reply to a server-issued command
    pub const RESP: &str = "RESP";
    /// Server to client: the remote service is over
    pub const END_REMOTE_SERVICE: &str = "END_REMOTE_SERVICE";
}

/// `service` discriminators found in server-issued command bodies
pub mod service {
    pub const IS_CARD_PRESENT: &str = "IS_CARD_PRESENT";
    /// Older protocol revision only
    pub const IS_CONTACTLESS: &str = "IS_CONTACTLESS";
    pub const TRANSMIT_CARD_SELECTION_REQUESTS: &str = "TRANSMIT_CARD_SELECTION_REQUESTS";
    pub const TRANSMIT_CARD_REQUEST: &str = "TRANSMIT_CARD_REQUEST";
}
