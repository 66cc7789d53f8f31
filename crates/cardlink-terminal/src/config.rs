//! Terminal and reader configuration
//!
//! Both types deserialize from the `[terminal]` and `[reader]` tables of the
//! CLI configuration file.

use serde::{Deserialize, Serialize};

/// Configuration of a [`Terminal`](crate::Terminal)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminalConfig {
    /// Identifier of this client node, sent as `clientNodeId`
    #[serde(default = "default_client_node_id")]
    pub client_node_id: String,
    /// Overrides the reader's own name as `localReaderName`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_reader_name: Option<String>,
    /// Reported as `isReaderContactless`
    #[serde(default = "default_contactless")]
    pub contactless: bool,
    /// Upper bound on physical exchanges for one logical APDU (61XX / 6CXX chaining)
    #[serde(default = "default_max_chained_exchanges")]
    pub max_chained_exchanges: usize,
}

fn default_client_node_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn default_contactless() -> bool {
    true
}

fn default_max_chained_exchanges() -> usize {
    32
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            client_node_id: default_client_node_id(),
            local_reader_name: None,
            contactless: default_contactless(),
            max_chained_exchanges: default_max_chained_exchanges(),
        }
    }
}

impl TerminalConfig {
    pub fn new(client_node_id: impl Into<String>) -> Self {
        Self {
            client_node_id: client_node_id.into(),
            ..Default::default()
        }
    }
}

// =============================================================================
// Reader Configuration
// =============================================================================

/// Reader configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ReaderConfig {
    /// PC/SC reader (requires the `pcsc` feature)
    Pcsc(PcscConfig),
    /// Scripted in-memory card
    Mock(MockConfig),
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self::Mock(MockConfig::default())
    }
}

/// PC/SC reader configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PcscConfig {
    /// Reader to use; the first reader found when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reader_name: Option<String>,
    #[serde(default)]
    pub share_mode: ShareMode,
}

/// Sharing mode for card connections
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShareMode {
    Exclusive,
    #[default]
    Shared,
    Direct,
}

/// Mock reader configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MockConfig {
    #[serde(default = "default_mock_name")]
    pub name: String,
    /// ATR reported by the simulated card, hex
    #[serde(default = "default_power_on_data")]
    pub power_on_data: String,
    /// Scripted command/response pairs, hex
    #[serde(default)]
    pub responses: Vec<MockResponse>,
}

fn default_mock_name() -> String {
    "MockReader".to_string()
}

fn default_power_on_data() -> String {
    "3B8880010000000000718100F9".to_string()
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            name: default_mock_name(),
            power_on_data: default_power_on_data(),
            responses: Vec::new(),
        }
    }
}

/// One scripted exchange; `command` matches exactly or as a prefix
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MockResponse {
    pub command: String,
    pub response: String,
}
