//! Bodies sent by the server and by the client to start a service

use serde::{Deserialize, Serialize};

use crate::apdu::StatusWord;
use crate::codec::{hex_bytes, hex_bytes_opt};
use crate::protocol;

use super::ProcessedCardSelectionScenario;

fn default_core_api_level() -> i32 {
    protocol::CORE_API_LEVEL
}

/// What to do with the physical channel once a request completes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChannelControl {
    KeepOpen,
    CloseAfter,
}

/// Stop at the first matching selector or run them all
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MultiSelectionProcessing {
    FirstMatch,
    ProcessAll,
}

/// Which occurrence of a matching application SELECT targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileOccurrence {
    First,
    Last,
    Next,
    Previous,
}

/// Control information SELECT asks the card to return
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileControlInformation {
    Fci,
    Fcp,
    Fmd,
    NoResponse,
}

/// First body of a session, sent with `EXECUTE_REMOTE_SERVICE`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteRemoteServiceBody {
    #[serde(default = "default_core_api_level")]
    pub core_api_level: i32,
    pub service_id: String,
    #[serde(default = "default_true")]
    pub is_reader_contactless: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_card_content: Option<ProcessedCardSelectionScenario>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_card_content_class_name: Option<String>,
}

fn default_true() -> bool {
    true
}

impl ExecuteRemoteServiceBody {
    pub fn new(service_id: impl Into<String>, is_reader_contactless: bool) -> Self {
        Self {
            core_api_level: protocol::CORE_API_LEVEL,
            service_id: service_id.into(),
            is_reader_contactless,
            input_data: None,
            initial_card_content: None,
            initial_card_content_class_name: None,
        }
    }
}

/// Body of an `END_REMOTE_SERVICE` message
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndRemoteServiceBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_data: Option<serde_json::Value>,
}

/// Minimal view of any server command, used to dispatch on `service`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CmdBody {
    #[serde(default = "default_core_api_level")]
    pub core_api_level: i32,
    pub service: String,
}

/// Selects an application on the card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardSelector {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logical_protocol_name: Option<String>,
    /// Carried but never evaluated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_on_data_regex: Option<String>,
    #[serde(default, with = "hex_bytes_opt", skip_serializing_if = "Option::is_none")]
    pub aid: Option<Vec<u8>>,
    pub file_occurrence: FileOccurrence,
    pub file_control_information: FileControlInformation,
}

/// One APDU to send and the status words that count as success for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApduRequest {
    #[serde(with = "hex_bytes")]
    pub apdu: Vec<u8>,
    pub successful_status_words: Vec<StatusWord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
}

/// Ordered APDUs to send to the card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardRequest {
    pub apdu_requests: Vec<ApduRequest>,
    #[serde(default)]
    pub stop_on_unsuccessful_status_word: bool,
}

/// Pairs with a [`CardSelector`]: what counts as a match, and what to send after
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardSelectionRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_request: Option<CardRequest>,
    pub successful_selection_status_words: Vec<StatusWord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransmitCardSelectionRequestsParameters {
    pub multi_selection_processing: MultiSelectionProcessing,
    pub channel_control: ChannelControl,
    pub card_selectors: Vec<CardSelector>,
    pub card_selection_requests: Vec<CardSelectionRequest>,
}

/// `TRANSMIT_CARD_SELECTION_REQUESTS` command body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransmitCardSelectionRequestsCmdBody {
    #[serde(default = "default_core_api_level")]
    pub core_api_level: i32,
    pub parameters: TransmitCardSelectionRequestsParameters,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransmitCardRequestParameters {
    pub card_request: CardRequest,
    pub channel_control: ChannelControl,
}

/// `TRANSMIT_CARD_REQUEST` command body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransmitCardRequestCmdBody {
    #[serde(default = "default_core_api_level")]
    pub core_api_level: i32,
    pub parameters: TransmitCardRequestParameters,
}
