//! Bodies the terminal replies with

use serde::{Deserialize, Serialize};

use crate::apdu::StatusWord;
use crate::codec::hex_bytes;
use crate::protocol::{self, service};

/// Final response to one logical APDU, status word included in `apdu`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApduResponse {
    #[serde(with = "hex_bytes")]
    pub apdu: Vec<u8>,
    pub status_word: StatusWord,
}

impl ApduResponse {
    /// Wrap a card response; `None` when it is too short to carry a status word
    pub fn from_bytes(apdu: Vec<u8>) -> Option<Self> {
        let status_word = StatusWord::from_response(&apdu)?;
        Some(Self { apdu, status_word })
    }

    /// Response data without the trailing status word
    pub fn data(&self) -> &[u8] {
        &self.apdu[..self.apdu.len().saturating_sub(2)]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardResponse {
    pub is_logical_channel_open: bool,
    pub apdu_responses: Vec<ApduResponse>,
}

/// Result of one selection attempt
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardSelectionResponse {
    pub has_matched: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_on_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub select_application_response: Option<ApduResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_response: Option<CardResponse>,
}

/// Error class reported to the server inside a reply body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ReaderCommunicationError,
    CardCommunicationError,
    CardCommandError,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub code: ErrorCode,
}

impl ReplyError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            code,
        }
    }
}

/// Reply to a server command
///
/// `coreApiLevel` and `service` are always emitted. `result` and `error` are
/// omitted when absent; a selection reply may carry both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceReply<T> {
    pub core_api_level: i32,
    pub service: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ReplyError>,
}

impl<T> ServiceReply<T> {
    pub fn ok(service: impl Into<String>, result: T) -> Self {
        Self {
            core_api_level: protocol::CORE_API_LEVEL,
            service: service.into(),
            result: Some(result),
            error: None,
        }
    }

    pub fn failed(service: impl Into<String>, error: ReplyError) -> Self {
        Self {
            core_api_level: protocol::CORE_API_LEVEL,
            service: service.into(),
            result: None,
            error: Some(error),
        }
    }

    pub fn with_error(mut self, error: Option<ReplyError>) -> Self {
        self.error = error;
        self
    }
}

pub type IsCardPresentRespBody = ServiceReply<bool>;
pub type IsContactlessRespBody = ServiceReply<bool>;
pub type TransmitCardRequestRespBody = ServiceReply<CardResponse>;
pub type TransmitCardSelectionRequestsRespBody = ServiceReply<Vec<CardSelectionResponse>>;

impl IsCardPresentRespBody {
    pub fn present() -> Self {
        Self::ok(service::IS_CARD_PRESENT, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_apdu_response_splits_status_word() {
        let response = ApduResponse::from_bytes(vec![0x01, 0x02, 0x6A, 0x82]).unwrap();
        assert_eq!(response.status_word, StatusWord::new(0x6A, 0x82));
        assert_eq!(response.data(), &[0x01, 0x02]);
        assert!(ApduResponse::from_bytes(vec![0x90]).is_none());
    }

    #[test]
    fn test_card_present_reply() {
        let json = serde_json::to_value(IsCardPresentRespBody::present()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"coreApiLevel": 2, "service": "IS_CARD_PRESENT", "result": true})
        );
    }

    #[test]
    fn test_failed_card_request_reply() {
        let reply = TransmitCardRequestRespBody::failed(
            service::TRANSMIT_CARD_REQUEST,
            ReplyError::new(ErrorCode::CardCommandError, "Unexpected status word: 6A82"),
        );
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "coreApiLevel": 2,
                "service": "TRANSMIT_CARD_REQUEST",
                "error": {"message": "Unexpected status word: 6A82", "code": "CARD_COMMAND_ERROR"}
            })
        );
    }

    #[test]
    fn test_selection_reply_keeps_defaults() {
        let reply = TransmitCardSelectionRequestsRespBody::ok(
            service::TRANSMIT_CARD_SELECTION_REQUESTS,
            vec![CardSelectionResponse::default()],
        );
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["result"], serde_json::json!([{"hasMatched": false}]));
    }
}
