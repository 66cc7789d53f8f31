//! Wire compatibility tests against messages shaped like a live server's

use cardlink_core::protocol::{action, service};
use cardlink_core::*;
use pretty_assertions::assert_eq;

#[test]
fn test_envelope_roundtrip_populated() {
    let envelope = Envelope {
        api_level: 3,
        session_id: "6f1d".into(),
        action: action::RESP.into(),
        client_node_id: "terminal-1".into(),
        server_node_id: Some("server-a".into()),
        local_reader_name: Some("NFC".into()),
        remote_reader_name: Some("remote-7".into()),
        body: r#"{"coreApiLevel":2,"service":"IS_CARD_PRESENT","result":true}"#.into(),
    };

    let json = serde_json::to_string(&envelope).unwrap();
    let decoded: Envelope = serde_json::from_str(&json).unwrap();
    assert_eq!(decoded, envelope);
}

#[test]
fn test_envelope_roundtrip_unset_fields() {
    let envelope = Envelope::new("6f1d", action::EXECUTE_REMOTE_SERVICE, "terminal-1", "{}");

    let json = serde_json::to_string(&envelope).unwrap();
    assert!(!json.contains("serverNodeId"));
    assert!(!json.contains("null"));

    let decoded: Envelope = serde_json::from_str(&json).unwrap();
    assert_eq!(decoded.server_node_id, None);
    assert_eq!(decoded.local_reader_name, None);
    assert_eq!(decoded.remote_reader_name, None);
    assert_eq!(decoded, envelope);
}

#[test]
fn test_card_request_command_body() {
    let body = r#"{
        "coreApiLevel": 2,
        "service": "TRANSMIT_CARD_REQUEST",
        "parameters": {
            "cardRequest": {
                "apduRequests": [
                    {"apdu": "00B2014400", "successfulStatusWords": ["9000"], "info": "Read record"},
                    {"apdu": "00B2024400", "successfulStatusWords": ["9000", "6A83"]}
                ],
                "stopOnUnsuccessfulStatusWord": true
            },
            "channelControl": "CLOSE_AFTER"
        }
    }"#;

    let cmd: CmdBody = decode_body(body).unwrap();
    assert_eq!(cmd.service, service::TRANSMIT_CARD_REQUEST);

    let decoded: TransmitCardRequestCmdBody = decode_body(body).unwrap();
    let request = &decoded.parameters.card_request;
    assert_eq!(decoded.parameters.channel_control, ChannelControl::CloseAfter);
    assert_eq!(request.apdu_requests.len(), 2);
    assert_eq!(request.apdu_requests[0].info.as_deref(), Some("Read record"));
    assert_eq!(
        request.apdu_requests[1].successful_status_words,
        vec![StatusWord::SUCCESS, StatusWord::new(0x6A, 0x83)]
    );
}

#[test]
fn test_selection_reply_body() {
    let select = ApduResponse::from_bytes(hex::decode("6F0A84089000").unwrap()).unwrap();
    let reply = TransmitCardSelectionRequestsRespBody::ok(
        service::TRANSMIT_CARD_SELECTION_REQUESTS,
        vec![CardSelectionResponse {
            has_matched: true,
            power_on_data: Some("3B8F8001".into()),
            select_application_response: Some(select),
            card_response: None,
        }],
    );

    let json: serde_json::Value = serde_json::from_str(&encode_body(&reply).unwrap()).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "coreApiLevel": 2,
            "service": "TRANSMIT_CARD_SELECTION_REQUESTS",
            "result": [{
                "hasMatched": true,
                "powerOnData": "3B8F8001",
                "selectApplicationResponse": {"apdu": "6F0A84089000", "statusWord": "9000"}
            }]
        })
    );
}

#[test]
fn test_end_of_service_output() {
    let body: EndRemoteServiceBody = decode_body(r#"{"outputData":"42"}"#).unwrap();
    assert_eq!(output_text(body.output_data), Some("42".to_string()));

    let body: EndRemoteServiceBody = decode_body("{}").unwrap();
    assert_eq!(output_text(body.output_data), None);
}
