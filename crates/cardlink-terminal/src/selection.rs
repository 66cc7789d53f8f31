//! Card selection processor

use tracing::debug;

use cardlink_core::apdu;
use cardlink_core::{
    ApduRequest, CardSelectionRequest, CardSelectionResponse, CardSelector, ChannelControl,
    MultiSelectionProcessing, TerminalError, TerminalResult,
};

use crate::exchange::ApduExchange;

/// Responses collected by a selection run, plus the error that stopped it
#[derive(Debug, Default)]
pub struct SelectionOutcome {
    pub responses: Vec<CardSelectionResponse>,
    pub error: Option<TerminalError>,
}

/// Run selection attempts in order under a match policy
///
/// Pairs are taken by index; an unpaired tail is ignored. Iteration stops at
/// the first match under `FIRST_MATCH`, and at the first error under any
/// policy, keeping what was already collected.
pub async fn process_selections(
    exchange: &mut ApduExchange<'_>,
    selectors: &[CardSelector],
    requests: &[CardSelectionRequest],
    policy: MultiSelectionProcessing,
    channel_control: ChannelControl,
) -> SelectionOutcome {
    let mut outcome = SelectionOutcome::default();

    for (index, (selector, request)) in selectors.iter().zip(requests).enumerate() {
        match select_one(exchange, selector, request, channel_control).await {
            Ok(response) => {
                let matched = response.has_matched;
                debug!(index, matched, "Selection attempt done");
                outcome.responses.push(response);
                if matched && policy == MultiSelectionProcessing::FirstMatch {
                    break;
                }
            }
            Err(err) => {
                debug!(index, error = %err, "Selection aborted");
                outcome.error = Some(err);
                break;
            }
        }
    }

    outcome
}

/// One selection attempt
///
/// A selector without an AID sends no SELECT and counts as matched on the
/// card already in the field.
async fn select_one(
    exchange: &mut ApduExchange<'_>,
    selector: &CardSelector,
    request: &CardSelectionRequest,
    channel_control: ChannelControl,
) -> TerminalResult<CardSelectionResponse> {
    exchange.reader().open_physical_channel().await?;

    let (has_matched, select_application_response) = match &selector.aid {
        Some(aid) => {
            let select = ApduRequest {
                apdu: apdu::select_by_name(
                    aid,
                    selector.file_occurrence,
                    selector.file_control_information,
                ),
                successful_status_words: request.successful_selection_status_words.clone(),
                info: Some("Select application".to_string()),
            };
            let response = exchange.transmit(&select).await?;
            let matched = request
                .successful_selection_status_words
                .contains(&response.status_word);
            (matched, Some(response))
        }
        None => (true, None),
    };

    let power_on_data = exchange.reader().power_on_data();

    let card_response = match (&request.card_request, has_matched) {
        (Some(card_request), true) => Some(
            exchange
                .process_card_request(card_request, channel_control)
                .await?,
        ),
        _ => None,
    };

    Ok(CardSelectionResponse {
        has_matched,
        power_on_data: Some(power_on_data),
        select_application_response,
        card_response,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::MockReader;
    use cardlink_core::{
        CardRequest, FileControlInformation, FileOccurrence, ReaderError, StatusCode, StatusWord,
    };
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    const AIDS: [&str; 3] = ["A0000000031010", "A000000291", "A0000004040125"];

    fn selector(aid: &str) -> CardSelector {
        CardSelector {
            logical_protocol_name: None,
            power_on_data_regex: None,
            aid: Some(hex::decode(aid).unwrap()),
            file_occurrence: FileOccurrence::First,
            file_control_information: FileControlInformation::Fci,
        }
    }

    fn request() -> CardSelectionRequest {
        CardSelectionRequest {
            card_request: None,
            successful_selection_status_words: vec![StatusWord::SUCCESS],
        }
    }

    /// Card where only the second application exists
    fn card() -> MockReader {
        let reader = MockReader::new("test").with_power_on_data("3B8F8001");
        reader.add_response(vec![0x00, 0xA4], vec![0x6A, 0x82]);
        let select = apdu::select_by_name(
            &hex::decode(AIDS[1]).unwrap(),
            FileOccurrence::First,
            FileControlInformation::Fci,
        );
        reader.add_response(select, vec![0x6F, 0x00, 0x90, 0x00]);
        reader
    }

    #[rstest]
    #[case(MultiSelectionProcessing::FirstMatch, vec![false, true])]
    #[case(MultiSelectionProcessing::ProcessAll, vec![false, true, false])]
    #[tokio::test]
    async fn test_match_policy(
        #[case] policy: MultiSelectionProcessing,
        #[case] expected: Vec<bool>,
    ) {
        let mut reader = card();
        let selectors: Vec<_> = AIDS.iter().map(|aid| selector(aid)).collect();
        let requests = vec![request(); 3];

        let mut exchange = ApduExchange::new(&mut reader, 8);
        let outcome = process_selections(
            &mut exchange,
            &selectors,
            &requests,
            policy,
            ChannelControl::KeepOpen,
        )
        .await;

        assert!(outcome.error.is_none());
        let matched: Vec<bool> = outcome.responses.iter().map(|r| r.has_matched).collect();
        assert_eq!(matched, expected);
        assert_eq!(outcome.responses[1].power_on_data.as_deref(), Some("3B8F8001"));
    }

    #[tokio::test]
    async fn test_follow_up_request_only_on_match() {
        let mut reader = card();
        reader.add_response(vec![0x00, 0xB2], vec![0x01, 0x90, 0x00]);

        let with_request = CardSelectionRequest {
            card_request: Some(CardRequest {
                apdu_requests: vec![ApduRequest {
                    apdu: hex::decode("00B2010400").unwrap(),
                    successful_status_words: vec![StatusWord::SUCCESS],
                    info: None,
                }],
                stop_on_unsuccessful_status_word: false,
            }),
            ..request()
        };
        let selectors = vec![selector(AIDS[0]), selector(AIDS[1])];
        let requests = vec![with_request.clone(), with_request];

        let mut exchange = ApduExchange::new(&mut reader, 8);
        let outcome = process_selections(
            &mut exchange,
            &selectors,
            &requests,
            MultiSelectionProcessing::FirstMatch,
            ChannelControl::CloseAfter,
        )
        .await;

        assert!(outcome.responses[0].card_response.is_none());
        let card_response = outcome.responses[1].card_response.as_ref().unwrap();
        assert!(!card_response.is_logical_channel_open);
        assert_eq!(card_response.apdu_responses[0].apdu, vec![0x01, 0x90, 0x00]);
    }

    #[tokio::test]
    async fn test_error_keeps_collected_responses() {
        let mut reader = card();
        let handle = reader.clone();
        let selectors: Vec<_> = AIDS.iter().map(|aid| selector(aid)).collect();
        let requests = vec![request(); 3];

        handle.push_response(vec![0x6A, 0x82]);
        handle.push_error(ReaderError::CardIo("Tag lost".into()));

        let mut exchange = ApduExchange::new(&mut reader, 8);
        let outcome = process_selections(
            &mut exchange,
            &selectors,
            &requests,
            MultiSelectionProcessing::ProcessAll,
            ChannelControl::KeepOpen,
        )
        .await;

        assert_eq!(outcome.responses.len(), 1);
        assert_eq!(
            outcome.error.map(|e| e.status()),
            Some(StatusCode::CardCommunicationError)
        );
    }

    #[tokio::test]
    async fn test_selector_without_aid_matches() {
        let mut reader = card();
        let handle = reader.clone();
        let selectors = vec![CardSelector {
            aid: None,
            ..selector(AIDS[0])
        }];

        let mut exchange = ApduExchange::new(&mut reader, 8);
        let outcome = process_selections(
            &mut exchange,
            &selectors,
            &[request()],
            MultiSelectionProcessing::FirstMatch,
            ChannelControl::KeepOpen,
        )
        .await;

        assert!(outcome.responses[0].has_matched);
        assert!(outcome.responses[0].select_application_response.is_none());
        assert!(handle.transmitted().is_empty());
    }

    #[tokio::test]
    async fn test_channel_open_failure() {
        let mut reader = card();
        reader.fail_next_open(ReaderError::ReaderIo("Reader unplugged".into()));

        let mut exchange = ApduExchange::new(&mut reader, 8);
        let outcome = process_selections(
            &mut exchange,
            &[selector(AIDS[0])],
            &[request()],
            MultiSelectionProcessing::FirstMatch,
            ChannelControl::KeepOpen,
        )
        .await;

        assert!(outcome.responses.is_empty());
        assert_eq!(
            outcome.error,
            Some(TerminalError::ReaderCommunication("Reader unplugged".into()))
        );
    }
}
