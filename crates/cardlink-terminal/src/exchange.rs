//! APDU exchange engine
//!
//! Turns one logical APDU into as many physical transceives as the card's
//! chaining replies require, and runs card requests (APDU sequences) under a
//! channel-control directive.

use tracing::{debug, trace};

use cardlink_core::apdu::{self, Continuation, StatusWord};
use cardlink_core::{
    ApduRequest, ApduResponse, CardRequest, CardResponse, ChannelControl, LocalReader,
    TerminalError, TerminalResult,
};

/// Sends APDUs through a borrowed reader
pub struct ApduExchange<'r> {
    reader: &'r mut dyn LocalReader,
    max_chained: usize,
}

impl<'r> ApduExchange<'r> {
    /// `max_chained` bounds the physical exchanges per logical APDU
    pub fn new(reader: &'r mut dyn LocalReader, max_chained: usize) -> Self {
        Self {
            reader,
            max_chained: max_chained.max(1),
        }
    }

    pub fn reader(&mut self) -> &mut dyn LocalReader {
        &mut *self.reader
    }

    /// Transmit one logical APDU, following 61XX and 6CXX replies
    ///
    /// Chaining replies are only honored when they carry no data (exactly the
    /// two status bytes). A 6CXX resend reuses the original request's accepted
    /// status words and label.
    pub async fn transmit(&mut self, request: &ApduRequest) -> TerminalResult<ApduResponse> {
        let mut command = request.apdu.clone();

        for exchange in 0..self.max_chained {
            trace!(exchange, command = %hex::encode_upper(&command), info = ?request.info, "Transmit APDU");
            let response = self.reader.transmit_apdu(&command).await?;
            trace!(response = %hex::encode_upper(&response), "Card response");

            let sw = StatusWord::from_response(&response)
                .ok_or_else(|| TerminalError::CardCommunication("No response from card".into()))?;

            if response.len() > 2 {
                return Ok(ApduResponse {
                    apdu: response,
                    status_word: sw,
                });
            }

            command = match Continuation::for_status(sw) {
                Continuation::GetResponse(length) => {
                    debug!(length, "Card has more data, issuing GET RESPONSE");
                    apdu::get_response(length)
                }
                Continuation::CorrectLe(le) => {
                    debug!(le, "Wrong Le, resending with corrected length");
                    apdu::with_le(&request.apdu, le)
                }
                Continuation::Done => {
                    return Ok(ApduResponse {
                        apdu: response,
                        status_word: sw,
                    })
                }
            };
        }

        Err(TerminalError::CardCommunication(format!(
            "Card kept chaining after {} exchanges",
            self.max_chained
        )))
    }

    /// Run every APDU of a card request in order
    ///
    /// A status word outside an APDU's accepted set aborts the request with a
    /// card command error, whatever `stop_on_unsuccessful_status_word` says;
    /// `CLOSE_AFTER` still closes the channel. Reader and card I/O failures
    /// close the physical channel before propagating.
    pub async fn process_card_request(
        &mut self,
        request: &CardRequest,
        channel_control: ChannelControl,
    ) -> TerminalResult<CardResponse> {
        let mut apdu_responses = Vec::with_capacity(request.apdu_requests.len());

        for apdu_request in &request.apdu_requests {
            let response = match self.transmit(apdu_request).await {
                Ok(response) => response,
                Err(err) => {
                    if err.is_io() {
                        self.close_channel();
                    }
                    return Err(err);
                }
            };

            if !apdu_request
                .successful_status_words
                .contains(&response.status_word)
            {
                if channel_control == ChannelControl::CloseAfter {
                    self.close_channel();
                }
                return Err(TerminalError::CardCommand(format!(
                    "Unexpected status word: {}",
                    response.status_word
                )));
            }
            apdu_responses.push(response);
        }

        let is_logical_channel_open = match channel_control {
            ChannelControl::CloseAfter => {
                self.reader.close_physical_channel()?;
                false
            }
            ChannelControl::KeepOpen => true,
        };

        Ok(CardResponse {
            is_logical_channel_open,
            apdu_responses,
        })
    }

    /// Best-effort close after a failure; the original error takes precedence
    fn close_channel(&mut self) {
        if let Err(e) = self.reader.close_physical_channel() {
            debug!(error = %e, "Failed to close channel after error");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::MockReader;
    use cardlink_core::{ReaderError, StatusCode};
    use pretty_assertions::assert_eq;

    fn apdu_request(apdu: &str, accepted: &[&str]) -> ApduRequest {
        ApduRequest {
            apdu: hex::decode(apdu).unwrap(),
            successful_status_words: accepted.iter().map(|sw| sw.parse().unwrap()).collect(),
            info: None,
        }
    }

    async fn open_reader() -> MockReader {
        let mut reader = MockReader::new("test");
        reader.open_physical_channel().await.unwrap();
        reader
    }

    #[tokio::test]
    async fn test_get_response_chaining() {
        let mut reader = open_reader().await;
        reader.add_response(hex::decode("00B2010400").unwrap(), vec![0x61, 0x03]);
        reader.add_response(hex::decode("00C0000003").unwrap(), vec![0x0A, 0x0B, 0x0C, 0x90, 0x00]);

        let handle = reader.clone();
        let mut exchange = ApduExchange::new(&mut reader, 8);
        let response = exchange
            .transmit(&apdu_request("00B2010400", &["9000"]))
            .await
            .unwrap();

        assert_eq!(response.apdu, vec![0x0A, 0x0B, 0x0C, 0x90, 0x00]);
        assert_eq!(response.status_word, StatusWord::SUCCESS);
        assert_eq!(
            handle.transmitted(),
            vec![hex::decode("00B2010400").unwrap(), hex::decode("00C0000003").unwrap()]
        );
    }

    #[tokio::test]
    async fn test_wrong_le_resend() {
        let mut reader = open_reader().await;
        reader.add_response(hex::decode("00B2010400").unwrap(), vec![0x6C, 0x1A]);
        reader.add_response(hex::decode("00B201041A").unwrap(), vec![0x55, 0x90, 0x00]);

        let handle = reader.clone();
        let mut exchange = ApduExchange::new(&mut reader, 8);
        let response = exchange
            .transmit(&apdu_request("00B2010400", &["9000"]))
            .await
            .unwrap();

        assert_eq!(response.apdu, vec![0x55, 0x90, 0x00]);
        assert_eq!(handle.transmitted()[1], hex::decode("00B201041A").unwrap());
    }

    #[tokio::test]
    async fn test_chaining_status_with_data_is_final() {
        let mut reader = open_reader().await;
        reader.push_response(vec![0x01, 0x61, 0x10]);

        let mut exchange = ApduExchange::new(&mut reader, 8);
        let response = exchange
            .transmit(&apdu_request("00B2010400", &["9000"]))
            .await
            .unwrap();
        assert_eq!(response.status_word, StatusWord::new(0x61, 0x10));
    }

    #[tokio::test]
    async fn test_short_response_is_card_communication_error() {
        for short in [vec![], vec![0x90]] {
            let mut reader = open_reader().await;
            reader.push_response(short);

            let mut exchange = ApduExchange::new(&mut reader, 8);
            let err = exchange
                .transmit(&apdu_request("00B2010400", &["9000"]))
                .await
                .unwrap_err();
            assert_eq!(err, TerminalError::CardCommunication("No response from card".into()));
        }
    }

    #[tokio::test]
    async fn test_endless_chaining_is_bounded() {
        let mut reader = open_reader().await;
        reader.add_response(vec![0x00], vec![0x61, 0x01]);

        let handle = reader.clone();
        let mut exchange = ApduExchange::new(&mut reader, 4);
        let err = exchange
            .transmit(&apdu_request("00B2010400", &["9000"]))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::CardCommunicationError);
        assert_eq!(handle.transmitted().len(), 4);
    }

    #[tokio::test]
    async fn test_card_request_close_after() {
        let mut reader = open_reader().await;
        reader.add_response(vec![0x00, 0xB2], vec![0x01, 0x90, 0x00]);

        let handle = reader.clone();
        let request = CardRequest {
            apdu_requests: vec![
                apdu_request("00B2010400", &["9000"]),
                apdu_request("00B2020400", &["9000"]),
            ],
            stop_on_unsuccessful_status_word: false,
        };

        let mut exchange = ApduExchange::new(&mut reader, 8);
        let response = exchange
            .process_card_request(&request, ChannelControl::CloseAfter)
            .await
            .unwrap();

        assert!(!response.is_logical_channel_open);
        assert_eq!(response.apdu_responses.len(), 2);
        assert!(!handle.is_channel_open());
    }

    #[tokio::test]
    async fn test_card_request_keep_open() {
        let mut reader = open_reader().await;
        reader.add_response(vec![0x00, 0xB2], vec![0x90, 0x00]);

        let handle = reader.clone();
        let request = CardRequest {
            apdu_requests: vec![apdu_request("00B2010400", &["9000"])],
            stop_on_unsuccessful_status_word: true,
        };

        let mut exchange = ApduExchange::new(&mut reader, 8);
        let response = exchange
            .process_card_request(&request, ChannelControl::KeepOpen)
            .await
            .unwrap();

        assert!(response.is_logical_channel_open);
        assert!(handle.is_channel_open());
    }

    #[tokio::test]
    async fn test_unexpected_status_word_aborts_request() {
        let mut reader = open_reader().await;
        reader.add_response(vec![0x00, 0xB2], vec![0x6A, 0x82]);

        let handle = reader.clone();
        let request = CardRequest {
            apdu_requests: vec![
                apdu_request("00B2010400", &["9000"]),
                apdu_request("00B2020400", &["9000"]),
            ],
            stop_on_unsuccessful_status_word: false,
        };

        let mut exchange = ApduExchange::new(&mut reader, 8);
        let err = exchange
            .process_card_request(&request, ChannelControl::CloseAfter)
            .await
            .unwrap_err();

        assert_eq!(err, TerminalError::CardCommand("Unexpected status word: 6A82".into()));
        assert_eq!(handle.transmitted().len(), 1);
        assert!(!handle.is_channel_open());

        let mut reader = handle.clone();
        reader.open_physical_channel().await.unwrap();
        let mut exchange = ApduExchange::new(&mut reader, 8);
        exchange
            .process_card_request(&request, ChannelControl::KeepOpen)
            .await
            .unwrap_err();
        assert!(handle.is_channel_open());
    }

    #[tokio::test]
    async fn test_io_failure_closes_channel() {
        let mut reader = open_reader().await;
        reader.push_error(ReaderError::CardIo("Tag lost".into()));

        let handle = reader.clone();
        let request = CardRequest {
            apdu_requests: vec![apdu_request("00B2010400", &["9000"])],
            stop_on_unsuccessful_status_word: false,
        };

        let mut exchange = ApduExchange::new(&mut reader, 8);
        let err = exchange
            .process_card_request(&request, ChannelControl::KeepOpen)
            .await
            .unwrap_err();

        assert_eq!(err, TerminalError::CardCommunication("Tag lost".into()));
        assert!(!handle.is_channel_open());
        assert_eq!(handle.close_count(), 1);
    }
}
