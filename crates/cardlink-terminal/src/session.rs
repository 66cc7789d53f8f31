//! Session driver: one remote service execution, start to finish

use std::ops::{Deref, DerefMut};

use serde_json::Value;
use tracing::{debug, warn};

use cardlink_core::protocol::{self, action, service};
use cardlink_core::{
    decode_body, encode_body, CardSelectionResponse, CardSelectionScenario, CmdBody,
    EndRemoteServiceBody, Envelope, ExecuteRemoteServiceBody, IsCardPresentRespBody,
    IsContactlessRespBody, LocalReader, NetworkClient, Outcome, ProcessedCardSelectionScenario,
    ReplyError, TerminalError, TerminalResult, TransmitCardRequestCmdBody,
    TransmitCardRequestRespBody, TransmitCardSelectionRequestsCmdBody,
    TransmitCardSelectionRequestsRespBody,
};

use crate::config::TerminalConfig;
use crate::exchange::ApduExchange;
use crate::selection::process_selections;

/// Per-call session state
///
/// Holds the session id and the first card or reader error raised while
/// executing server commands. Created fresh for every execution.
#[derive(Debug)]
pub struct SessionContext {
    session_id: String,
    first_error: Option<TerminalError>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            first_error: None,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Keep `error` as the root cause unless one is already recorded
    pub fn record(&mut self, error: TerminalError) {
        match &self.first_error {
            Some(first) => debug!(error = %error, root_cause = %first, "Root cause already recorded"),
            None => {
                warn!(error = %error, "Recording session root cause");
                self.first_error = Some(error);
            }
        }
    }

    pub fn first_error(&self) -> Option<&TerminalError> {
        self.first_error.as_ref()
    }

    /// Final outcome: a recorded root cause wins over both a clean close and a
    /// later error
    pub fn resolve<T>(self, result: TerminalResult<Option<T>>) -> Outcome<T> {
        match (self.first_error, result) {
            (Some(root), Ok(data)) => Outcome::failure(&root, data),
            (Some(root), Err(_)) => Outcome::failure(&root, None),
            (None, Ok(data)) => Outcome::Success(data),
            (None, Err(err)) => Outcome::failure(&err, None),
        }
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Closes the physical channel when dropped
///
/// Runs on every exit path of a session, including when the session future
/// is dropped while suspended.
pub struct ChannelGuard<'r> {
    reader: &'r mut dyn LocalReader,
}

impl<'r> ChannelGuard<'r> {
    pub fn new(reader: &'r mut dyn LocalReader) -> Self {
        Self { reader }
    }
}

impl<'r> Deref for ChannelGuard<'r> {
    type Target = dyn LocalReader + 'r;

    fn deref(&self) -> &Self::Target {
        &*self.reader
    }
}

impl<'r> DerefMut for ChannelGuard<'r> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.reader
    }
}

impl Drop for ChannelGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.reader.close_physical_channel() {
            warn!(error = %e, "Failed to close physical channel");
        }
    }
}

/// Drives the message loop of one session
pub struct SessionDriver<'s, 'r> {
    exchange: ApduExchange<'r>,
    network: &'s dyn NetworkClient,
    config: &'s TerminalConfig,
    context: SessionContext,
    local_reader_name: String,
}

impl<'s, 'r> SessionDriver<'s, 'r> {
    pub fn new(
        exchange: ApduExchange<'r>,
        network: &'s dyn NetworkClient,
        config: &'s TerminalConfig,
        local_reader_name: String,
    ) -> Self {
        Self {
            exchange,
            network,
            config,
            context: SessionContext::new(),
            local_reader_name,
        }
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    /// Run the session and resolve its outcome
    pub async fn execute(
        mut self,
        service_id: &str,
        input_data: Option<Value>,
        scenario: Option<&CardSelectionScenario>,
    ) -> Outcome<Value> {
        let result = self.run(service_id, input_data, scenario).await;
        if let Err(e) = &result {
            debug!(error = %e, "Session ended with error");
        }
        self.context.resolve(result)
    }

    async fn run(
        &mut self,
        service_id: &str,
        input_data: Option<Value>,
        scenario: Option<&CardSelectionScenario>,
    ) -> TerminalResult<Option<Value>> {
        let initial_content = match scenario {
            Some(scenario) => self.preselect(scenario).await,
            None => Vec::new(),
        };

        let mut body = ExecuteRemoteServiceBody::new(service_id, self.config.contactless);
        body.input_data = input_data;
        if !initial_content.is_empty() {
            body.initial_card_content = Some(ProcessedCardSelectionScenario {
                processed_card_selection_scenario_json_string: encode_body(&initial_content)?,
            });
            body.initial_card_content_class_name =
                Some(protocol::INITIAL_CARD_CONTENT_CLASS_NAME.to_string());
        }

        let request = self.envelope(action::EXECUTE_REMOTE_SERVICE, encode_body(&body)?);
        let mut response = self.send(&request).await?;

        while !response.is_end_of_service() {
            debug!(action = %response.action, "Processing server action");
            let reply_body = self.execute_command(&response.body).await?;
            let reply = self.envelope(action::RESP, reply_body).routed_like(&response);
            response = self.send(&reply).await?;
        }

        let end: EndRemoteServiceBody = decode_body(&response.body)?;
        Ok(end.output_data.filter(|v| !v.is_null()))
    }

    fn envelope(&self, action: &str, body: String) -> Envelope {
        Envelope::new(
            self.context.session_id(),
            action,
            &self.config.client_node_id,
            body,
        )
        .with_local_reader_name(&self.local_reader_name)
    }

    async fn send(&self, message: &Envelope) -> TerminalResult<Envelope> {
        Ok(self.network.send_request(message).await?)
    }

    /// Selection scenario run before the first message
    async fn preselect(&mut self, scenario: &CardSelectionScenario) -> Vec<CardSelectionResponse> {
        let requests = scenario.selection_requests();
        let outcome = process_selections(
            &mut self.exchange,
            &scenario.card_selectors,
            &requests,
            scenario.multi_selection_processing,
            scenario.channel_control,
        )
        .await;
        if let Some(err) = outcome.error {
            self.context.record(err);
        }
        outcome.responses
    }

    /// Execute one server command and encode the reply body
    async fn execute_command(&mut self, body: &str) -> TerminalResult<String> {
        let command: CmdBody = decode_body(body)?;
        debug!(service = %command.service, "Executing service");

        let reply = match command.service.as_str() {
            service::IS_CARD_PRESENT => encode_body(&IsCardPresentRespBody::present())?,
            service::IS_CONTACTLESS => encode_body(&IsContactlessRespBody::ok(
                service::IS_CONTACTLESS,
                self.config.contactless,
            ))?,
            service::TRANSMIT_CARD_SELECTION_REQUESTS => {
                self.transmit_card_selection_requests(body).await?
            }
            service::TRANSMIT_CARD_REQUEST => self.transmit_card_request(body).await?,
            other => {
                return Err(TerminalError::Internal(format!("Unknown request: {}", other)));
            }
        };
        Ok(reply)
    }

    async fn transmit_card_request(&mut self, body: &str) -> TerminalResult<String> {
        let command: TransmitCardRequestCmdBody = decode_body(body)?;
        let params = &command.parameters;

        let reply = match self
            .exchange
            .process_card_request(&params.card_request, params.channel_control)
            .await
        {
            Ok(response) => TransmitCardRequestRespBody::ok(service::TRANSMIT_CARD_REQUEST, response),
            Err(err) => TransmitCardRequestRespBody::failed(
                service::TRANSMIT_CARD_REQUEST,
                self.card_failure(err)?,
            ),
        };
        Ok(encode_body(&reply)?)
    }

    async fn transmit_card_selection_requests(&mut self, body: &str) -> TerminalResult<String> {
        let command: TransmitCardSelectionRequestsCmdBody = decode_body(body)?;
        let params = &command.parameters;

        if params.card_selectors.len() != params.card_selection_requests.len() {
            return Err(TerminalError::Internal(format!(
                "{} card selectors for {} card selection requests",
                params.card_selectors.len(),
                params.card_selection_requests.len()
            )));
        }

        let outcome = process_selections(
            &mut self.exchange,
            &params.card_selectors,
            &params.card_selection_requests,
            params.multi_selection_processing,
            params.channel_control,
        )
        .await;

        let error = outcome.error.map(|e| self.card_failure(e)).transpose()?;
        let reply = TransmitCardSelectionRequestsRespBody::ok(
            service::TRANSMIT_CARD_SELECTION_REQUESTS,
            outcome.responses,
        )
        .with_error(error);
        Ok(encode_body(&reply)?)
    }

    /// Record a card-side failure and turn it into a reply error
    ///
    /// Errors the server has no code for abort the session instead.
    fn card_failure(&mut self, err: TerminalError) -> TerminalResult<ReplyError> {
        let reply = err.to_reply_error().ok_or_else(|| err.clone())?;
        self.context.record(err);
        Ok(reply)
    }
}
