//! Terminal facade

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, instrument};

use cardlink_core::{
    value_text, CardFoundCallback, CardSelectionScenario, LocalReader, NetworkClient, Outcome,
    TerminalError, TerminalResult,
};

use crate::config::TerminalConfig;
use crate::exchange::ApduExchange;
use crate::session::{ChannelGuard, SessionDriver};

/// Executes remote services through a local reader
///
/// A terminal owns its reader; one session runs at a time (`&mut self`).
///
/// # Example
///
/// ```ignore
/// let mut terminal = Terminal::new(reader, network, TerminalConfig::new("kiosk-1"));
/// if terminal.wait_for_card().await? {
///     match terminal.execute_remote_service("READ_CONTRACTS", None).await {
///         Outcome::Success(output) => println!("{:?}", output),
///         Outcome::Failure { status, message, .. } => eprintln!("{}: {}", status, message),
///     }
/// }
/// ```
pub struct Terminal {
    reader: Box<dyn LocalReader>,
    network: Arc<dyn NetworkClient>,
    config: TerminalConfig,
    scenario: Option<CardSelectionScenario>,
}

impl Terminal {
    pub fn new(
        reader: Box<dyn LocalReader>,
        network: Arc<dyn NetworkClient>,
        config: TerminalConfig,
    ) -> Self {
        Self {
            reader,
            network,
            config,
            scenario: None,
        }
    }

    /// Builder form of [`Terminal::set_card_selection_scenario`]
    pub fn with_card_selection_scenario(mut self, json: &str) -> Self {
        self.set_card_selection_scenario(json);
        self
    }

    /// Configure the selection run before every remote service
    ///
    /// An empty string clears the scenario. A scenario that fails to parse is
    /// logged and leaves the terminal without one.
    pub fn set_card_selection_scenario(&mut self, json: &str) {
        if json.trim().is_empty() {
            self.scenario = None;
            return;
        }
        match CardSelectionScenario::from_json(json) {
            Ok(scenario) => self.scenario = Some(scenario),
            Err(e) => {
                error!(error = %e, "Ignoring card selection scenario");
                self.scenario = None;
            }
        }
    }

    pub fn card_selection_scenario(&self) -> Option<&CardSelectionScenario> {
        self.scenario.as_ref()
    }

    pub fn config(&self) -> &TerminalConfig {
        &self.config
    }

    pub fn set_scan_message(&mut self, message: &str) {
        self.reader.set_scan_message(message);
    }

    /// Wait until a card is present
    pub async fn wait_for_card(&mut self) -> TerminalResult<bool> {
        Ok(self.reader.wait_for_card_present().await?)
    }

    /// Start background card detection
    pub fn wait_for_card_with(&mut self, on_card_found: CardFoundCallback) -> TerminalResult<()> {
        Ok(self.reader.start_card_detection(on_card_found)?)
    }

    /// Release the reader; the terminal must not be used afterwards
    pub fn release(&mut self) {
        self.reader.release();
    }

    /// Execute a remote service
    ///
    /// `input` is a JSON document passed to the server as `inputData`. The
    /// server's `outputData` comes back as text: a JSON string unquoted, any
    /// other value as JSON.
    #[instrument(skip(self, input), fields(session_id = tracing::field::Empty))]
    pub async fn execute_remote_service(
        &mut self,
        service_id: &str,
        input: Option<&str>,
    ) -> Outcome<String> {
        let input_data = match input.map(serde_json::from_str::<Value>).transpose() {
            Ok(input_data) => input_data,
            Err(e) => {
                let err = TerminalError::Internal(format!("Invalid input data: {}", e));
                return Outcome::failure(&err, None);
            }
        };
        self.run_session(service_id, input_data).await.map(value_text)
    }

    /// Execute a remote service with typed input and output
    ///
    /// An output that does not decode as `O` is an internal error. A failure
    /// carries the server's output only when it decodes.
    #[instrument(skip(self, input), fields(session_id = tracing::field::Empty))]
    pub async fn execute_remote_service_typed<I, O>(
        &mut self,
        service_id: &str,
        input: Option<&I>,
    ) -> Outcome<O>
    where
        I: Serialize + Sync + ?Sized,
        O: DeserializeOwned,
    {
        let input_data = match input.map(serde_json::to_value).transpose() {
            Ok(input_data) => input_data,
            Err(e) => {
                let err = TerminalError::Internal(format!("Invalid input data: {}", e));
                return Outcome::failure(&err, None);
            }
        };

        match self.run_session(service_id, input_data).await {
            Outcome::Success(None) => Outcome::Success(None),
            Outcome::Success(Some(output)) => match serde_json::from_value(output) {
                Ok(output) => Outcome::Success(Some(output)),
                Err(e) => {
                    let err = TerminalError::Internal(format!("Invalid output data: {}", e));
                    Outcome::failure(&err, None)
                }
            },
            Outcome::Failure {
                status,
                message,
                data,
            } => Outcome::Failure {
                status,
                message,
                data: data.and_then(|output| serde_json::from_value(output).ok()),
            },
        }
    }

    async fn run_session(&mut self, service_id: &str, input_data: Option<Value>) -> Outcome<Value> {
        let local_reader_name = self
            .config
            .local_reader_name
            .clone()
            .unwrap_or_else(|| self.reader.name());

        let mut reader = ChannelGuard::new(self.reader.as_mut());
        let exchange = ApduExchange::new(&mut *reader, self.config.max_chained_exchanges);
        let driver = SessionDriver::new(
            exchange,
            self.network.as_ref(),
            &self.config,
            local_reader_name,
        );

        tracing::Span::current().record("session_id", driver.context().session_id());
        debug!(service_id, "Starting remote service");

        driver
            .execute(service_id, input_data, self.scenario.as_ref())
            .await
    }
}
