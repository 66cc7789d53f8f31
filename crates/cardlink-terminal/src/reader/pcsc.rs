//! PC/SC reader adapter
//!
//! The PC/SC API is blocking. Presence waits run on the blocking pool (or a
//! dedicated thread for background detection) and are interrupted through
//! `Context::cancel` on release.

use std::ffi::{CStr, CString};
use std::fmt;

use async_trait::async_trait;
use pcsc::{Attribute, Card, Context, Disposition, Protocols, ReaderState, Scope, State};
use tracing::{debug, trace, warn};

use cardlink_core::{CardFoundCallback, LocalReader, ReaderError};

use crate::config::{PcscConfig, ShareMode};

impl From<ShareMode> for pcsc::ShareMode {
    fn from(mode: ShareMode) -> Self {
        match mode {
            ShareMode::Exclusive => Self::Exclusive,
            ShareMode::Shared => Self::Shared,
            ShareMode::Direct => Self::Direct,
        }
    }
}

fn map_error(err: pcsc::Error) -> ReaderError {
    match err {
        pcsc::Error::NoSmartcard
        | pcsc::Error::RemovedCard
        | pcsc::Error::ResetCard
        | pcsc::Error::UnpoweredCard
        | pcsc::Error::UnresponsiveCard => ReaderError::CardIo(err.to_string()),
        _ => ReaderError::ReaderIo(err.to_string()),
    }
}

/// Names of the readers currently attached
pub fn list_readers() -> Result<Vec<String>, ReaderError> {
    let context = Context::establish(Scope::User).map_err(map_error)?;
    let readers = context.list_readers_owned().map_err(map_error)?;
    Ok(readers
        .into_iter()
        .map(|name| name.to_string_lossy().into_owned())
        .collect())
}

/// Block until a card is present; `false` when the wait was cancelled or
/// the reader went away
fn wait_for_presence(context: &Context, reader: &CStr) -> Result<bool, ReaderError> {
    let mut states = [ReaderState::new(reader.to_owned(), State::UNAWARE)];
    loop {
        match context.get_status_change(None, &mut states) {
            Ok(()) => {}
            Err(pcsc::Error::Cancelled) => return Ok(false),
            Err(e) => return Err(map_error(e)),
        }
        let event = states[0].event_state();
        if event.contains(State::PRESENT) && !event.contains(State::MUTE) {
            return Ok(true);
        }
        if event.intersects(State::UNAVAILABLE | State::UNKNOWN | State::IGNORE) {
            return Ok(false);
        }
        states[0].sync_current_state();
    }
}

/// Reader backed by the platform PC/SC service
pub struct PcscReader {
    context: Context,
    reader_name: CString,
    share_mode: pcsc::ShareMode,
    card: Option<Card>,
    scan_message: String,
}

impl fmt::Debug for PcscReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PcscReader")
            .field("reader_name", &self.reader_name)
            .field("has_card", &self.card.is_some())
            .finish()
    }
}

impl PcscReader {
    /// Open the configured reader, or the first one attached
    pub fn new(config: &PcscConfig) -> Result<Self, ReaderError> {
        let context = Context::establish(Scope::User).map_err(map_error)?;

        let reader_name = match &config.reader_name {
            Some(name) => CString::new(name.as_str())
                .map_err(|_| ReaderError::ReaderIo(format!("Invalid reader name: {}", name)))?,
            None => context
                .list_readers_owned()
                .map_err(map_error)?
                .into_iter()
                .next()
                .ok_or_else(|| ReaderError::ReaderIo("No readers available".to_string()))?,
        };
        debug!(reader = ?reader_name, "Using PC/SC reader");

        Ok(Self {
            context,
            reader_name,
            share_mode: config.share_mode.into(),
            card: None,
            scan_message: String::new(),
        })
    }

    fn disconnect(&mut self) -> Result<(), ReaderError> {
        if let Some(card) = self.card.take() {
            card.disconnect(Disposition::LeaveCard)
                .map_err(|(_, e)| map_error(e))?;
        }
        Ok(())
    }
}

#[async_trait]
impl LocalReader for PcscReader {
    fn name(&self) -> String {
        self.reader_name.to_string_lossy().into_owned()
    }

    fn set_scan_message(&mut self, message: &str) {
        // Desktop readers have no display; keep it for logging
        self.scan_message = message.to_string();
    }

    async fn wait_for_card_present(&mut self) -> Result<bool, ReaderError> {
        debug!(message = %self.scan_message, "Waiting for card");
        let context = self.context.clone();
        let reader = self.reader_name.clone();
        tokio::task::spawn_blocking(move || wait_for_presence(&context, &reader))
            .await
            .map_err(|e| ReaderError::ReaderIo(format!("Card wait aborted: {}", e)))?
    }

    fn start_card_detection(&mut self, on_card_found: CardFoundCallback) -> Result<(), ReaderError> {
        debug!(message = %self.scan_message, "Starting card detection");
        let context = self.context.clone();
        let reader = self.reader_name.clone();
        std::thread::Builder::new()
            .name("pcsc-detection".to_string())
            .spawn(move || match wait_for_presence(&context, &reader) {
                Ok(true) => on_card_found(),
                Ok(false) => debug!("Card detection stopped"),
                Err(e) => warn!(error = %e, "Card detection failed"),
            })
            .map_err(|e| ReaderError::ReaderIo(format!("Failed to start detection: {}", e)))?;
        Ok(())
    }

    async fn open_physical_channel(&mut self) -> Result<(), ReaderError> {
        if self.card.is_none() {
            let card = self
                .context
                .connect(&self.reader_name, self.share_mode, Protocols::ANY)
                .map_err(map_error)?;
            self.card = Some(card);
        }
        Ok(())
    }

    fn close_physical_channel(&mut self) -> Result<(), ReaderError> {
        self.disconnect()
    }

    fn power_on_data(&self) -> String {
        self.card
            .as_ref()
            .and_then(|card| card.get_attribute_owned(Attribute::AtrString).ok())
            .map(hex::encode_upper)
            .unwrap_or_default()
    }

    async fn transmit_apdu(&mut self, command: &[u8]) -> Result<Vec<u8>, ReaderError> {
        let card = self
            .card
            .as_ref()
            .ok_or_else(|| ReaderError::CardIo("Physical channel is closed".to_string()))?;

        trace!(command = %hex::encode_upper(command), "PC/SC transmit");
        let mut buffer = vec![0u8; pcsc::MAX_BUFFER_SIZE_EXTENDED];
        match card.transmit(command, &mut buffer) {
            Ok(response) => {
                trace!(response = %hex::encode_upper(response), "PC/SC receive");
                Ok(response.to_vec())
            }
            Err(e) => {
                if matches!(e, pcsc::Error::ResetCard | pcsc::Error::RemovedCard) {
                    self.card = None;
                }
                Err(map_error(e))
            }
        }
    }

    fn release(&mut self) {
        if let Err(e) = self.context.cancel() {
            debug!(error = %e, "Nothing to cancel");
        }
        if let Err(e) = self.disconnect() {
            warn!(error = %e, "Failed to disconnect card on release");
        }
    }
}

impl Drop for PcscReader {
    fn drop(&mut self) {
        if let Some(card) = self.card.take() {
            let _ = card.disconnect(Disposition::LeaveCard);
        }
    }
}
