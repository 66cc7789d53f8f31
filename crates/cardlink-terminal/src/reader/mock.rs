//! Mock reader for testing

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use cardlink_core::{CardFoundCallback, LocalReader, ReaderError};

use crate::config::MockConfig;

/// Status word returned for commands with no scripted response (INS not supported)
const SW_INS_NOT_SUPPORTED: [u8; 2] = [0x6D, 0x00];

/// Scripted in-memory reader and card
///
/// Clones share state, so a test can keep a handle while the terminal owns
/// the boxed reader.
#[derive(Clone)]
pub struct MockReader {
    state: Arc<Mutex<MockState>>,
}

struct MockState {
    name: String,
    power_on_data: String,
    scan_message: String,
    card_present: bool,
    pending_detection: Option<CardFoundCallback>,
    /// Command/response pairs (exact match first, then prefix)
    responses: Vec<(Vec<u8>, Vec<u8>)>,
    /// One-shot outcomes consumed before scripted responses
    queued: VecDeque<Result<Vec<u8>, ReaderError>>,
    open_error: Option<ReaderError>,
    channel_open: bool,
    opens: usize,
    closes: usize,
    released: bool,
    transmitted: Vec<Vec<u8>>,
}

impl MockReader {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                name: name.into(),
                power_on_data: String::new(),
                scan_message: String::new(),
                card_present: true,
                pending_detection: None,
                responses: Vec::new(),
                queued: VecDeque::new(),
                open_error: None,
                channel_open: false,
                opens: 0,
                closes: 0,
                released: false,
                transmitted: Vec::new(),
            })),
        }
    }

    pub fn from_config(config: &MockConfig) -> Result<Self, ReaderError> {
        let reader = Self::new(&config.name).with_power_on_data(&config.power_on_data);
        for entry in &config.responses {
            let command = decode_hex(&entry.command)?;
            let response = decode_hex(&entry.response)?;
            reader.add_response(command, response);
        }
        Ok(reader)
    }

    pub fn with_power_on_data(self, power_on_data: impl Into<String>) -> Self {
        self.state.lock().power_on_data = power_on_data.into();
        self
    }

    /// Add a scripted response for a command
    pub fn add_response(&self, command: Vec<u8>, response: Vec<u8>) {
        self.state.lock().responses.push((command, response));
    }

    /// Queue a one-shot response, served before any scripted response
    pub fn push_response(&self, response: Vec<u8>) {
        self.state.lock().queued.push_back(Ok(response));
    }

    /// Queue a one-shot transmit failure
    pub fn push_error(&self, error: ReaderError) {
        self.state.lock().queued.push_back(Err(error));
    }

    /// Make the next channel opening fail
    pub fn fail_next_open(&self, error: ReaderError) {
        self.state.lock().open_error = Some(error);
    }

    pub fn remove_card(&self) {
        self.state.lock().card_present = false;
    }

    /// Simulate a card entering the field, firing any pending detection callback
    pub fn insert_card(&self) {
        let callback = {
            let mut state = self.state.lock();
            state.card_present = true;
            state.pending_detection.take()
        };
        if let Some(callback) = callback {
            callback();
        }
    }

    pub fn transmitted(&self) -> Vec<Vec<u8>> {
        self.state.lock().transmitted.clone()
    }

    pub fn is_channel_open(&self) -> bool {
        self.state.lock().channel_open
    }

    pub fn open_count(&self) -> usize {
        self.state.lock().opens
    }

    /// Number of times an open channel was closed
    pub fn close_count(&self) -> usize {
        self.state.lock().closes
    }

    pub fn scan_message(&self) -> String {
        self.state.lock().scan_message.clone()
    }

    pub fn is_released(&self) -> bool {
        self.state.lock().released
    }
}

impl MockState {
    fn find_response(&self, command: &[u8]) -> Option<Vec<u8>> {
        self.responses
            .iter()
            .find(|(cmd, _)| cmd == command)
            .or_else(|| {
                self.responses
                    .iter()
                    .find(|(cmd, _)| command.starts_with(cmd))
            })
            .map(|(_, resp)| resp.clone())
    }
}

fn decode_hex(s: &str) -> Result<Vec<u8>, ReaderError> {
    hex::decode(s.trim())
        .map_err(|e| ReaderError::ReaderIo(format!("Invalid mock hex '{}': {}", s, e)))
}

#[async_trait]
impl LocalReader for MockReader {
    fn name(&self) -> String {
        self.state.lock().name.clone()
    }

    fn set_scan_message(&mut self, message: &str) {
        self.state.lock().scan_message = message.to_string();
    }

    async fn wait_for_card_present(&mut self) -> Result<bool, ReaderError> {
        Ok(self.state.lock().card_present)
    }

    fn start_card_detection(&mut self, on_card_found: CardFoundCallback) -> Result<(), ReaderError> {
        let mut state = self.state.lock();
        if state.card_present {
            drop(state);
            on_card_found();
        } else {
            state.pending_detection = Some(on_card_found);
        }
        Ok(())
    }

    async fn open_physical_channel(&mut self) -> Result<(), ReaderError> {
        let mut state = self.state.lock();
        if let Some(err) = state.open_error.take() {
            return Err(err);
        }
        if !state.card_present {
            return Err(ReaderError::CardIo("No card present".to_string()));
        }
        if !state.channel_open {
            state.channel_open = true;
            state.opens += 1;
        }
        Ok(())
    }

    fn close_physical_channel(&mut self) -> Result<(), ReaderError> {
        let mut state = self.state.lock();
        if state.channel_open {
            state.channel_open = false;
            state.closes += 1;
        }
        Ok(())
    }

    fn power_on_data(&self) -> String {
        self.state.lock().power_on_data.clone()
    }

    async fn transmit_apdu(&mut self, command: &[u8]) -> Result<Vec<u8>, ReaderError> {
        let mut state = self.state.lock();
        if !state.channel_open {
            return Err(ReaderError::CardIo("Physical channel is closed".to_string()));
        }
        state.transmitted.push(command.to_vec());
        tracing::trace!(command = %hex::encode_upper(command), "Mock reader: transmit");

        if let Some(queued) = state.queued.pop_front() {
            return queued;
        }
        Ok(state
            .find_response(command)
            .unwrap_or_else(|| SW_INS_NOT_SUPPORTED.to_vec()))
    }

    fn release(&mut self) {
        let mut state = self.state.lock();
        state.pending_detection = None;
        state.released = true;
    }
}
