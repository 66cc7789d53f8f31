//! Local card reader capability

use async_trait::async_trait;
use thiserror::Error;

/// Failures raised by a reader implementation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReaderError {
    /// The reader device itself failed or disappeared
    #[error("Reader I/O error: {0}")]
    ReaderIo(String),

    /// The card did not answer, was removed, or the channel broke
    #[error("Card I/O error: {0}")]
    CardIo(String),
}

/// Callback fired once when a card enters the reader field
pub type CardFoundCallback = Box<dyn FnOnce() + Send + 'static>;

/// A local contact or contactless card reader
///
/// The reader is owned by one session at a time; methods take `&mut self`.
#[async_trait]
pub trait LocalReader: Send {
    /// Name reported to the server as `localReaderName`
    fn name(&self) -> String;

    /// Message shown to the user while waiting for a card
    fn set_scan_message(&mut self, message: &str);

    /// Wait until a card is present
    ///
    /// Returns `false` if detection stopped without a card.
    async fn wait_for_card_present(&mut self) -> Result<bool, ReaderError>;

    /// Start background detection, invoking `on_card_found` on the first card
    fn start_card_detection(&mut self, on_card_found: CardFoundCallback)
        -> Result<(), ReaderError>;

    async fn open_physical_channel(&mut self) -> Result<(), ReaderError>;

    /// Close the physical channel; closing a closed channel is a no-op
    fn close_physical_channel(&mut self) -> Result<(), ReaderError>;

    /// Answer-to-reset (or ATS) of the current card, hex encoded
    fn power_on_data(&self) -> String;

    /// Send raw command bytes and return the raw response, status word included
    async fn transmit_apdu(&mut self, command: &[u8]) -> Result<Vec<u8>, ReaderError>;

    /// Release the reader; it must not be used afterwards
    fn release(&mut self);
}
