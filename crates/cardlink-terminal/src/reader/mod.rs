//! Local reader adapters
//!
//! - PC/SC adapter for desktop contact and contactless readers
//! - Mock adapter for testing
//!
//! # Example
//!
//! ```ignore
//! use cardlink_terminal::config::ReaderConfig;
//! use cardlink_terminal::reader::create_reader;
//!
//! let mut reader = create_reader(&ReaderConfig::default())?;
//! reader.open_physical_channel().await?;
//! let response = reader.transmit_apdu(&[0x00, 0xA4, 0x04, 0x00, 0x00]).await?;
//! ```

pub mod mock;

#[cfg(feature = "pcsc")]
pub mod pcsc;

pub use cardlink_core::{LocalReader, ReaderError};
pub use mock::MockReader;

use crate::config::ReaderConfig;

/// Create a reader based on configuration
pub fn create_reader(config: &ReaderConfig) -> Result<Box<dyn LocalReader>, ReaderError> {
    match config {
        #[cfg(feature = "pcsc")]
        ReaderConfig::Pcsc(cfg) => {
            let reader = pcsc::PcscReader::new(cfg)?;
            Ok(Box::new(reader))
        }
        #[cfg(not(feature = "pcsc"))]
        ReaderConfig::Pcsc(_) => Err(ReaderError::ReaderIo(
            "PC/SC readers require the 'pcsc' feature".to_string(),
        )),
        ReaderConfig::Mock(cfg) => {
            let reader = MockReader::from_config(cfg)?;
            Ok(Box::new(reader))
        }
    }
}
