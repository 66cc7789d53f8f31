//! cardlink-core - Core types and capability traits for remote card services
//!
//! This crate holds the wire model exchanged with a remote service server,
//! the status-word and SELECT codecs, the session error taxonomy, and the two
//! capability traits (local reader, network client) the terminal engine is
//! built on.

pub mod apdu;
pub mod codec;
pub mod error;
pub mod models;
pub mod network;
pub mod outcome;
pub mod protocol;
pub mod reader;

pub use apdu::StatusWord;
pub use codec::{decode_body, encode_body, CodecError};
pub use error::{StatusCode, TerminalError, TerminalResult};
pub use models::*;
pub use network::{NetworkClient, NetworkError};
pub use outcome::{output_text, value_text, Outcome};
pub use reader::{CardFoundCallback, LocalReader, ReaderError};
