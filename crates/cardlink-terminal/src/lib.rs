//! cardlink-terminal - Terminal-side engine for remote card services
//!
//! A remote server drives the transaction: it asks the terminal to select
//! applications on the card and to transmit APDUs, and the terminal relays
//! the card's answers back until the server ends the session.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                        Terminal                          │
//! │  execute_remote_service() -> Outcome                     │
//! │                                                          │
//! │   ┌──────────────────┐        ┌──────────────────────┐   │
//! │   │  SessionDriver   │───────▶│    NetworkClient     │   │
//! │   │ (message loop,   │        │  (HTTP, scripted)    │   │
//! │   │  root cause)     │        └──────────────────────┘   │
//! │   └────────┬─────────┘                                   │
//! │            │                                             │
//! │   ┌────────┴─────────┐                                   │
//! │   │ process_selections│                                  │
//! │   └────────┬─────────┘                                   │
//! │   ┌────────┴─────────┐        ┌──────────────────────┐   │
//! │   │   ApduExchange   │───────▶│     LocalReader      │   │
//! │   │ (61XX / 6CXX)    │        │   (PC/SC, mock)      │   │
//! │   └──────────────────┘        └──────────────────────┘   │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod exchange;
pub mod reader;
pub mod selection;
pub mod session;
pub mod terminal;
pub mod testing;

pub use config::{ReaderConfig, TerminalConfig};
pub use exchange::ApduExchange;
pub use reader::{create_reader, MockReader};
pub use selection::{process_selections, SelectionOutcome};
pub use session::{ChannelGuard, SessionContext, SessionDriver};
pub use terminal::Terminal;

// Re-export for convenience
pub use cardlink_core::{
    LocalReader, NetworkClient, NetworkError, Outcome, ReaderError, StatusCode, TerminalError,
};
