//! cardlink-http - HTTP network client for the cardlink terminal protocol
//!
//! Posts protocol envelopes as JSON to the server's remote plugin endpoint.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cardlink_http::{HttpConfig, HttpNetworkClient};
//!
//! # fn main() -> Result<(), cardlink_http::HttpError> {
//! let config = HttpConfig::new("https://server.example:8443")
//!     .with_basic_auth("terminal", Some("secret".to_string()));
//! let network = Arc::new(HttpNetworkClient::new(&config)?);
//! # Ok(())
//! # }
//! ```
//!
//! # Testing
//!
//! The `testing` module provides a scripted endpoint served by axum:
//!
//! ```rust,ignore
//! use cardlink_http::testing::{ScriptedEndpoint, TestServer};
//!
//! let endpoint = ScriptedEndpoint::new().reply(end_of_service);
//! let server = TestServer::start(endpoint.router("/remote"), "/remote").await?;
//! let reply = server.client.transmit(&request).await?;
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod testing;

pub use client::HttpNetworkClient;
pub use config::{BasicAuth, HttpConfig};
pub use error::{HttpError, Result};
