//! Test utilities for cardlink-http
//!
//! Provides an in-process HTTP server speaking the remote plugin endpoint,
//! replaying scripted replies and recording what the client posted.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::net::TcpListener;

use cardlink_core::Envelope;

use crate::client::HttpNetworkClient;
use crate::config::HttpConfig;
use crate::error::Result;

/// Cookie the scripted endpoint hands out on the first request of a client
pub const SESSION_COOKIE: &str = "SESSION=cardlink-test";

/// One request as the server saw it
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub envelope: Envelope,
    pub authorization: Option<String>,
    pub cookie: Option<String>,
}

#[derive(Clone, Default)]
struct ScriptState {
    replies: Arc<Mutex<VecDeque<(StatusCode, Value)>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

/// Scripted remote plugin endpoint
///
/// Each request consumes the next reply. Envelope replies are wrapped in a
/// one-element list the way the server does; raw replies are sent as is.
#[derive(Clone, Default)]
pub struct ScriptedEndpoint {
    state: ScriptState,
}

impl ScriptedEndpoint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply with a server message for the session of the incoming request
    pub fn reply(self, envelope: Envelope) -> Self {
        let body = serde_json::to_value(vec![envelope]).unwrap_or(Value::Null);
        self.reply_raw(StatusCode::OK, body)
    }

    pub fn reply_raw(self, status: StatusCode, body: Value) -> Self {
        self.state.replies.lock().push_back((status, body));
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().clone()
    }

    pub fn router(&self, endpoint: &str) -> Router {
        Router::new()
            .route(endpoint, post(handle))
            .with_state(self.state.clone())
    }
}

async fn handle(
    State(state): State<ScriptState>,
    headers: HeaderMap,
    Json(envelope): Json<Envelope>,
) -> Response {
    let header_text = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let cookie = header_text(header::COOKIE);
    state.requests.lock().push(RecordedRequest {
        envelope,
        authorization: header_text(header::AUTHORIZATION),
        cookie: cookie.clone(),
    });

    let next = state.replies.lock().pop_front();
    let Some((status, body)) = next else {
        return (StatusCode::GONE, "No scripted reply left").into_response();
    };

    let mut response = (status, Json(body)).into_response();
    if cookie.is_none() {
        response
            .headers_mut()
            .insert(header::SET_COOKIE, HeaderValue::from_static(SESSION_COOKIE));
    }
    response
}

/// A test server that automatically shuts down when dropped
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: HttpNetworkClient,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl TestServer {
    /// Serve `router` on an ephemeral port with a client pointed at `endpoint`
    pub async fn start(router: Router, endpoint: &str) -> Result<Self> {
        Self::start_with(router, |base_url| HttpConfig::new(base_url).with_endpoint(endpoint)).await
    }

    /// Serve `router`, building the client configuration from the base URL
    pub async fn start_with(
        router: Router,
        configure: impl FnOnce(String) -> HttpConfig,
    ) -> Result<Self> {
        // Bind to any available port
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

        let handle = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        // Give server a moment to start
        tokio::time::sleep(Duration::from_millis(10)).await;

        let client = HttpNetworkClient::new(&configure(format!("http://{}", addr)))?;

        Ok(Self {
            addr,
            client,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Shutdown the server gracefully
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
