//! JSON-over-HTTP network client

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};
use url::Url;

use cardlink_core::{Envelope, NetworkClient, NetworkError};

use crate::config::{BasicAuth, HttpConfig};
use crate::error::{HttpError, Result};

/// Network client posting envelopes to the remote plugin endpoint
///
/// Each request is one JSON envelope; the server answers with a JSON list
/// whose first element is the reply. Cookies set by the server are sent back
/// on later requests.
#[derive(Debug, Clone)]
pub struct HttpNetworkClient {
    client: Client,
    service_url: Url,
    basic_auth: Option<BasicAuth>,
}

impl HttpNetworkClient {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .cookie_store(true)
            .build()?;

        let service_url = Url::parse(&config.server_url)?.join(&config.endpoint)?;

        Ok(Self {
            client,
            service_url,
            basic_auth: config.basic_auth.clone(),
        })
    }

    /// Full URL requests are posted to
    pub fn service_url(&self) -> &Url {
        &self.service_url
    }

    /// Post one envelope and return the first envelope of the reply list
    #[instrument(skip(self, message), fields(action = %message.action))]
    pub async fn transmit(&self, message: &Envelope) -> Result<Envelope> {
        let mut request = self.client.post(self.service_url.clone()).json(message);
        if let Some(auth) = &self.basic_auth {
            request = request.basic_auth(&auth.username, auth.password.as_ref());
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(HttpError::Server {
                status: status.as_u16(),
                message: if message.is_empty() {
                    format!("HTTP {}", status)
                } else {
                    message
                },
            });
        }

        let mut replies: Vec<Envelope> = response
            .json()
            .await
            .map_err(|e| HttpError::Decode(e.to_string()))?;
        debug!(count = replies.len(), "Received server reply");

        if replies.is_empty() {
            return Err(HttpError::EmptyResponse);
        }
        Ok(replies.swap_remove(0))
    }
}

#[async_trait]
impl NetworkClient for HttpNetworkClient {
    async fn send_request(&self, message: &Envelope) -> std::result::Result<Envelope, NetworkError> {
        Ok(self.transmit(message).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_url_joins_endpoint() {
        let client = HttpNetworkClient::new(
            &HttpConfig::new("http://localhost:8080").with_endpoint("/card/remote-plugin"),
        )
        .unwrap();
        assert_eq!(
            client.service_url().as_str(),
            "http://localhost:8080/card/remote-plugin"
        );
    }

    #[test]
    fn test_invalid_server_url() {
        let err = HttpNetworkClient::new(&HttpConfig::new("not a url")).unwrap_err();
        assert!(matches!(err, HttpError::InvalidUrl(_)));
    }

    #[test]
    fn test_errors_map_to_server_io() {
        let err: NetworkError = HttpError::EmptyResponse.into();
        assert_eq!(
            err,
            NetworkError::ServerIo("Comm error: Server returned no message".into())
        );
    }
}
