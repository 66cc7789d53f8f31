//! HTTP transport configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Where and how to reach the remote service server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Scheme, host and port, e.g. `https://server.example:8443`
    pub server_url: String,
    /// Path of the remote plugin endpoint, appended to `server_url`
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basic_auth: Option<BasicAuth>,
    /// Whole-request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasicAuth {
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

fn default_endpoint() -> String {
    "/card/remote-plugin".to_string()
}

fn default_timeout_ms() -> u64 {
    35_000
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

impl HttpConfig {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            endpoint: default_endpoint(),
            basic_auth: None,
            timeout_ms: default_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_basic_auth(mut self, username: impl Into<String>, password: Option<String>) -> Self {
        self.basic_auth = Some(BasicAuth {
            username: username.into(),
            password,
        });
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: HttpConfig = toml::from_str(r#"server_url = "http://localhost:8080""#).unwrap();
        assert_eq!(config.endpoint, "/card/remote-plugin");
        assert_eq!(config.timeout(), Duration::from_secs(35));
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
        assert!(config.basic_auth.is_none());
    }

    #[test]
    fn test_basic_auth_table() {
        let config: HttpConfig = toml::from_str(
            r#"
            server_url = "https://server.example"
            endpoint = "/remote"

            [basic_auth]
            username = "terminal"
            password = "secret"
            "#,
        )
        .unwrap();
        let auth = config.basic_auth.unwrap();
        assert_eq!(auth.username, "terminal");
        assert_eq!(auth.password.as_deref(), Some("secret"));
    }
}
