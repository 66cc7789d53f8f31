//! Configuration file handling for the cardlink CLI

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use cardlink_http::HttpConfig;
use cardlink_terminal::{ReaderConfig, TerminalConfig};

/// Configuration file contents
///
/// ```toml
/// selection_scenario = "scenario.json"
///
/// [terminal]
/// client_node_id = "kiosk-1"
///
/// [reader]
/// type = "pcsc"
/// reader_name = "ACS ACR122U PICC Interface 00 00"
///
/// [server]
/// server_url = "https://server.example:8443"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub terminal: TerminalConfig,
    #[serde(default)]
    pub reader: ReaderConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<HttpConfig>,
    /// Selection scenario JSON file; relative paths resolve against the
    /// configuration file's directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection_scenario: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the default config file, if there is one
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let mut config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        if let (Some(scenario), Some(dir)) = (&config.selection_scenario, path.parent()) {
            if scenario.is_relative() {
                config.selection_scenario = Some(dir.join(scenario));
            }
        }
        Ok(config)
    }

    /// Get the default config file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("cardlink");

        Ok(config_dir.join("config.toml"))
    }

    /// HTTP settings with the `--server` override applied
    pub fn http_config(&self, server: Option<&str>) -> Result<HttpConfig> {
        match (server, &self.server) {
            (Some(url), Some(configured)) => {
                let mut http = configured.clone();
                http.server_url = url.to_string();
                Ok(http)
            }
            (Some(url), None) => Ok(HttpConfig::new(url)),
            (None, Some(configured)) => Ok(configured.clone()),
            (None, None) => anyhow::bail!(
                "No server configured: pass --server or add a [server] table to the config file"
            ),
        }
    }

    /// Contents of the configured selection scenario file
    pub fn read_selection_scenario(&self) -> Result<Option<String>> {
        self.selection_scenario
            .as_ref()
            .map(|path| {
                std::fs::read_to_string(path).with_context(|| {
                    format!("Failed to read selection scenario: {}", path.display())
                })
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use cardlink_terminal::config::ShareMode;
    use pretty_assertions::assert_eq;

    fn write_config(dir: &tempfile::TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_full_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
selection_scenario = "scenario.json"

[terminal]
client_node_id = "kiosk-1"
contactless = false

[reader]
type = "pcsc"
reader_name = "Reader 0"
share_mode = "exclusive"

[server]
server_url = "https://server.example:8443"
basic_auth = { username = "terminal", password = "secret" }
"#,
        );

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.terminal.client_node_id, "kiosk-1");
        assert!(!config.terminal.contactless);
        match &config.reader {
            ReaderConfig::Pcsc(pcsc) => {
                assert_eq!(pcsc.reader_name.as_deref(), Some("Reader 0"));
                assert_eq!(pcsc.share_mode, ShareMode::Exclusive);
            }
            other => panic!("unexpected reader config: {:?}", other),
        }
        let server = config.server.as_ref().unwrap();
        assert_eq!(server.endpoint, "/card/remote-plugin");
        assert_eq!(server.basic_auth.as_ref().unwrap().username, "terminal");
        assert_eq!(
            config.selection_scenario,
            Some(dir.path().join("scenario.json"))
        );
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "");

        let config = Config::load_from(&path).unwrap();
        assert!(matches!(config.reader, ReaderConfig::Mock(_)));
        assert!(config.terminal.contactless);
        assert!(config.server.is_none());
        assert!(config.selection_scenario.is_none());
    }

    #[test]
    fn test_parse_error_names_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "[reader]\ntype = \"bluetooth\"\n");

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_server_override() {
        let mut config = Config::default();
        assert!(config.http_config(None).is_err());

        let http = config.http_config(Some("http://localhost:9000")).unwrap();
        assert_eq!(http.server_url, "http://localhost:9000");

        config.server = Some(
            HttpConfig::new("https://server.example").with_endpoint("/remote"),
        );
        let http = config.http_config(Some("http://localhost:9000")).unwrap();
        assert_eq!(http.server_url, "http://localhost:9000");
        assert_eq!(http.endpoint, "/remote");
        assert_eq!(
            config.http_config(None).unwrap().server_url,
            "https://server.example"
        );
    }

    #[test]
    fn test_missing_scenario_file() {
        let config = Config {
            selection_scenario: Some(PathBuf::from("/nonexistent/scenario.json")),
            ..Default::default()
        };
        assert!(config.read_selection_scenario().is_err());
        assert!(Config::default().read_selection_scenario().unwrap().is_none());
    }
}
