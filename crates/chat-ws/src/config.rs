//! Transport configuration
//!
//! Settings are resolved with the following precedence:
//! 1. Environment variables
//! 2. TOML configuration file
//! 3. Defaults

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WsError};

/// Default configuration file name, looked up in the working directory
const DEFAULT_CONFIG_FILE: &str = "chat-sync.toml";

/// WebSocket transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsConfig {
    /// Backend endpoint, e.g. `ws://localhost:8080/chat`
    #[serde(default = "default_url")]
    pub url: String,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self { url: default_url() }
    }
}

fn default_url() -> String {
    "ws://localhost:8080/chat".to_string()
}

impl WsConfig {
    /// Load configuration: file (if present) with environment overrides.
    ///
    /// `CHAT_WS_CONFIG` selects the file, `CHAT_WS_URL` overrides the
    /// endpoint.
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var("CHAT_WS_CONFIG") {
            Ok(path) => Self::from_file(&path)?,
            Err(_) if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(DEFAULT_CONFIG_FILE)?
            }
            Err(_) => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Parse configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| WsError::Config(e.to_string()))
    }

    /// Apply environment variable overrides
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("CHAT_WS_URL") {
            self.url = url;
        }
    }

    /// Endpoint for a specific user's connection
    pub fn endpoint_for(&self, user_id: &str) -> String {
        let separator = if self.url.contains('?') { '&' } else { '?' };
        format!("{}{}user_id={}", self.url, separator, user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_url() {
        let config = WsConfig::default();
        assert_eq!(config.url, "ws://localhost:8080/chat");
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"url = "wss://chat.example.com/ws""#).unwrap();

        let config = WsConfig::from_file(file.path()).unwrap();
        assert_eq!(config.url, "wss://chat.example.com/ws");
    }

    #[test]
    fn test_from_file_missing_url_uses_default() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let config = WsConfig::from_file(file.path()).unwrap();
        assert_eq!(config.url, default_url());
    }

    #[test]
    fn test_endpoint_for_appends_query() {
        let config = WsConfig::default();
        assert_eq!(
            config.endpoint_for("u1"),
            "ws://localhost:8080/chat?user_id=u1"
        );

        let config = WsConfig {
            url: "ws://host/chat?token=abc".to_string(),
        };
        assert_eq!(
            config.endpoint_for("u1"),
            "ws://host/chat?token=abc&user_id=u1"
        );
    }
}
