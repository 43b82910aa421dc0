//! Process configuration for the proxy and the relay.

use crate::gateway::DEFAULT_MODEL;
use std::path::PathBuf;
use thiserror::Error;

/// Environment variable holding the AI service key.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_PROXY_ENDPOINT: &str = "http://localhost:3000/fact-check";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{} not found. Please set it in the environment or a .env file.", API_KEY_ENV)]
    MissingApiKey,

    #[error("invalid bind host '{0}'")]
    InvalidHost(String),
}

/// Settings for `factcheck serve`.
#[derive(Clone)]
pub struct ProxyConfig {
    pub api_key: String,
    pub model: String,
    /// Host name or IP literal; names are resolved when the listener binds.
    pub host: String,
    pub port: u16,
}

impl std::fmt::Debug for ProxyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("host", &self.host)
            .field("port", &self.port)
            .finish()
    }
}

impl ProxyConfig {
    /// Build the proxy configuration, reading the API key from the process
    /// environment. A missing or empty key is an error.
    pub fn resolve(host: &str, port: u16, model: Option<String>) -> Result<Self, ConfigError> {
        Self::resolve_with(host, port, model, std::env::var(API_KEY_ENV).ok())
    }

    /// As [`ProxyConfig::resolve`], with the key supplied by the caller.
    pub fn resolve_with(
        host: &str,
        port: u16,
        model: Option<String>,
        api_key: Option<String>,
    ) -> Result<Self, ConfigError> {
        let api_key = api_key
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)?;
        let host = host.trim();
        if host.is_empty() || host.contains(char::is_whitespace) {
            return Err(ConfigError::InvalidHost(host.to_string()));
        }

        Ok(Self {
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            host: host.to_string(),
            port,
        })
    }

    /// `host:port`, with IPv6 literals bracketed.
    pub fn address(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

/// Settings for the relay side (`factcheck check` / `factcheck show`).
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub proxy_endpoint: String,
    pub state_path: PathBuf,
    pub open_on_success: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            proxy_endpoint: DEFAULT_PROXY_ENDPOINT.to_string(),
            state_path: default_state_path(),
            open_on_success: true,
        }
    }
}

/// Default location of the persisted relay state
/// (~/.local/share/factcheck/state.json on Linux).
pub fn default_state_path() -> PathBuf {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".local/share"));
    data_dir.join("factcheck").join("state.json")
}
