//! Application configuration module
//!
//! Handles loading and validating configuration from environment variables.

use serde::Deserialize;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
#[allow(dead_code)]
pub enum ConfigError {
    #[error("Failed to load environment variables: {0}")]
    EnvLoad(#[from] dotenvy::Error),

    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Server configuration (webhook + health endpoints)
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: Ipv4Addr,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: Ipv4Addr::new(0, 0, 0, 0), // Bind to 0.0.0.0 for containers
            port: 3000,
        }
    }
}

/// Chat platform configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    /// Bot API token. Required; the process refuses to start without it.
    pub bot_token: String,
    /// Base URL of the Bot API (overridable for local test servers).
    pub api_base: String,
    /// Hard upper bound on outbound message length, in characters.
    pub max_message_len: usize,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            api_base: "https://api.telegram.org".to_string(),
            max_message_len: 4090,
        }
    }
}

/// Governance proposal source configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Base URL of the governance data source. Required.
    pub base_url: String,
    /// Per-request timeout; a slow source is treated as a transient failure.
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout_secs: 15,
        }
    }
}

/// Poll cycle configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PollConfig {
    pub interval_secs: u64,
    pub startup_delay_secs: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            startup_delay_secs: 3,
        }
    }
}

/// Durable state configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PersistenceConfig {
    pub path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("relay_state.json"),
        }
    }
}

/// Complete application settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub telegram: TelegramConfig,
    pub source: SourceConfig,
    pub poll: PollConfig,
    pub persistence: PersistenceConfig,
}

impl Settings {
    /// Load settings from environment variables
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if it exists (ignore errors if file not found)
        let _ = dotenvy::dotenv();

        let server = ServerConfig {
            host: std::env::var("HOST")
                .ok()
                .and_then(|h| h.parse().ok())
                .unwrap_or_else(|| ServerConfig::default().host),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or_else(|| ServerConfig::default().port),
        };

        let bot_token = std::env::var("BOT_TOKEN")
            .map_err(|_| ConfigError::MissingVar("BOT_TOKEN".to_string()))?;
        if bot_token.trim().is_empty() {
            return Err(ConfigError::MissingVar("BOT_TOKEN".to_string()));
        }

        let telegram = TelegramConfig {
            bot_token,
            api_base: std::env::var("TELEGRAM_API_BASE")
                .unwrap_or_else(|_| TelegramConfig::default().api_base),
            max_message_len: std::env::var("MAX_MESSAGE_LENGTH")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(|| TelegramConfig::default().max_message_len),
        };

        let base_url = std::env::var("SOURCE_URL")
            .map_err(|_| ConfigError::MissingVar("SOURCE_URL".to_string()))?;
        Self::validate_url(&base_url)?;

        let source = SourceConfig {
            base_url,
            timeout_secs: std::env::var("SOURCE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(|| SourceConfig::default().timeout_secs),
        };

        let poll = PollConfig {
            interval_secs: std::env::var("POLL_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(|| PollConfig::default().interval_secs),
            startup_delay_secs: std::env::var("POLL_STARTUP_DELAY_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(|| PollConfig::default().startup_delay_secs),
        };

        let persistence = PersistenceConfig {
            path: std::env::var("STATE_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PersistenceConfig::default().path),
        };

        Ok(Self {
            server,
            telegram,
            source,
            poll,
            persistence,
        })
    }

    /// Validate a base URL (http/https with a host)
    fn validate_url(raw: &str) -> Result<(), ConfigError> {
        match url::Url::parse(raw) {
            Ok(parsed) if parsed.host_str().is_some() => match parsed.scheme() {
                "http" | "https" => Ok(()),
                other => Err(ConfigError::InvalidValue(format!(
                    "SOURCE_URL has unsupported scheme '{}' (expected http/https)",
                    other
                ))),
            },
            _ => Err(ConfigError::InvalidValue(
                "SOURCE_URL is not a valid URL (expected http://... or https://...)".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_server_config() {
        let config = ServerConfig::default();
        assert_eq!(config.host, Ipv4Addr::new(0, 0, 0, 0));
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn test_default_poll_config() {
        let config = PollConfig::default();
        assert_eq!(config.interval_secs, 60);
        assert_eq!(config.startup_delay_secs, 3);
    }

    #[test]
    fn test_default_message_limit() {
        let config = TelegramConfig::default();
        assert_eq!(config.max_message_len, 4090);
    }

    #[test]
    fn test_validate_url_accepts_https() {
        assert!(Settings::validate_url("https://governance.example.com/api").is_ok());
    }

    #[test]
    fn test_validate_url_rejects_garbage() {
        assert!(Settings::validate_url("not a url").is_err());
        assert!(Settings::validate_url("ftp://host/path").is_err());
    }
}
