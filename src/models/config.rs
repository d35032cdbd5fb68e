//! Application configuration structures.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Stream endpoint and HTTP client settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Automatic reconnect behavior
    #[serde(default)]
    pub reconnect: ReconnectConfig,

    /// Event log settings
    #[serde(default)]
    pub events: EventLogConfig,

    /// Console output settings
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.api.user_agent.trim().is_empty() {
            return Err(AppError::validation("api.user_agent is empty"));
        }
        let base = Url::parse(&self.api.base_url)
            .map_err(|e| AppError::validation(format!("api.base_url is invalid: {e}")))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(AppError::validation(format!(
                "api.base_url must be http or https, got '{}'",
                base.scheme()
            )));
        }
        if self.api.connect_timeout_secs == 0 {
            return Err(AppError::validation("api.connect_timeout_secs must be > 0"));
        }
        if self.reconnect.base_delay_ms == 0 {
            return Err(AppError::validation("reconnect.base_delay_ms must be > 0"));
        }
        if self.reconnect.base_delay_ms > self.reconnect.max_delay_ms {
            return Err(AppError::validation(
                "reconnect.base_delay_ms must not exceed reconnect.max_delay_ms",
            ));
        }
        if self.reconnect.max_attempts == 0 {
            return Err(AppError::validation("reconnect.max_attempts must be > 0"));
        }
        if self.events.capacity == 0 {
            return Err(AppError::validation("events.capacity must be > 0"));
        }
        Ok(())
    }
}

/// Stream endpoint and HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL; streams live at `{base_url}/live/matches/{id}/stream`
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// TCP/TLS connect timeout in seconds. Streams have no overall timeout.
    #[serde(default = "defaults::connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl ApiConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            user_agent: defaults::user_agent(),
            connect_timeout_secs: defaults::connect_timeout(),
        }
    }
}

/// Automatic reconnect settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconnectConfig {
    /// Delay before the first automatic attempt, doubled for each later one
    #[serde(default = "defaults::base_delay")]
    pub base_delay_ms: u64,

    /// Upper bound for any single delay
    #[serde(default = "defaults::max_delay")]
    pub max_delay_ms: u64,

    /// Automatic attempts before giving up until a manual reconnect
    #[serde(default = "defaults::max_attempts")]
    pub max_attempts: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: defaults::base_delay(),
            max_delay_ms: defaults::max_delay(),
            max_attempts: defaults::max_attempts(),
        }
    }
}

/// Event log settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogConfig {
    /// Maximum events kept, newest first
    #[serde(default = "defaults::capacity")]
    pub capacity: usize,
}

impl Default for EventLogConfig {
    fn default() -> Self {
        Self {
            capacity: defaults::capacity(),
        }
    }
}

/// Console output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Line template, see `LiveEvent::format`
    #[serde(default = "defaults::template")]
    pub template: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            template: defaults::template(),
        }
    }
}

mod defaults {
    pub fn base_url() -> String {
        "http://localhost:3000/api".into()
    }
    pub fn user_agent() -> String {
        concat!("cricket-live/", env!("CARGO_PKG_VERSION")).into()
    }
    pub fn connect_timeout() -> u64 {
        10
    }

    pub fn base_delay() -> u64 {
        2_000
    }
    pub fn max_delay() -> u64 {
        30_000
    }
    pub fn max_attempts() -> u32 {
        5
    }

    pub fn capacity() -> usize {
        100
    }

    pub fn template() -> String {
        "[{time}] {label} {over} {message}".into()
    }
}
