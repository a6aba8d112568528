//! Core configuration types and loading.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use super::defaults::*;
use super::listen::ListenConfig;
use crate::state::ids::ChannelId;

/// Environment variable that overrides `bot.token`.
pub const TOKEN_ENV: &str = "DISCORD_TOKEN";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Daemon configuration. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Platform credentials and guild-wide defaults.
    pub bot: BotConfig,
    /// Durable store location.
    pub store: StoreConfig,
    /// Quota and reclamation timing.
    pub lifecycle: LifecycleConfig,
    /// Heartbeat sender.
    pub keepalive: KeepaliveSenderConfig,
    /// Liveness and metrics HTTP endpoint.
    pub http: HttpConfig,
    /// Line-oriented control gateway.
    pub listen: ListenConfig,
}

impl Config {
    /// Load configuration from a TOML file, then apply the token override
    /// from the environment.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config.with_token_override(std::env::var(TOKEN_ENV).ok()))
    }

    /// Replace the configured token when `token` is set and non-empty.
    pub fn with_token_override(mut self, token: Option<String>) -> Self {
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            self.bot.token = Some(token);
        }
        self
    }
}

/// Platform identity configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Platform token. Usually supplied through `DISCORD_TOKEN`.
    pub token: Option<String>,
    /// Category for temporary channels when no hosting channel names one.
    pub default_category_id: Option<ChannelId>,
}

/// Durable store configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path of the JSON state document.
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

/// Quota and reclamation timing.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Temporary channels a user may own at once in one guild (default: 3).
    pub max_temp_per_user: usize,
    /// Seconds between occupancy checks (default: 10).
    pub poll_interval_secs: u64,
    /// Seconds after which a watcher gives up (default: 6 hours).
    pub watcher_ceiling_secs: u64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            max_temp_per_user: default_max_temp_per_user(),
            poll_interval_secs: default_poll_interval(),
            watcher_ceiling_secs: default_watcher_ceiling(),
        }
    }
}

impl LifecycleConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn watcher_ceiling(&self) -> Duration {
        Duration::from_secs(self.watcher_ceiling_secs)
    }
}

/// Heartbeat sender configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KeepaliveSenderConfig {
    /// Seconds between due-checks (default: 60).
    pub tick_secs: u64,
}

impl Default for KeepaliveSenderConfig {
    fn default() -> Self {
        Self {
            tick_secs: default_keepalive_tick(),
        }
    }
}

/// HTTP liveness and metrics endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Port for `/` and `/metrics` (default: 8080). 0 disables the endpoint.
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            port: default_http_port(),
        }
    }
}
