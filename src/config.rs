//! Server configuration

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::chat::ChatSettings;
use crate::session::SessionSettings;

/// Server configuration, read from `chatsh.toml`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SSH listen address
    pub listen_addr: SocketAddr,
    /// Directory every session starts in; created at startup
    pub home_directory: String,
    /// Rooms created under the home directory at startup
    pub seed_rooms: Vec<String>,
    /// Accept the `none` auth method
    pub allow_anonymous: bool,
    /// Bound on every remote call
    pub request_timeout_ms: u64,
    /// Fixed credentials by user name; others get a fresh one per connection
    pub tokens: HashMap<String, String>,
    pub chat: ChatConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 2222)),
            home_directory: "/home/chatsh".to_string(),
            seed_rooms: vec!["general".to_string()],
            allow_anonymous: false,
            request_timeout_ms: 10_000,
            tokens: HashMap::new(),
            chat: ChatConfig::default(),
        }
    }
}

/// `[chat]` table
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub poll_interval_ms: u64,
    /// Ceiling for the poll delay after repeated failures
    pub poll_backoff_max_ms: u64,
    pub history_limit: usize,
    pub poll_limit: usize,
    pub buffer_capacity: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 3_000,
            poll_backoff_max_ms: 30_000,
            history_limit: 50,
            poll_limit: 10,
            buffer_capacity: 100,
        }
    }
}

impl Config {
    /// Load config from a TOML file, falling back to defaults if it is missing
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::warn!("config not found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;

        tracing::info!(
            "loaded config from {} ({} seed rooms, {} fixed tokens)",
            path.display(),
            config.seed_rooms.len(),
            config.tokens.len()
        );
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        if !config.home_directory.starts_with('/') {
            anyhow::bail!("home_directory must be absolute: {}", config.home_directory);
        }
        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn session_settings(&self) -> SessionSettings {
        let request_timeout = self.request_timeout();
        SessionSettings {
            home: crate::vpath::normalize(&self.home_directory),
            request_timeout,
            chat: ChatSettings {
                poll_interval: Duration::from_millis(self.chat.poll_interval_ms),
                poll_backoff_max: Duration::from_millis(self.chat.poll_backoff_max_ms),
                history_limit: self.chat.history_limit,
                poll_limit: self.chat.poll_limit,
                buffer_capacity: self.chat.buffer_capacity,
                request_timeout,
            },
        }
    }
}
