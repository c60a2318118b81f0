use crate::error::BridgeError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub bridge: BridgeConfig,
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Tab-separated point map
    pub point_map: PathBuf,
    /// Attribute catalogue for the in-process model
    pub model_file: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Connection URL; the database index in its path also selects the
    /// keyspace notification channel
    pub url: String,
    #[serde(default = "default_key_pattern")]
    pub key_pattern: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_keyspace_events")]
    pub keyspace_events: String,
    #[serde(default = "default_reconnect_backoff_ms")]
    pub reconnect_backoff_ms: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

fn default_key_pattern() -> String {
    "*".to_string()
}

fn default_pool_size() -> u32 {
    8
}

// keyspace events (K) for string ($) and hash (h) commands
fn default_keyspace_events() -> String {
    "K$h".to_string()
}

fn default_reconnect_backoff_ms() -> u64 {
    5000
}

fn default_connect_timeout_ms() -> u64 {
    5000
}

impl StoreConfig {
    pub fn reconnect_backoff(&self) -> Duration {
        Duration::from_millis(self.reconnect_backoff_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, BridgeError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
