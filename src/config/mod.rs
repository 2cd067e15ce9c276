//! Node Configuration
//!
//! Static cluster layout and tuning knobs, loaded from a TOML file.
//!
//! ```toml
//! [[shards]]
//! name = "shard-a"
//! idx = 0
//! address = "127.0.0.1:8080"
//!
//! [peer]
//! request_timeout_ms = 5000
//!
//! [replication]
//! poll_interval_ms = 100
//! retry_backoff_ms = 1000
//! ```
//!
//! Only `[[shards]]` is required; the other sections fall back to defaults.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// One entry of the `[[shards]]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardConfig {
    /// Name passed to `--shard` to select this entry.
    pub name: String,
    /// Shard index in `0..shard_count`.
    pub idx: usize,
    /// `host:port` of the node's HTTP listener.
    pub address: String,
}

/// Settings for outbound calls to other nodes (forwarding and replication).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeerConfig {
    pub request_timeout_ms: u64,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 5_000,
        }
    }
}

impl PeerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Replica polling behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplicationConfig {
    /// Sleep between polls when the leader's outbox is empty.
    pub poll_interval_ms: u64,
    /// Sleep before retrying after a failed call to the leader.
    pub retry_backoff_ms: u64,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            retry_backoff_ms: 1_000,
        }
    }
}

impl ReplicationConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub shards: Vec<ShardConfig>,
    #[serde(default)]
    pub peer: PeerConfig,
    #[serde(default)]
    pub replication: ReplicationConfig,
}

impl Config {
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&contents)
    }
}
