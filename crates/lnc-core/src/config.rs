use crate::form::ValidationError;
use crate::registry::NodeAddress;
use crate::{DEFAULT_NODE_URL, PEER_REFRESH_INTERVAL_SECS, RESOLVE_TIMEOUT_SECS};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// File name looked up inside the console's config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file unreadable: {0}")]
    Io(#[from] std::io::Error),

    #[error("config file malformed: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config could not be encoded: {0}")]
    Encode(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Console settings.
/// Loaded from `<config-dir>/config.toml`, then overridden by `LNC_*`
/// environment variables, then by command-line flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Endpoint that is active when the console starts.
    pub default_node: String,
    /// Extra endpoints announced to the active node on start.
    pub bootstrap_peers: Vec<String>,
    pub refresh_interval_secs: u64,
    pub resolve_timeout_secs: u64,
    /// Applies to every call except conflict resolution. Unset = no limit.
    pub request_timeout_secs: Option<u64>,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        ConsoleConfig {
            default_node: DEFAULT_NODE_URL.to_string(),
            bootstrap_peers: Vec::new(),
            refresh_interval_secs: PEER_REFRESH_INTERVAL_SECS,
            resolve_timeout_secs: RESOLVE_TIMEOUT_SECS,
            request_timeout_secs: None,
        }
    }
}

impl ConsoleConfig {
    pub fn path_in(config_dir: &Path) -> PathBuf {
        config_dir.join(CONFIG_FILE_NAME)
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: ConsoleConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Defaults when the directory has no config file yet.
    pub fn load_or_default(config_dir: &Path) -> Result<Self, ConfigError> {
        let path = Self::path_in(config_dir);
        if path.exists() {
            Self::load_from_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply `LNC_NODE_URL`, `LNC_REFRESH_SECS` and `LNC_RESOLVE_TIMEOUT_SECS`
    /// through `lookup`. Values that do not parse are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(node) = lookup("LNC_NODE_URL").filter(|s| !s.trim().is_empty()) {
            self.default_node = node;
        }
        if let Some(secs) = lookup("LNC_REFRESH_SECS").and_then(|s| s.parse().ok()) {
            self.refresh_interval_secs = secs;
        }
        if let Some(secs) = lookup("LNC_RESOLVE_TIMEOUT_SECS").and_then(|s| s.parse().ok()) {
            self.resolve_timeout_secs = secs;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.refresh_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "refresh_interval_secs must be at least 1".to_string(),
            ));
        }
        if self.resolve_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "resolve_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.request_timeout_secs == Some(0) {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be at least 1 when set".to_string(),
            ));
        }
        self.default_address()
            .map_err(|e| ConfigError::Invalid(format!("default_node: {}", e)))?;
        for peer in &self.bootstrap_peers {
            NodeAddress::parse(peer)
                .map_err(|e| ConfigError::Invalid(format!("bootstrap peer '{}': {}", peer, e)))?;
        }
        Ok(())
    }

    pub fn default_address(&self) -> Result<NodeAddress, ValidationError> {
        NodeAddress::parse(&self.default_node)
    }

    /// Bootstrap peers that parse; the rest are dropped.
    pub fn bootstrap_addresses(&self) -> Vec<NodeAddress> {
        self.bootstrap_peers
            .iter()
            .filter_map(|p| NodeAddress::parse(p).ok())
            .collect()
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_secs(self.resolve_timeout_secs)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}
