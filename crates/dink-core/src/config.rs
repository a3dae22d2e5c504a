//! Configuration resolution for Dink.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/dink/settings.json)
//! 3. Environment variables
//! 4. CLI arguments (highest priority, applied by the binary)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Complete Dink configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
}

/// Local storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub database_path: Option<PathBuf>,
    pub log_level: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            log_level: "info".to_string(),
        }
    }
}

/// Sync orchestrator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Minimum seconds between accepted sync triggers.
    pub sync_throttle_secs: u64,
    /// Minimum seconds between activity-metric emissions. Default: 24 hours.
    pub activity_throttle_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            sync_throttle_secs: 20,
            activity_throttle_secs: 24 * 60 * 60,
        }
    }
}

/// Remote store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL of the remote REST store (e.g. "<https://api.dink.app>").
    pub base_url: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: 30,
        }
    }
}

/// Load configuration with hierarchical resolution.
pub fn load_config() -> Result<Config> {
    let mut config = Config::default();

    if let Some(global_path) = global_config_path() {
        if global_path.exists() {
            let global = load_config_file(&global_path)?;
            merge_config(&mut config, global);
        }
    }

    apply_env_overrides(&mut config);

    Ok(config)
}

/// Get the global config file path (`~/.config/dink/settings.json` on Linux).
pub fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("dink").join("settings.json"))
}

/// Get the default local database path.
pub fn default_database_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("dink").join("dink.db"))
}

fn load_config_file(path: &std::path::Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

fn merge_config(base: &mut Config, overlay: Config) {
    if overlay.storage.database_path.is_some() {
        base.storage.database_path = overlay.storage.database_path;
    }
    base.storage.log_level = overlay.storage.log_level;
    base.sync = overlay.sync;
    if overlay.remote.base_url.is_some() {
        base.remote.base_url = overlay.remote.base_url;
    }
    base.remote.timeout_secs = overlay.remote.timeout_secs;
}

fn apply_env_overrides(config: &mut Config) {
    if let Ok(val) = std::env::var("DINK_DB_PATH") {
        config.storage.database_path = Some(PathBuf::from(val));
    }
    if let Ok(val) = std::env::var("DINK_LOG_LEVEL") {
        config.storage.log_level = val;
    }
    if let Ok(val) = std::env::var("DINK_REMOTE_URL") {
        config.remote.base_url = Some(val);
    }
    if let Ok(val) = std::env::var("DINK_SYNC_THROTTLE_SECS") {
        if let Ok(n) = val.parse() {
            config.sync.sync_throttle_secs = n;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_sync_throttle_is_20s() {
        let config = Config::default();
        assert_eq!(config.sync.sync_throttle_secs, 20);
    }

    #[test]
    fn default_activity_throttle_is_24h() {
        let config = Config::default();
        assert_eq!(config.sync.activity_throttle_secs, 24 * 60 * 60);
    }

    #[test]
    fn merge_prefers_overlay_paths() {
        let mut base = Config::default();
        let overlay = Config {
            storage: StorageConfig {
                database_path: Some(PathBuf::from("/tmp/other.db")),
                log_level: "debug".to_string(),
            },
            ..Config::default()
        };
        merge_config(&mut base, overlay);
        assert_eq!(
            base.storage.database_path.as_deref(),
            Some(std::path::Path::new("/tmp/other.db"))
        );
        assert_eq!(base.storage.log_level, "debug");
    }
}
