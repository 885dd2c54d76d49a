//! Service configuration.
//!
//! Loaded from `~/.config/wallboard/config.toml` with every section and
//! field optional; environment variables override the file for container
//! deployments.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{PortalError, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    /// Persistence settings.
    pub store: StoreConfig,
    /// Schedule engine settings.
    pub engine: EngineConfig,
    /// Snapshot exporter settings.
    pub export: ExportConfig,
}

/// Persistence settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding the SQLite database file.
    pub db_dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_dir: default_data_dir(),
        }
    }
}

/// Schedule engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Milliseconds between evaluation cycles. Also the boundary the engine
    /// uses to tell a within-window application from a missed one.
    pub poll_interval_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
        }
    }
}

impl EngineConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

/// Snapshot exporter settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Seconds between snapshot exports.
    pub interval_secs: u64,
    /// Where the snapshot report is written.
    pub output_path: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            interval_secs: 3600,
            output_path: default_data_dir().join("snapshot.txt"),
        }
    }
}

impl ExportConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

impl PortalConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| PortalError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be
    /// serialized.
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| PortalError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load from the default path, falling back to defaults when no file
    /// exists, then apply environment overrides.
    pub fn load() -> Result<Self> {
        let path = Self::default_config_path();
        let mut config = if path.exists() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Returns the default config file path: `~/.config/wallboard/config.toml`.
    pub fn default_config_path() -> PathBuf {
        default_data_dir().join("config.toml")
    }

    /// Apply `WALLBOARD_*` environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_with(|key| std::env::var(key).ok());
    }

    fn apply_overrides_with(&mut self, get: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = get("WALLBOARD_DB_DIR") {
            self.store.db_dir = PathBuf::from(dir);
        }
        if let Some(ms) = get("WALLBOARD_POLL_INTERVAL_MS") {
            match ms.parse::<u64>() {
                Ok(v) => self.engine.poll_interval_ms = v,
                Err(_) => warn!(value = %ms, "ignoring unparsable WALLBOARD_POLL_INTERVAL_MS"),
            }
        }
        if let Some(secs) = get("WALLBOARD_EXPORT_INTERVAL_SECS") {
            match secs.parse::<u64>() {
                Ok(v) => self.export.interval_secs = v,
                Err(_) => {
                    warn!(value = %secs, "ignoring unparsable WALLBOARD_EXPORT_INTERVAL_SECS");
                }
            }
        }
        if let Some(path) = get("WALLBOARD_EXPORT_PATH") {
            self.export.output_path = PathBuf::from(path);
        }
    }
}

/// Returns the service data directory: `~/.config/wallboard`.
fn default_data_dir() -> PathBuf {
    if let Some(config) = std::env::var_os("XDG_CONFIG_HOME") {
        PathBuf::from(config).join("wallboard")
    } else if let Some(home) = std::env::var_os("HOME") {
        PathBuf::from(home).join(".config").join("wallboard")
    } else {
        PathBuf::from("/tmp/wallboard")
    }
}
