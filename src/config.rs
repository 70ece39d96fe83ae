//! Application configuration
//!
//! Loaded from TOML. Missing fields fall back to defaults, so an empty file
//! is a valid config.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::{DomainError, DomainResult, DueDatePlacement};

const APP_DIR: &str = "todo-live";

/// Overrides [`default_data_dir`]
pub const DATA_DIR_ENV: &str = "TODO_LIVE_DATA_DIR";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// SQLite database file
    pub database_path: PathBuf,
    /// How long observable state stays warm after its last observer leaves
    pub idle_grace_ms: u64,
    /// Where to-dos without a due date go in due-date order
    pub due_date_placement: DueDatePlacement,
    /// `tracing` filter directive, e.g. `info` or `todo_live_lib=debug`
    pub log_level: String,
    /// Daily rolling log files are written here when set
    pub log_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: default_data_dir().join("todo_live.db"),
            idle_grace_ms: 5_000,
            due_date_placement: DueDatePlacement::Last,
            log_level: "info".to_string(),
            log_dir: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    pub fn from_file(path: &Path) -> DomainResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DomainError::Config(format!("failed to read {}: {}", path.display(), e)))?;
        toml::from_str(&content).map_err(|e| DomainError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    pub fn save_to_file(&self, path: &Path) -> DomainResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| DomainError::Config(format!("failed to create {}: {}", parent.display(), e)))?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| DomainError::Config(e.to_string()))?;
        std::fs::write(path, content)
            .map_err(|e| DomainError::Config(format!("failed to write {}: {}", path.display(), e)))
    }

    /// `config_dir()/todo-live/config.toml`
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join(APP_DIR)
            .join("config.toml")
    }

    pub fn idle_grace(&self) -> Duration {
        Duration::from_millis(self.idle_grace_ms)
    }
}

/// Application data root. Resolves to `dirs::data_dir()/todo-live/` unless
/// `TODO_LIVE_DATA_DIR` is set.
pub fn default_data_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os(DATA_DIR_ENV) {
        return PathBuf::from(override_dir);
    }
    dirs::data_dir().unwrap_or_else(std::env::temp_dir).join(APP_DIR)
}
