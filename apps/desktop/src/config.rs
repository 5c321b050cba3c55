//! Application configuration.
//!
//! Stored as JSON next to the database. The file is read once at startup;
//! missing or partial files fall back to defaults so a fresh install and an
//! upgrade both start cleanly.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Config load/save errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config store error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

/// Whether changes replicate in the background or only on request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    Automatic,
    Manual,
}

/// Focus timer durations, in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerSettings {
    pub work_minutes: u32,
    pub short_break_minutes: u32,
    pub long_break_minutes: u32,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            work_minutes: 25,
            short_break_minutes: 5,
            long_break_minutes: 15,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database_path: PathBuf,
    pub language: String,
    pub theme: Theme,
    pub sync_mode: SyncMode,
    pub timer: TimerSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            language: "English".to_string(),
            theme: Theme::Light,
            sync_mode: SyncMode::Automatic,
            timer: TimerSettings::default(),
        }
    }
}

fn app_data_dir() -> PathBuf {
    // Use app data directory for production, fallback to current dir
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("studentpro")
}

pub fn default_database_path() -> PathBuf {
    app_data_dir().join("studentpro.db")
}

pub fn default_config_path() -> PathBuf {
    app_data_dir().join("config.json")
}

pub fn default_session_path() -> PathBuf {
    app_data_dir().join("session.json")
}

impl AppConfig {
    /// Load the config file, falling back to defaults when it is missing
    /// or unreadable.
    pub fn load_or_default(path: &Path) -> Self {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                warn!(error = %e, "could not read config, using defaults");
                return Self::default();
            }
        };
        match serde_json::from_str(&contents) {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "could not parse config, using defaults");
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents =
            serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = AppConfig::default();
        assert_eq!(config.language, "English");
        assert_eq!(config.theme, Theme::Light);
        assert_eq!(config.sync_mode, SyncMode::Automatic);
        assert_eq!(config.timer.work_minutes, 25);
    }

    #[test]
    fn round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = AppConfig::default();
        config.theme = Theme::Dark;
        config.sync_mode = SyncMode::Manual;
        config.timer.work_minutes = 50;
        config.save(&path).unwrap();

        let loaded = AppConfig::load_or_default(&path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = AppConfig::load_or_default(&dir.path().join("nope.json"));
        assert_eq!(loaded, AppConfig::default());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"theme":"dark"}"#).unwrap();

        let loaded = AppConfig::load_or_default(&path);
        assert_eq!(loaded.theme, Theme::Dark);
        assert_eq!(loaded.sync_mode, SyncMode::Automatic);
        assert_eq!(loaded.timer, TimerSettings::default());
    }
}
