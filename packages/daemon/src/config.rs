use crate::errors::DaemonResult;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::time::Duration;

pub const DEFAULT_CONFIG_NAME: &str = "markweave.config.json";

/// Per-instance daemon settings. Static for the life of an editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaemonConfig {
    /// Quiet period after the last edit before a flush
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Whether the surface accepts edits at all
    #[serde(default = "default_true")]
    pub editable: bool,

    /// Whether raw edits are captured while editable
    #[serde(default = "default_true")]
    pub observe: bool,

    /// History entries kept (0 = unlimited)
    #[serde(default = "default_history_length")]
    pub history_length: usize,

    #[serde(default)]
    pub log_level: LogLevel,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`
    pub fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

fn default_debounce_ms() -> u64 {
    300
}

fn default_true() -> bool {
    true
}

fn default_history_length() -> usize {
    100
}

impl DaemonConfig {
    /// Load config from a directory, falling back to defaults
    pub fn load(dir: impl AsRef<Path>) -> DaemonResult<Self> {
        let config_path = dir.as_ref().join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: DaemonConfig = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(DaemonConfig::default())
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Observation runs only for an editable surface with capture enabled
    pub fn should_observe(&self) -> bool {
        self.editable && self.observe
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            editable: true,
            observe: true,
            history_length: default_history_length(),
            log_level: LogLevel::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::DaemonError;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "debounceMs": 50,
            "editable": false,
            "historyLength": 10,
            "logLevel": "debug"
        }"#;

        let config: DaemonConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.debounce_ms, 50);
        assert!(!config.editable);
        assert!(config.observe);
        assert_eq!(config.history_length, 10);
        assert_eq!(config.log_level, LogLevel::Debug);
        assert!(!config.should_observe());
    }

    #[test]
    fn test_default_config() {
        let config = DaemonConfig::default();
        assert_eq!(config.debounce(), Duration::from_millis(300));
        assert_eq!(config.log_level.as_filter(), "warn");
        assert!(config.should_observe());
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = DaemonConfig::load(dir.path()).unwrap();
        assert_eq!(config, DaemonConfig::default());
    }

    #[test]
    fn test_load_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_NAME);
        std::fs::write(&path, r#"{ "debounceMs": 5 }"#).unwrap();

        let config = DaemonConfig::load(dir.path()).unwrap();
        assert_eq!(config.debounce_ms, 5);

        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(DaemonConfig::load(dir.path()), Err(DaemonError::Config(_))));
    }
}
