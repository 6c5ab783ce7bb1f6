use crate::alerts::MAX_LABEL_LEN;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Directory name used under `$HOME` (or the temp dir) for reporter state
const DATA_DIR_NAME: &str = ".crash-reporter";

/// Crash reporter configuration
///
/// Every section falls back to its defaults when omitted, so an empty file
/// is a valid configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub notifications: NotificationConfig,
    pub capture: CaptureConfig,
    pub report: ReportConfig,
}

/// Where crash logs and pending notification actions live
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    /// Crash log file (JSON)
    pub path: PathBuf,
    /// Number of crash records kept, newest first
    pub max_records: usize,
    /// Directory holding deferred "copy error" payloads
    pub actions_dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        let dir = default_data_dir();
        Self {
            path: dir.join("crash_logs.json"),
            max_records: 3,
            actions_dir: dir.join("actions"),
        }
    }
}

/// Crash notification settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NotificationConfig {
    pub enabled: bool,
    /// Log notifications instead of showing them
    pub mock: bool,
    pub title: String,
    pub body: String,
    pub action_label: String,
    pub max_per_minute: usize,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            mock: false,
            title: "An error occurred".to_string(),
            body: "An unexpected error happened during runtime. Tap to copy details.".to_string(),
            action_label: "Copy Error".to_string(),
            max_per_minute: 3,
        }
    }
}

/// What the panic hook captures and whether it chains
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CaptureConfig {
    /// Force-capture a backtrace regardless of `RUST_BACKTRACE`
    pub backtrace: bool,
    /// Call the previously installed panic hook after reporting
    pub chain_previous: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            backtrace: true,
            chain_previous: true,
        }
    }
}

/// Bug report submission settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReportConfig {
    /// HTTP endpoint receiving bug reports; submission is disabled when unset
    pub endpoint: Option<String>,
    pub timeout_seconds: u64,
    pub app_version: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_seconds: 30,
            app_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load and validate configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ReadError` if the file cannot be read, a parse
    /// error for malformed TOML, and `ConfigError::ValidationError` for
    /// out-of-range values.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.max_records == 0 {
            return Err(ConfigError::ValidationError(
                "store.max_records must be at least 1".to_string(),
            ));
        }
        if self.notifications.max_per_minute == 0 {
            return Err(ConfigError::ValidationError(
                "notifications.max_per_minute must be at least 1".to_string(),
            ));
        }
        if self.notifications.title.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "notifications.title must not be empty".to_string(),
            ));
        }
        let label = &self.notifications.action_label;
        if label.trim().is_empty() || label.len() > MAX_LABEL_LEN {
            return Err(ConfigError::ValidationError(format!(
                "notifications.action_label must be 1 to {} bytes",
                MAX_LABEL_LEN
            )));
        }
        if self.report.timeout_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "report.timeout_seconds must be at least 1".to_string(),
            ));
        }
        if let Some(ref endpoint) = self.report.endpoint {
            if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                return Err(ConfigError::ValidationError(format!(
                    "report.endpoint must be an http(s) URL, got '{}'",
                    endpoint
                )));
            }
        }
        Ok(())
    }
}

/// `$HOME/.crash-reporter`, or a directory under the temp dir without a home
fn default_data_dir() -> PathBuf {
    match std::env::var_os("HOME") {
        Some(home) if !home.is_empty() => PathBuf::from(home).join(DATA_DIR_NAME),
        _ => std::env::temp_dir().join(DATA_DIR_NAME),
    }
}
