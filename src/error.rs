use thiserror::Error;

/// Errors that can occur while persisting or reading crash records
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Crash log is busy, append skipped")]
    Busy,

    #[error("Failed to encode crash log: {0}")]
    Encode(String),

    #[error("Crash log is corrupt: {0}")]
    Corrupt(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Errors that can occur when sending crash notifications
#[derive(Error, Debug)]
pub enum AlertError {
    #[error("Failed to send notification: {0}")]
    NotificationFailed(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Failed to store notification action: {0}")]
    ActionSpool(String),
}

/// Errors that can occur when delivering a crash payload out of band
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("No pending action with id '{0}'")]
    UnknownAction(String),

    #[error("Invalid action id: {0}")]
    InvalidActionId(String),

    #[error("No clipboard tool available: {0}")]
    NoClipboard(String),

    #[error("Clipboard command failed: {0}")]
    CommandFailed(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Errors that can occur when submitting a bug report
#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("No report endpoint configured")]
    NotConfigured,

    #[error("Report endpoint rejected the submission: {0}")]
    Rejected(String),

    #[error("Failed to read crash logs: {0}")]
    Store(#[from] StoreError),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
}

/// Errors that can occur when registering the crash reporter
#[derive(Error, Debug, PartialEq, Eq)]
pub enum InstallError {
    #[error("Crash reporter is already installed")]
    AlreadyInstalled,
}

/// Errors that can occur during configuration loading
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Invalid configuration value: {0}")]
    ValidationError(String),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}
