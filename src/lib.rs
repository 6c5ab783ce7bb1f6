/// Error types for the crash reporter
pub mod error;

/// Failure and crash record types
pub mod events;

/// Configuration management
pub mod config;

/// Persistent crash log storage
pub mod store;

/// Crash notifications and rate limiting
pub mod alerts;

/// Deferred notification actions
pub mod actions;

/// Out-of-band delivery of crash traces
pub mod export;

/// The panic hook
pub mod reporter;

/// Bug report submission
pub mod submit;

/// Self-monitoring counters
pub mod monitoring;

// Re-export commonly used types
pub use error::{AlertError, ConfigError, ExportError, InstallError, StoreError, SubmitError};
pub use events::{CrashRecord, UnhandledFailure};
pub use reporter::CrashReporter;
