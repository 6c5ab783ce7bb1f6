/// Configuration loading and validation
pub mod conf;

pub use conf::{CaptureConfig, Config, NotificationConfig, ReportConfig, StoreConfig};
