//! Bug report submission
//!
//! Bundles the most recent crash log with a description of the machine and
//! posts it to a help-desk endpoint. Crash logs are cleared once the
//! endpoint accepts the report.

use crate::config::ReportConfig;
use crate::error::SubmitError;
use crate::events::Timestamp;
use crate::store::LogStore;
use chrono::Utc;
use log::{info, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Description of the machine a report is sent from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceInfo {
    pub os: String,
    pub release: String,
    pub machine: String,
    pub hostname: String,
    pub captured_at: Timestamp,
}

impl DeviceInfo {
    /// Describe the current machine
    pub fn collect() -> Self {
        let (os, release, machine, hostname) = uname().unwrap_or_else(|| {
            (
                std::env::consts::OS.to_string(),
                "unknown".to_string(),
                std::env::consts::ARCH.to_string(),
                "unknown".to_string(),
            )
        });

        Self {
            os,
            release,
            machine,
            hostname,
            captured_at: Utc::now(),
        }
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Host: {}", self.hostname)?;
        writeln!(f, "OS: {} {}", self.os, self.release)?;
        writeln!(f, "Machine: {}", self.machine)?;
        write!(
            f,
            "Timestamp: {}",
            self.captured_at.format("%Y-%m-%d %H:%M:%S")
        )
    }
}

#[cfg(unix)]
fn uname() -> Option<(String, String, String, String)> {
    // SAFETY: utsname is plain old data and uname only writes into it
    let mut name: libc::utsname = unsafe { std::mem::zeroed() };
    if unsafe { libc::uname(&mut name) } != 0 {
        return None;
    }

    fn field(raw: &[libc::c_char]) -> String {
        let bytes: Vec<u8> = raw
            .iter()
            .take_while(|&&c| c != 0)
            .map(|&c| c as u8)
            .collect();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    Some((
        field(&name.sysname),
        field(&name.release),
        field(&name.machine),
        field(&name.nodename),
    ))
}

#[cfg(not(unix))]
fn uname() -> Option<(String, String, String, String)> {
    None
}

/// Bug report posted to the help-desk endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BugReport {
    pub request_id: String,
    pub feedback_type: String,
    /// Most recent crash trace, if one was recorded
    pub error_details: Option<String>,
    pub additional_notes: Option<String>,
    pub timestamp: Timestamp,
    pub status: String,
    pub app_version: String,
    pub device_info: DeviceInfo,
}

impl BugReport {
    pub fn new(
        error_details: Option<String>,
        additional_notes: Option<String>,
        app_version: &str,
        device_info: DeviceInfo,
    ) -> Self {
        let timestamp = Utc::now();
        Self {
            request_id: format!("{}-{}", timestamp.timestamp_millis(), std::process::id()),
            feedback_type: "bug_report".to_string(),
            error_details,
            additional_notes,
            timestamp,
            status: "pending".to_string(),
            app_version: app_version.to_string(),
            device_info,
        }
    }
}

/// Posts bug reports to the configured endpoint
pub struct ReportSubmitter {
    client: Client,
    endpoint: String,
    app_version: String,
    store: Arc<dyn LogStore>,
}

impl ReportSubmitter {
    /// Create a submitter for the configured endpoint
    ///
    /// # Errors
    ///
    /// Returns `SubmitError::NotConfigured` when no endpoint is set.
    pub fn new(config: &ReportConfig, store: Arc<dyn LogStore>) -> Result<Self, SubmitError> {
        let endpoint = config
            .endpoint
            .clone()
            .ok_or(SubmitError::NotConfigured)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .no_proxy()
            .build()?;

        Ok(Self {
            client,
            endpoint,
            app_version: config.app_version.clone(),
            store,
        })
    }

    /// Assemble a report from the latest crash log without sending it
    pub fn build_report(&self, notes: Option<String>) -> Result<BugReport, SubmitError> {
        let last = self.store.last()?;
        Ok(BugReport::new(
            last.map(|record| record.message),
            notes,
            &self.app_version,
            DeviceInfo::collect(),
        ))
    }

    /// Send a report and clear the crash logs it covered
    ///
    /// A failure to clear the logs after a successful submission is only
    /// logged: the report has already been accepted.
    pub async fn submit(&self, notes: Option<String>) -> Result<BugReport, SubmitError> {
        let report = self.build_report(notes)?;

        let response = self
            .client
            .post(&self.endpoint)
            .json(&report)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SubmitError::Rejected(format!(
                "{}: {}",
                status,
                body.trim()
            )));
        }

        info!("Submitted bug report {}", report.request_id);

        if let Err(e) = self.store.clear() {
            warn!("Bug report sent but crash logs were not cleared: {}", e);
        }
        Ok(report)
    }
}
