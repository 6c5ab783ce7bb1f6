//! Core crash types for the crash reporter
//!
//! This module defines the data structures that flow through the reporter:
//! the captured failure itself and the record persisted for it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::backtrace::{Backtrace, BacktraceStatus};
use std::panic::PanicHookInfo;

/// Timestamp type for consistent time handling across the application
pub type Timestamp = DateTime<Utc>;

/// Name reported for threads spawned without one
pub const UNNAMED_THREAD: &str = "<unnamed>";

/// Identity of the execution context a failure happened on
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ThreadIdentity {
    /// Thread name, or `<unnamed>`
    pub name: String,
    /// Runtime thread id, formatted (e.g. `ThreadId(7)`)
    pub id: String,
}

impl ThreadIdentity {
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
        }
    }

    /// Identity of the calling thread
    ///
    /// Inside a panic hook this is the thread that panicked.
    pub fn current() -> Self {
        let thread = std::thread::current();
        Self {
            name: thread.name().unwrap_or(UNNAMED_THREAD).to_string(),
            id: format!("{:?}", thread.id()),
        }
    }
}

/// Underlying cause of an unhandled failure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FailureCause {
    /// Panic message
    pub message: String,
    /// Source location as `file:line:column`, if the runtime reported one
    pub location: Option<String>,
    /// Rendered backtrace, if one was captured
    pub backtrace: Option<String>,
}

/// The single failure kind handled by the reporter: a panic that was not
/// caught by application code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnhandledFailure {
    pub thread: ThreadIdentity,
    pub cause: FailureCause,
}

impl UnhandledFailure {
    pub fn new(thread: ThreadIdentity, cause: FailureCause) -> Self {
        Self { thread, cause }
    }

    /// Build the failure for the current thread from panic hook information
    ///
    /// # Arguments
    ///
    /// * `info` - Panic information handed to the panic hook
    /// * `capture_backtrace` - Whether to force-capture a backtrace
    pub fn from_panic(info: &PanicHookInfo<'_>, capture_backtrace: bool) -> Self {
        let backtrace = if capture_backtrace {
            let bt = Backtrace::force_capture();
            match bt.status() {
                BacktraceStatus::Captured => Some(bt.to_string()),
                _ => None,
            }
        } else {
            None
        };

        Self {
            thread: ThreadIdentity::current(),
            cause: FailureCause {
                message: panic_message(info),
                location: info
                    .location()
                    .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column())),
                backtrace,
            },
        }
    }

    /// Render the full diagnostic trace
    ///
    /// The layout mirrors the default Rust panic output so the text reads
    /// naturally when pasted into a bug report.
    pub fn render_trace(&self) -> String {
        let mut trace = match self.cause.location {
            Some(ref location) => format!(
                "thread '{}' ({}) panicked at {}:\n",
                self.thread.name, self.thread.id, location
            ),
            None => format!(
                "thread '{}' ({}) panicked:\n",
                self.thread.name, self.thread.id
            ),
        };
        trace.push_str(&self.cause.message);

        if let Some(ref backtrace) = self.cause.backtrace {
            trace.push_str("\nstack backtrace:\n");
            trace.push_str(backtrace.trim_end());
        }

        trace
    }

    /// One-line summary used in notifications and logs
    pub fn summary(&self) -> String {
        let first_line = self.cause.message.lines().next().unwrap_or_default();
        format!("thread '{}' panicked: {}", self.thread.name, first_line)
    }
}

/// Extract the panic message from the payload
///
/// Payloads that are neither `&str` nor `String` cannot be rendered.
fn panic_message(info: &PanicHookInfo<'_>) -> String {
    if let Some(s) = info.payload().downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = info.payload().downcast_ref::<String>() {
        s.clone()
    } else {
        "Box<dyn Any>".to_string()
    }
}

/// Persisted representation of one captured failure
///
/// Created once at capture time and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CrashRecord {
    /// When the failure was captured
    pub timestamp: Timestamp,
    /// Full rendered trace
    pub message: String,
    /// Name of the thread that failed
    pub thread_name: String,
}

impl CrashRecord {
    /// Capture a record for a failure at the current time
    pub fn capture(failure: &UnhandledFailure) -> Self {
        Self::capture_at(failure, Utc::now())
    }

    /// Capture a record with an explicit timestamp
    pub fn capture_at(failure: &UnhandledFailure, timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            message: failure.render_trace(),
            thread_name: failure.thread.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn worker_failure(backtrace: Option<&str>) -> UnhandledFailure {
        UnhandledFailure::new(
            ThreadIdentity::new("worker-1", "ThreadId(7)"),
            FailureCause {
                message: "NullPointerException at X".to_string(),
                location: Some("src/worker.rs:42:9".to_string()),
                backtrace: backtrace.map(str::to_string),
            },
        )
    }

    #[test]
    fn test_render_trace_with_location() {
        let trace = worker_failure(None).render_trace();
        assert_eq!(
            trace,
            "thread 'worker-1' (ThreadId(7)) panicked at src/worker.rs:42:9:\nNullPointerException at X"
        );
    }

    #[test]
    fn test_render_trace_without_location() {
        let mut failure = worker_failure(None);
        failure.cause.location = None;
        assert!(failure
            .render_trace()
            .starts_with("thread 'worker-1' (ThreadId(7)) panicked:\n"));
    }

    #[test]
    fn test_render_trace_includes_backtrace() {
        let trace = worker_failure(Some("   0: worker::run\n   1: std::rt\n")).render_trace();
        assert!(trace.contains("\nstack backtrace:\n   0: worker::run\n   1: std::rt"));
        assert!(!trace.ends_with('\n'));
    }

    #[test]
    fn test_summary_uses_first_line() {
        let mut failure = worker_failure(None);
        failure.cause.message = "first line\nsecond line".to_string();
        assert_eq!(failure.summary(), "thread 'worker-1' panicked: first line");
    }

    #[test]
    fn test_current_thread_identity() {
        let handle = std::thread::Builder::new()
            .name("identity-probe".to_string())
            .spawn(ThreadIdentity::current)
            .unwrap();
        let identity = handle.join().unwrap();
        assert_eq!(identity.name, "identity-probe");
        assert!(identity.id.starts_with("ThreadId("));
    }

    #[test]
    fn test_unnamed_thread_identity() {
        let identity = std::thread::spawn(ThreadIdentity::current).join().unwrap();
        assert_eq!(identity.name, UNNAMED_THREAD);
    }

    #[test]
    fn test_crash_record_capture() {
        let failure = worker_failure(None);
        let now = Utc::now();
        let record = CrashRecord::capture_at(&failure, now);

        assert_eq!(record.timestamp, now);
        assert_eq!(record.thread_name, "worker-1");
        assert_eq!(record.message, failure.render_trace());
    }

    #[test]
    fn test_crash_record_serialization() {
        let record = CrashRecord::capture(&worker_failure(None));

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"thread_name\":\"worker-1\""));
        let deserialized: CrashRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record, deserialized);
    }
}
