//! Deferred notification actions
//!
//! A crash notification cannot call back into the process that raised it:
//! by the time anyone acts on it the process is usually gone. The action's
//! payload is therefore spooled to disk under an [`ActionId`] and delivered
//! later by a separate invocation (`crash-reporter copy <id>`).

pub mod dispatcher;
pub mod spool;

pub use dispatcher::ActionDispatcher;
pub use spool::ActionSpool;

use crate::error::ExportError;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Per-process sequence; with the pid it keeps ids unique within one millisecond
static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Identifier a user passes back to trigger a deferred action
///
/// Format: `crash-<unix-millis>-<pid>-<sequence>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActionId(String);

impl ActionId {
    /// Generate a fresh id for the current time
    pub fn generate() -> Self {
        let millis = chrono::Utc::now().timestamp_millis().max(0);
        let sequence = SEQUENCE.fetch_add(1, Ordering::Relaxed);
        Self(format!(
            "crash-{}-{}-{}",
            millis,
            std::process::id(),
            sequence
        ))
    }

    /// Parse a user-supplied id
    ///
    /// Only ASCII alphanumerics and `-` are accepted, so an id can never
    /// name a path outside the spool directory.
    pub fn parse(raw: &str) -> Result<Self, ExportError> {
        let raw = raw.trim();
        let valid = !raw.is_empty()
            && raw.len() <= 64
            && raw.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
        if valid {
            Ok(Self(raw.to_string()))
        } else {
            Err(ExportError::InvalidActionId(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `(millis, pid, sequence)` for ids this crate generated, used for ordering
    fn sort_key(&self) -> (u64, u64, u64) {
        let mut parts = self
            .0
            .trim_start_matches("crash-")
            .splitn(3, '-')
            .map(|p| p.parse().unwrap_or(0));
        let millis = parts.next().unwrap_or(0);
        let pid = parts.next().unwrap_or(0);
        let sequence = parts.next().unwrap_or(0);
        (millis, pid, sequence)
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Action attached to a crash notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationAction {
    pub id: ActionId,
    /// Button or instruction label, e.g. "Copy Error"
    pub label: String,
    /// Full trace text handed to the export sink when triggered
    pub payload: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique_and_parseable() {
        let a = ActionId::generate();
        let b = ActionId::generate();

        assert_ne!(a, b);
        assert!(a.as_str().starts_with("crash-"));
        assert_eq!(ActionId::parse(a.as_str()).unwrap(), a);
    }

    #[test]
    fn test_parse_rejects_path_traversal() {
        assert!(matches!(
            ActionId::parse("../etc/passwd"),
            Err(ExportError::InvalidActionId(_))
        ));
        assert!(ActionId::parse("").is_err());
        assert!(ActionId::parse("crash 1").is_err());
    }

    #[test]
    fn test_generated_id_names_the_process() {
        let id = ActionId::generate();
        let parts: Vec<&str> = id.as_str().split('-').collect();

        assert_eq!(parts.len(), 4);
        assert_eq!(parts[2], std::process::id().to_string());
        assert_eq!(id.sort_key().1, u64::from(std::process::id()));
    }

    #[test]
    fn test_same_millisecond_in_two_processes_differs() {
        let first = ActionId::parse("crash-2000-311-0").unwrap();
        let second = ActionId::parse("crash-2000-412-0").unwrap();

        assert_ne!(first, second);
        assert_ne!(first.sort_key(), second.sort_key());
    }

    #[test]
    fn test_sort_key_orders_by_time_first() {
        let older = ActionId::parse("crash-1000-900-5").unwrap();
        let newer = ActionId::parse("crash-2000-100-1").unwrap();
        let newest = ActionId::parse("crash-2000-100-2").unwrap();

        assert!(older.sort_key() < newer.sort_key());
        assert!(newer.sort_key() < newest.sort_key());
    }
}
