/// Crash notifications and rate limiting
pub mod desktop_notifier;
pub mod rate_limiter;

pub use desktop_notifier::{DesktopNotifier, NotificationBackend, MAX_LABEL_LEN};
pub use rate_limiter::RateLimiter;

use crate::actions::NotificationAction;
use crate::error::AlertError;

/// A user-visible crash notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    /// Deferred action delivering the full trace
    pub action: NotificationAction,
}

/// Operator-facing notification channel
///
/// Called from inside the panic hook: implementations must return errors
/// instead of panicking and must not block on locks held elsewhere.
#[cfg_attr(test, mockall::automock)]
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &Notification) -> Result<(), AlertError>;
}
