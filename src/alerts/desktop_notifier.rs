use crate::actions::ActionSpool;
use crate::alerts::{Notification, Notifier, RateLimiter};
use crate::config::NotificationConfig;
use crate::error::AlertError;
use log::{debug, info, warn};
use std::process::{Command, Stdio};
use std::sync::{Mutex, TryLockError};

/// Maximum notification title length in bytes
const MAX_TITLE_LEN: usize = 256;
/// Maximum notification body length in bytes
const MAX_BODY_LEN: usize = 1024;
/// Maximum action label length in bytes
pub const MAX_LABEL_LEN: usize = 64;

/// How a notification is put on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationBackend {
    /// Log only; used in tests and headless environments
    Mock,
    /// macOS Notification Center via `osascript`
    AppleScript,
    /// freedesktop notifications via `notify-send`
    NotifySend,
}

impl NotificationBackend {
    /// Pick the backend for the current platform
    pub fn detect(mock: bool) -> Self {
        if mock {
            NotificationBackend::Mock
        } else if cfg!(target_os = "macos") {
            NotificationBackend::AppleScript
        } else {
            NotificationBackend::NotifySend
        }
    }
}

/// Shows crash notifications on the desktop
///
/// Desktop notifications cannot carry a callback into a process that is
/// about to exit, so the action payload is spooled first and the body tells
/// the user how to trigger it. Helper processes are spawned and left to run
/// on their own; the panic hook never waits for them.
#[derive(Debug)]
pub struct DesktopNotifier {
    rate_limiter: Mutex<RateLimiter>,
    spool: ActionSpool,
    backend: NotificationBackend,
    /// Command shown to the user for triggering the action
    trigger_command: String,
}

impl DesktopNotifier {
    pub fn new(spool: ActionSpool, backend: NotificationBackend, max_per_minute: usize) -> Self {
        Self {
            rate_limiter: Mutex::new(RateLimiter::per_minute(max_per_minute)),
            spool,
            backend,
            trigger_command: "crash-reporter copy".to_string(),
        }
    }

    /// Build a notifier from configuration
    pub fn from_config(config: &NotificationConfig, spool: ActionSpool) -> Self {
        Self::new(
            spool,
            NotificationBackend::detect(config.mock),
            config.max_per_minute,
        )
    }

    pub fn backend(&self) -> NotificationBackend {
        self.backend
    }

    /// Claim a rate-limit slot without blocking
    ///
    /// Contention means another thread is notifying about a crash right now;
    /// that counts as rate limited.
    fn claim_slot(&self) -> Result<(), AlertError> {
        let acquired = match self.rate_limiter.try_lock() {
            Ok(mut limiter) => limiter.try_acquire(),
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner().try_acquire(),
            Err(TryLockError::WouldBlock) => false,
        };
        if acquired {
            Ok(())
        } else {
            Err(AlertError::RateLimitExceeded)
        }
    }

    fn release_slot(&self) {
        if let Ok(mut limiter) = self.rate_limiter.try_lock() {
            limiter.release_last();
        }
    }

    /// Compose the body: message text, then the instruction for the action
    ///
    /// The message is truncated first so the instruction always survives;
    /// the label is capped so the instruction itself always fits.
    fn format_body(&self, notification: &Notification) -> String {
        let instruction = format!(
            "{}: {} {}",
            truncate_text(&notification.action.label, MAX_LABEL_LEN),
            self.trigger_command,
            notification.action.id
        );
        let room = MAX_BODY_LEN.saturating_sub(instruction.len() + 1);
        let text = truncate_text(&notification.body, room);
        format!("{}\n{}", text, instruction)
    }

    fn show(&self, title: &str, body: &str) -> Result<(), AlertError> {
        match self.backend {
            NotificationBackend::Mock => {
                info!("MOCK NOTIFICATION - Title: {}, Body: {}", title, body);
                Ok(())
            }
            NotificationBackend::AppleScript => {
                let script = format!(
                    r#"display notification "{}" with title "{}" sound name "Basso""#,
                    escape_applescript(body),
                    escape_applescript(title)
                );
                let mut command = Command::new("osascript");
                command.arg("-e").arg(script);
                spawn_detached(command, "osascript")
            }
            NotificationBackend::NotifySend => {
                let mut command = Command::new("notify-send");
                command
                    .arg("--urgency=critical")
                    .arg("--app-name=crash-reporter")
                    .arg(title)
                    .arg(body);
                spawn_detached(command, "notify-send")
            }
        }
    }
}

impl Notifier for DesktopNotifier {
    fn notify(&self, notification: &Notification) -> Result<(), AlertError> {
        self.claim_slot()?;

        if let Err(e) = self.spool.store(&notification.action) {
            self.release_slot();
            return Err(AlertError::ActionSpool(e.to_string()));
        }

        let title = truncate_text(&notification.title, MAX_TITLE_LEN);
        let body = self.format_body(notification);

        match self.show(&title, &body) {
            Ok(()) => {
                info!("Sent crash notification {}", notification.action.id);
                Ok(())
            }
            Err(e) => {
                self.release_slot();
                warn!("Failed to send crash notification: {}", e);
                Err(e)
            }
        }
    }
}

/// Spawn a helper and reap it on a background thread
///
/// The caller is usually a panic hook, so nothing here waits on the child.
fn spawn_detached(mut command: Command, program: &str) -> Result<(), AlertError> {
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| {
            AlertError::NotificationFailed(format!("Failed to execute {}: {}", program, e))
        })?;

    let reaper = std::thread::Builder::new()
        .name("crash-notify-reaper".to_string())
        .spawn(move || {
            let _ = child.wait();
        });
    if let Err(e) = reaper {
        debug!("Could not spawn reaper for {}: {}", program, e);
    }
    Ok(())
}

/// Escape text for an AppleScript string literal
fn escape_applescript(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Truncate text to at most `max_length` bytes, ending in `...` when cut
///
/// Cuts only on UTF-8 character boundaries.
fn truncate_text(text: &str, max_length: usize) -> String {
    if text.len() <= max_length {
        return text.to_string();
    }

    let mut cut = max_length.saturating_sub(3);
    while cut > 0 && !text.is_char_boundary(cut) {
        cut -= 1;
    }

    let ellipsis = &"..."[..max_length.min(3)];
    format!("{}{}", &text[..cut], ellipsis)
}
