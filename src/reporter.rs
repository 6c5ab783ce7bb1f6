//! The crash reporter and its panic hook
//!
//! [`CrashReporter`] turns an unhandled panic into a persisted
//! [`CrashRecord`] and a desktop notification, then hands the panic on to
//! whichever hook was installed before it so the default diagnostics still
//! appear and the process terminates as it normally would.

use crate::actions::{ActionId, ActionSpool, NotificationAction};
use crate::alerts::{DesktopNotifier, Notification, Notifier};
use crate::config::Config;
use crate::error::InstallError;
use crate::events::{CrashRecord, UnhandledFailure};
use crate::monitoring::{ReporterStats, StatsSnapshot};
use crate::store::{FileLogStore, LogStore};
use log::{error, info, warn};
use std::panic::{self, PanicHookInfo};
use std::sync::{Arc, OnceLock};

/// A panic hook as returned by [`std::panic::take_hook`]
pub type PreviousHook = Box<dyn Fn(&PanicHookInfo<'_>) + Sync + Send + 'static>;

/// Notification wording and capture behaviour
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReporterSettings {
    pub title: String,
    pub body: String,
    pub action_label: String,
    pub capture_backtrace: bool,
    pub chain_previous: bool,
}

impl Default for ReporterSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl ReporterSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            title: config.notifications.title.clone(),
            body: config.notifications.body.clone(),
            action_label: config.notifications.action_label.clone(),
            capture_backtrace: config.capture.backtrace,
            chain_previous: config.capture.chain_previous,
        }
    }
}

/// What happened while reporting one failure
#[derive(Debug, Clone, PartialEq)]
pub struct ReportOutcome {
    /// The record built for the failure, whether or not it was stored
    pub record: CrashRecord,
    pub persisted: bool,
    /// Action id of the posted notification, if one was posted
    pub notification: Option<ActionId>,
}

impl ReportOutcome {
    pub fn notified(&self) -> bool {
        self.notification.is_some()
    }
}

/// Process-wide crash reporter
///
/// Collaborators are injected at construction; [`CrashReporter::install`]
/// registers the reporter as the panic hook exactly once. Every step of the
/// crash path is best-effort: a failing store or notifier is logged and the
/// remaining steps still run.
pub struct CrashReporter {
    store: Arc<dyn LogStore>,
    notifier: Option<Arc<dyn Notifier>>,
    settings: ReporterSettings,
    stats: ReporterStats,
    /// Set once on install; `Some(None)` means installed without a previous hook
    previous: OnceLock<Option<PreviousHook>>,
}

impl CrashReporter {
    pub fn new(
        store: Arc<dyn LogStore>,
        notifier: Option<Arc<dyn Notifier>>,
        settings: ReporterSettings,
    ) -> Self {
        Self {
            store,
            notifier,
            settings,
            stats: ReporterStats::new(),
            previous: OnceLock::new(),
        }
    }

    /// Build a reporter with the file store and desktop notifier from `config`
    pub fn from_config(config: &Config) -> Self {
        let store: Arc<dyn LogStore> = Arc::new(FileLogStore::new(
            config.store.path.clone(),
            config.store.max_records,
        ));

        let notifier: Option<Arc<dyn Notifier>> = if config.notifications.enabled {
            let spool = ActionSpool::new(config.store.actions_dir.clone());
            Some(Arc::new(DesktopNotifier::from_config(
                &config.notifications,
                spool,
            )))
        } else {
            None
        };

        Self::new(store, notifier, ReporterSettings::from_config(config))
    }

    pub fn settings(&self) -> &ReporterSettings {
        &self.settings
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Write the reporter's counters to the log
    pub fn log_stats(&self) {
        self.stats.log_summary();
    }

    pub fn is_installed(&self) -> bool {
        self.previous.get().is_some()
    }

    /// Register as the process-wide panic hook
    ///
    /// The hook installed before this call is kept and chained to when
    /// `chain_previous` is set; otherwise it is replaced.
    ///
    /// # Errors
    ///
    /// Returns `InstallError::AlreadyInstalled` if this reporter was already
    /// installed. The current hook is left untouched in that case.
    pub fn install(self: Arc<Self>) -> Result<(), InstallError> {
        if self.is_installed() {
            return Err(InstallError::AlreadyInstalled);
        }

        let previous = if self.settings.chain_previous {
            Some(panic::take_hook())
        } else {
            None
        };

        self.register(previous).map_err(|previous| {
            if let Some(previous) = previous {
                panic::set_hook(previous);
            }
            InstallError::AlreadyInstalled
        })
    }

    /// Register as the process-wide panic hook with an explicit previous hook
    ///
    /// `None` installs the reporter with nothing to chain to. Whatever hook
    /// is currently registered is dropped.
    pub fn install_with(
        self: Arc<Self>,
        previous: Option<PreviousHook>,
    ) -> Result<(), InstallError> {
        self.register(previous).map_err(|_| InstallError::AlreadyInstalled)
    }

    /// Record the previous hook and swap in our own
    ///
    /// Hands the previous hook back if the reporter was already installed.
    fn register(
        self: Arc<Self>,
        previous: Option<PreviousHook>,
    ) -> Result<(), Option<PreviousHook>> {
        let chained = previous.is_some();
        self.previous.set(previous)?;

        panic::set_hook(Box::new(move |info| self.on_uncaught(info)));

        info!("Crash reporter installed (chaining to previous hook: {})", chained);
        Ok(())
    }

    /// Panic hook entry point
    ///
    /// Reports the failure of the current thread, then calls the previous
    /// hook (if any) with the untouched `info`.
    pub fn on_uncaught(&self, info: &PanicHookInfo<'_>) {
        let failure = UnhandledFailure::from_panic(info, self.settings.capture_backtrace);
        self.report_and_chain(&failure, |previous| previous(info));
    }

    /// Report `failure`, then hand the previous hook to `chain`
    ///
    /// `chain` runs whatever the outcome of reporting was.
    fn report_and_chain(
        &self,
        failure: &UnhandledFailure,
        chain: impl FnOnce(&PreviousHook),
    ) -> ReportOutcome {
        let outcome = self.handle(failure);

        if let Some(Some(previous)) = self.previous.get() {
            self.stats.record_previous_handler_call();
            chain(previous);
        }
        outcome
    }

    /// Persist and notify about one failure
    ///
    /// Never panics and never returns an error: each step's failure is
    /// logged and reflected in the outcome.
    pub fn handle(&self, failure: &UnhandledFailure) -> ReportOutcome {
        self.stats.record_failure();
        error!("Unhandled failure: {}", failure.summary());

        let record = CrashRecord::capture(failure);

        let persisted = match self.store.append(&record) {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to save crash log: {}", e);
                false
            }
        };
        self.stats.record_persist(persisted);

        let notification = self.post_notification(failure, &record.message);

        ReportOutcome {
            record,
            persisted,
            notification,
        }
    }

    fn post_notification(&self, failure: &UnhandledFailure, trace: &str) -> Option<ActionId> {
        let notifier = self.notifier.as_ref()?;

        let notification = Notification {
            title: self.settings.title.clone(),
            body: format!("{}\n{}", self.settings.body, failure.summary()),
            action: NotificationAction {
                id: ActionId::generate(),
                label: self.settings.action_label.clone(),
                payload: trace.to_string(),
            },
        };

        match notifier.notify(&notification) {
            Ok(()) => {
                self.stats.record_notification(true);
                Some(notification.action.id)
            }
            Err(e) => {
                warn!("Crash notification not shown: {}", e);
                self.stats.record_notification(false);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::MockNotifier;
    use crate::error::{AlertError, StoreError};
    use crate::events::{FailureCause, ThreadIdentity};
    use crate::store::MockLogStore;
    use mockall::Sequence;

    fn worker_failure() -> UnhandledFailure {
        UnhandledFailure::new(
            ThreadIdentity::new("worker-1", "ThreadId(4)"),
            FailureCause {
                message: "NullPointerException at X".to_string(),
                location: Some("src/worker.rs:10:5".to_string()),
                backtrace: None,
            },
        )
    }

    fn reporter(store: MockLogStore, notifier: Option<MockNotifier>) -> CrashReporter {
        CrashReporter::new(
            Arc::new(store),
            notifier.map(|n| Arc::new(n) as Arc<dyn Notifier>),
            ReporterSettings::default(),
        )
    }

    #[test]
    fn test_persists_exactly_one_record_then_notifies() {
        let mut seq = Sequence::new();
        let mut store = MockLogStore::new();
        store
            .expect_append()
            .withf(|record| {
                record.thread_name == "worker-1"
                    && record.message.contains("NullPointerException at X")
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        let mut notifier = MockNotifier::new();
        notifier
            .expect_notify()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        let reporter = reporter(store, Some(notifier));
        let outcome = reporter.handle(&worker_failure());

        assert!(outcome.persisted);
        assert!(outcome.notified());
        assert_eq!(outcome.record.thread_name, "worker-1");
    }

    #[test]
    fn test_store_failure_does_not_prevent_notification() {
        let mut store = MockLogStore::new();
        store
            .expect_append()
            .times(1)
            .returning(|_| Err(StoreError::Busy));

        let mut notifier = MockNotifier::new();
        notifier.expect_notify().times(1).returning(|_| Ok(()));

        let reporter = reporter(store, Some(notifier));
        let outcome = reporter.handle(&worker_failure());

        assert!(!outcome.persisted);
        assert!(outcome.notified());
        assert_eq!(reporter.stats().persist_failures, 1);
        assert_eq!(reporter.stats().notifications_sent, 1);
    }

    #[test]
    fn test_notifier_failure_is_swallowed() {
        let mut store = MockLogStore::new();
        store.expect_append().times(1).returning(|_| Ok(()));

        let mut notifier = MockNotifier::new();
        notifier.expect_notify().times(1).returning(|_| {
            Err(AlertError::NotificationFailed(
                "notification service unavailable".to_string(),
            ))
        });

        let reporter = reporter(store, Some(notifier));
        let outcome = reporter.handle(&worker_failure());

        assert!(outcome.persisted);
        assert!(!outcome.notified());
        assert_eq!(reporter.stats().notification_failures, 1);
    }

    #[test]
    fn test_previous_hook_runs_after_failed_store_and_notifier() {
        let mut store = MockLogStore::new();
        store
            .expect_append()
            .times(1)
            .returning(|_| Err(StoreError::Busy));

        let mut notifier = MockNotifier::new();
        notifier.expect_notify().times(1).returning(|_| {
            Err(AlertError::NotificationFailed(
                "notification service unavailable".to_string(),
            ))
        });

        let reporter = reporter(store, Some(notifier));
        let noop: PreviousHook = Box::new(|_| {});
        assert!(reporter.previous.set(Some(noop)).is_ok());

        let mut chained = 0;
        let outcome = reporter.report_and_chain(&worker_failure(), |_| chained += 1);

        assert!(!outcome.persisted);
        assert!(!outcome.notified());
        assert_eq!(chained, 1);
        assert_eq!(reporter.stats().previous_handler_calls, 1);
    }

    #[test]
    fn test_nothing_chained_without_previous_hook() {
        let mut store = MockLogStore::new();
        store.expect_append().times(1).returning(|_| Ok(()));

        let reporter = reporter(store, None);
        assert!(reporter.previous.set(None).is_ok());

        let mut chained = 0;
        reporter.report_and_chain(&worker_failure(), |_| chained += 1);

        assert_eq!(chained, 0);
        assert_eq!(reporter.stats().previous_handler_calls, 0);
    }

    #[test]
    fn test_notification_carries_summary_and_full_trace() {
        let failure = worker_failure();
        let expected_trace = failure.render_trace();

        let mut store = MockLogStore::new();
        store.expect_append().returning(|_| Ok(()));

        let mut notifier = MockNotifier::new();
        notifier
            .expect_notify()
            .withf(move |n| {
                n.title == "An error occurred"
                    && n.body.contains("thread 'worker-1' panicked: NullPointerException at X")
                    && n.action.label == "Copy Error"
                    && n.action.payload == expected_trace
            })
            .times(1)
            .returning(|_| Ok(()));

        let reporter = reporter(store, Some(notifier));
        let outcome = reporter.handle(&failure);
        assert_eq!(outcome.record.message, failure.render_trace());
    }

    #[test]
    fn test_without_notifier() {
        let mut store = MockLogStore::new();
        store.expect_append().times(1).returning(|_| Ok(()));

        let reporter = reporter(store, None);
        let outcome = reporter.handle(&worker_failure());

        assert!(outcome.persisted);
        assert!(!outcome.notified());
        assert_eq!(reporter.stats().failures_handled, 1);
    }

    #[test]
    fn test_each_invocation_persists_once() {
        let mut store = MockLogStore::new();
        store.expect_append().times(3).returning(|_| Ok(()));

        let reporter = reporter(store, None);
        for _ in 0..3 {
            reporter.handle(&worker_failure());
        }

        let stats = reporter.stats();
        assert_eq!(stats.failures_handled, 3);
        assert_eq!(stats.records_persisted, 3);
    }

    #[test]
    fn test_not_installed_initially() {
        let reporter = reporter(MockLogStore::new(), None);
        assert!(!reporter.is_installed());
        assert_eq!(reporter.stats().previous_handler_calls, 0);
    }

    #[test]
    fn test_settings_from_config() {
        let mut config = Config::default();
        config.notifications.title = "Crashed".to_string();
        config.capture.chain_previous = false;

        let settings = ReporterSettings::from_config(&config);
        assert_eq!(settings.title, "Crashed");
        assert!(!settings.chain_previous);
        assert!(settings.capture_backtrace);
    }
}
