use crate::error::StoreError;
use crate::events::CrashRecord;
use crate::store::LogStore;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, TryLockError};
use std::time::Duration;

/// Attempts made to take the write lock before giving up
const LOCK_ATTEMPTS: u32 = 40;
/// Pause between lock attempts
const LOCK_BACKOFF: Duration = Duration::from_millis(5);

/// Crash log kept in a single JSON file
///
/// The file holds at most `max_records` records, newest first. Every write
/// goes to a sibling temp file that is renamed over the log, so a process
/// dying mid-write leaves the previous log intact.
#[derive(Debug)]
pub struct FileLogStore {
    path: PathBuf,
    max_records: usize,
    /// Serialises read-modify-write cycles between panicking threads
    write_lock: Mutex<()>,
}

impl FileLogStore {
    /// Create a store backed by `path`
    ///
    /// The file and its parent directory are created on first append.
    ///
    /// # Arguments
    ///
    /// * `path` - Location of the JSON crash log
    /// * `max_records` - Number of records retained (at least 1)
    pub fn new(path: impl Into<PathBuf>, max_records: usize) -> Self {
        Self {
            path: path.into(),
            max_records: max_records.max(1),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Take the write lock without ever blocking indefinitely
    ///
    /// A thread that panics while holding the lock would otherwise deadlock
    /// inside its own panic hook. A poisoned lock is still usable because
    /// the guarded data is `()`.
    fn acquire(&self) -> Result<MutexGuard<'_, ()>, StoreError> {
        for attempt in 0..LOCK_ATTEMPTS {
            match self.write_lock.try_lock() {
                Ok(guard) => return Ok(guard),
                Err(TryLockError::Poisoned(poisoned)) => return Ok(poisoned.into_inner()),
                Err(TryLockError::WouldBlock) => {
                    if attempt + 1 < LOCK_ATTEMPTS {
                        std::thread::sleep(LOCK_BACKOFF);
                    }
                }
            }
        }
        Err(StoreError::Busy)
    }

    fn read_file(&self) -> Result<Vec<CrashRecord>, StoreError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&contents)
            .map_err(|e| StoreError::Corrupt(format!("{}: {}", self.path.display(), e)))
    }

    fn write_file(&self, records: &[CrashRecord]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let encoded =
            serde_json::to_vec_pretty(records).map_err(|e| StoreError::Encode(e.to_string()))?;

        let tmp = self.temp_path();
        let written =
            std::fs::write(&tmp, encoded).and_then(|()| std::fs::rename(&tmp, &self.path));
        if let Err(e) = written {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }

    /// Sibling temp file, unique per process so concurrent writers never share one
    fn temp_path(&self) -> PathBuf {
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(format!(".{}.tmp", std::process::id()));
        PathBuf::from(tmp)
    }
}

impl LogStore for FileLogStore {
    fn append(&self, record: &CrashRecord) -> Result<(), StoreError> {
        let _guard = self.acquire()?;

        let mut records = match self.read_file() {
            Ok(records) => records,
            Err(StoreError::Corrupt(reason)) => {
                warn!("Discarding unreadable crash log: {}", reason);
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        records.insert(0, record.clone());
        records.truncate(self.max_records);
        self.write_file(&records)?;

        debug!("Saved crash log, total logs: {}", records.len());
        Ok(())
    }

    fn records(&self) -> Result<Vec<CrashRecord>, StoreError> {
        self.read_file()
    }

    fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.acquire()?;

        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        info!("Cleared all crash logs");
        Ok(())
    }
}
