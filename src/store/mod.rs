/// Crash log storage
pub mod file_store;

pub use file_store::FileLogStore;

use crate::error::StoreError;
use crate::events::CrashRecord;

/// Persistent store for crash records
///
/// `append` is called from inside the panic hook, so implementations must
/// not block indefinitely and must report failures as errors rather than
/// panicking.
#[cfg_attr(test, mockall::automock)]
pub trait LogStore: Send + Sync {
    /// Persist one crash record
    fn append(&self, record: &CrashRecord) -> Result<(), StoreError>;

    /// All stored records, newest first
    fn records(&self) -> Result<Vec<CrashRecord>, StoreError>;

    /// The most recent record, if any
    fn last(&self) -> Result<Option<CrashRecord>, StoreError> {
        Ok(self.records()?.into_iter().next())
    }

    /// Remove all stored records
    fn clear(&self) -> Result<(), StoreError>;
}
