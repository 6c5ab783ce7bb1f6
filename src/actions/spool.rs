use crate::actions::{ActionId, NotificationAction};
use crate::error::ExportError;
use log::debug;
use std::path::{Path, PathBuf};

const PAYLOAD_EXTENSION: &str = "txt";

/// Directory of pending action payloads, one `<action-id>.txt` per action
#[derive(Debug, Clone)]
pub struct ActionSpool {
    dir: PathBuf,
}

impl ActionSpool {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn payload_path(&self, id: &ActionId) -> PathBuf {
        self.dir.join(format!("{}.{}", id.as_str(), PAYLOAD_EXTENSION))
    }

    /// Write the action's payload so it can be triggered later
    pub fn store(&self, action: &NotificationAction) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.payload_path(&action.id);
        std::fs::write(&path, action.payload.as_bytes())?;
        debug!("Spooled action {} to {}", action.id, path.display());
        Ok(path)
    }

    /// Read the payload of a pending action
    ///
    /// # Errors
    ///
    /// Returns `ExportError::UnknownAction` when no such action is pending.
    pub fn load(&self, id: &ActionId) -> Result<String, ExportError> {
        match std::fs::read_to_string(self.payload_path(id)) {
            Ok(payload) => Ok(payload),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ExportError::UnknownAction(id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Drop a pending action; removing an unknown action is not an error
    pub fn remove(&self, id: &ActionId) -> std::io::Result<()> {
        match std::fs::remove_file(self.payload_path(id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Pending action ids, newest first
    pub fn pending(&self) -> std::io::Result<Vec<ActionId>> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut ids = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(PAYLOAD_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if let Ok(id) = ActionId::parse(stem) {
                    ids.push(id);
                }
            }
        }

        ids.sort_by_key(|id| std::cmp::Reverse(id.sort_key()));
        Ok(ids)
    }
}
