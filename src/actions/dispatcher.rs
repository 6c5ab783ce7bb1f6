use crate::actions::{ActionId, ActionSpool};
use crate::error::ExportError;
use crate::export::ExportSink;
use log::{info, warn};

/// Delivers spooled action payloads to an export sink
///
/// This is the receiving end of a notification's "Copy Error" action. It is
/// driven by user interaction, never from the crash path.
pub struct ActionDispatcher {
    spool: ActionSpool,
    sink: Box<dyn ExportSink>,
}

impl ActionDispatcher {
    pub fn new(spool: ActionSpool, sink: Box<dyn ExportSink>) -> Self {
        Self { spool, sink }
    }

    /// Deliver the payload of a pending action and retire the action
    ///
    /// The spool entry is removed only after a successful delivery, so a
    /// failed copy can be retried.
    ///
    /// # Errors
    ///
    /// Returns `ExportError::UnknownAction` if `id` is not pending, or the
    /// sink's error if delivery fails.
    pub async fn trigger(&self, id: &ActionId) -> Result<(), ExportError> {
        let payload = self.spool.load(id)?;
        self.sink.deliver(&payload).await?;

        if let Err(e) = self.spool.remove(id) {
            warn!("Delivered action {} but could not remove it: {}", id, e);
        }
        info!("Delivered action {} via {}", id, self.sink.name());
        Ok(())
    }

    /// Trigger the most recent pending action, if any
    pub async fn trigger_latest(&self) -> Result<Option<ActionId>, ExportError> {
        let latest = self.spool.pending()?.into_iter().next();
        match latest {
            Some(id) => {
                self.trigger(&id).await?;
                Ok(Some(id))
            }
            None => Ok(None),
        }
    }
}
