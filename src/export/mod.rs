/// Out-of-band delivery of crash payloads
pub mod clipboard;

pub use clipboard::ClipboardExporter;

use crate::error::ExportError;
use std::future::Future;
use std::pin::Pin;
use tokio::io::AsyncWriteExt;

/// Destination for a crash payload once the user triggers the copy action
///
/// Delivery never happens on the crash path; it runs later from a separate
/// invocation, so implementations are free to be asynchronous.
pub trait ExportSink: Send + Sync {
    fn deliver<'a>(
        &'a self,
        payload: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), ExportError>> + Send + 'a>>;

    /// Short human-readable name used in log messages
    fn name(&self) -> &'static str;
}

/// Writes the payload to standard output
#[derive(Debug, Default)]
pub struct StdoutExporter;

impl ExportSink for StdoutExporter {
    fn deliver<'a>(
        &'a self,
        payload: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), ExportError>> + Send + 'a>> {
        Box::pin(async move {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(payload.as_bytes()).await?;
            if !payload.ends_with('\n') {
                stdout.write_all(b"\n").await?;
            }
            stdout.flush().await?;
            Ok(())
        })
    }

    fn name(&self) -> &'static str {
        "stdout"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stdout_exporter_delivers() {
        let exporter = StdoutExporter;
        assert!(exporter.deliver("trace text").await.is_ok());
        assert_eq!(exporter.name(), "stdout");
    }
}
