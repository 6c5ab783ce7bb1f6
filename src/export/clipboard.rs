use crate::error::ExportError;
use crate::export::ExportSink;
use log::{debug, info, warn};
use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// A clipboard helper program and the arguments that make it read stdin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ClipboardCommand {
    pub fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

/// Copies the payload to the system clipboard
///
/// Pipes the payload into the first available helper: `pbcopy` on macOS,
/// otherwise `wl-copy`, `xclip` or `xsel`.
#[derive(Debug, Clone)]
pub struct ClipboardExporter {
    candidates: Vec<ClipboardCommand>,
}

impl Default for ClipboardExporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ClipboardExporter {
    pub fn new() -> Self {
        Self::with_commands(Self::platform_commands())
    }

    /// Use an explicit list of helpers, tried in order
    pub fn with_commands(candidates: Vec<ClipboardCommand>) -> Self {
        Self { candidates }
    }

    fn platform_commands() -> Vec<ClipboardCommand> {
        if cfg!(target_os = "macos") {
            vec![ClipboardCommand::new("pbcopy", &[])]
        } else {
            vec![
                ClipboardCommand::new("wl-copy", &[]),
                ClipboardCommand::new("xclip", &["-selection", "clipboard"]),
                ClipboardCommand::new("xsel", &["--clipboard", "--input"]),
            ]
        }
    }

    /// Run one helper with the payload on stdin
    ///
    /// Returns `Ok(false)` when the program is not installed so the next
    /// candidate can be tried. Helpers such as `xclip` fork a process that
    /// keeps serving the selection, so only the exit status is awaited and
    /// no output pipe is left open for that process to hold.
    async fn run(command: &ClipboardCommand, payload: &str) -> Result<bool, ExportError> {
        let spawned = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Clipboard helper '{}' not found", command.program);
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        };

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(payload.as_bytes()).await?;
            stdin.shutdown().await?;
        }

        let status = child.wait().await?;
        if !status.success() {
            return Err(ExportError::CommandFailed(format!(
                "{} failed with status {}",
                command.program, status
            )));
        }

        Ok(true)
    }
}

impl ExportSink for ClipboardExporter {
    fn deliver<'a>(
        &'a self,
        payload: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), ExportError>> + Send + 'a>> {
        Box::pin(async move {
            let mut last_failure = None;
            for command in &self.candidates {
                match Self::run(command, payload).await {
                    Ok(true) => {
                        info!("Error copied to clipboard via {}", command.program);
                        return Ok(());
                    }
                    Ok(false) => {}
                    // An installed helper can still fail, e.g. wl-copy outside Wayland
                    Err(ExportError::CommandFailed(reason)) => {
                        warn!("Clipboard helper failed, trying next: {}", reason);
                        last_failure = Some(ExportError::CommandFailed(reason));
                    }
                    Err(e) => return Err(e),
                }
            }

            if let Some(failure) = last_failure {
                return Err(failure);
            }
            let tried: Vec<&str> = self.candidates.iter().map(|c| c.program.as_str()).collect();
            Err(ExportError::NoClipboard(format!("tried {}", tried.join(", "))))
        })
    }

    fn name(&self) -> &'static str {
        "clipboard"
    }
}
