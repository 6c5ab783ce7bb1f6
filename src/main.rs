use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use crash_reporter::actions::{ActionDispatcher, ActionId, ActionSpool};
use crash_reporter::config::Config;
use crash_reporter::error::ConfigError;
use crash_reporter::export::{ClipboardExporter, ExportSink, StdoutExporter};
use crash_reporter::store::{FileLogStore, LogStore};
use crash_reporter::submit::ReportSubmitter;
use crash_reporter::CrashReporter;
use log::{error, info, warn};
use std::path::PathBuf;
use std::sync::Arc;

/// Command-line arguments for the crash reporter
#[derive(Parser)]
#[command(
    name = "crash-reporter",
    about = "Crash reporting hook - persists unhandled panics and lets you copy or submit them",
    long_about = "Records unhandled panics to a small on-disk crash log, posts a desktop \
                  notification with a \"Copy Error\" action, and submits bug reports with the \
                  latest crash attached."
)]
struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        global = true,
        value_name = "FILE",
        help = "Configuration file path (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(
        short,
        long,
        global = true,
        help = "Enable verbose logging output (sets RUST_LOG=debug)"
    )]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// List stored crash logs, newest first
    List,
    /// Print the full trace of a stored crash log
    Show {
        /// Position in the list (0 is the newest)
        #[arg(default_value_t = 0)]
        index: usize,
    },
    /// Delete all stored crash logs
    Clear,
    /// List notification actions that have not been triggered yet
    Pending,
    /// Copy the trace behind a crash notification
    Copy {
        /// Action id from the notification; defaults to the latest
        action_id: Option<String>,
        /// Write the trace to stdout instead of the clipboard
        #[arg(long)]
        stdout: bool,
    },
    /// Submit a bug report with the latest crash log attached
    Submit {
        /// Additional notes for the report
        #[arg(long)]
        notes: Option<String>,
    },
    /// Install the reporter and panic on a worker thread
    Demo {
        /// Name of the thread that panics
        #[arg(long, default_value = "worker-1")]
        thread: String,
        /// Panic message
        #[arg(long, default_value = "simulated failure")]
        message: String,
    },
}

impl Cli {
    /// Validate the CLI arguments
    ///
    /// # Returns
    ///
    /// `Ok(())` if all arguments are valid, `Err(String)` with error message otherwise
    fn validate(&self) -> Result<(), String> {
        if let Some(ref config_path) = self.config {
            // Missing files fall back to defaults in load_config
            if config_path.exists() {
                if !config_path.is_file() {
                    return Err(format!(
                        "Configuration path is not a file: {}",
                        config_path.display()
                    ));
                }

                if let Some(extension) = config_path.extension() {
                    if extension != "toml" {
                        warn!(
                            "Configuration file does not have .toml extension: {}",
                            config_path.display()
                        );
                    }
                }
            }
        }

        if let Command::Demo { ref thread, .. } = self.command {
            if thread.contains('\0') {
                return Err("Thread name must not contain NUL bytes".to_string());
            }
        }

        Ok(())
    }

    /// Convert config path to string safely, handling non-UTF-8 paths
    fn config_path_str(&self) -> Result<Option<&str>, String> {
        match &self.config {
            Some(path) => match path.to_str() {
                Some(path_str) => Ok(Some(path_str)),
                None => Err(format!(
                    "Configuration file path contains invalid UTF-8 characters: {}",
                    path.display()
                )),
            },
            None => Ok(None),
        }
    }
}

/// Load configuration from file or use defaults
///
/// Unreadable or invalid files are reported and replaced by the defaults.
fn load_config(config_path: Option<&str>) -> Result<Config, ConfigError> {
    match config_path {
        Some(path) => {
            info!("Loading configuration from: {}", path);
            match Config::from_file(std::path::Path::new(path)) {
                Ok(config) => Ok(config),
                Err(ConfigError::ReadError(_)) => {
                    warn!(
                        "Configuration file '{}' not found or unreadable, using defaults",
                        path
                    );
                    Ok(Config::default())
                }
                Err(e) => {
                    error!("Configuration error in '{}': {}", path, e);
                    warn!("Using default configuration due to invalid config file");
                    Ok(Config::default())
                }
            }
        }
        None => {
            info!("Using default configuration");
            Ok(Config::default())
        }
    }
}

fn open_store(config: &Config) -> Arc<FileLogStore> {
    Arc::new(FileLogStore::new(
        config.store.path.clone(),
        config.store.max_records,
    ))
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or("")
}

fn run(command: Command, config: Config) -> Result<()> {
    match command {
        Command::List => {
            let records = open_store(&config).records()?;
            if records.is_empty() {
                println!("No crash logs recorded");
            }
            for (index, record) in records.iter().enumerate() {
                println!(
                    "[{}] {} {}: {}",
                    index,
                    record.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    record.thread_name,
                    first_line(&record.message)
                );
            }
        }
        Command::Show { index } => {
            let records = open_store(&config).records()?;
            match records.get(index) {
                Some(record) => println!("{}", record.message),
                None => bail!(
                    "No crash log at index {} ({} stored)",
                    index,
                    records.len()
                ),
            }
        }
        Command::Clear => {
            open_store(&config).clear()?;
            println!("Crash logs cleared");
        }
        Command::Pending => {
            let pending = ActionSpool::new(config.store.actions_dir.clone()).pending()?;
            if pending.is_empty() {
                println!("No pending crash actions");
            }
            for id in pending {
                println!("{}", id);
            }
        }
        Command::Copy { action_id, stdout } => {
            let sink: Box<dyn ExportSink> = if stdout {
                Box::new(StdoutExporter)
            } else {
                Box::new(ClipboardExporter::new())
            };
            let dispatcher =
                ActionDispatcher::new(ActionSpool::new(config.store.actions_dir.clone()), sink);
            let runtime = tokio::runtime::Runtime::new()?;

            let delivered = match action_id {
                Some(raw) => {
                    let id = ActionId::parse(&raw)?;
                    runtime
                        .block_on(dispatcher.trigger(&id))
                        .with_context(|| format!("Failed to copy crash action {}", id))?;
                    Some(id)
                }
                None => runtime
                    .block_on(dispatcher.trigger_latest())
                    .context("Failed to copy latest crash action")?,
            };

            match delivered {
                Some(_) if !stdout => println!("Error copied to clipboard"),
                Some(_) => {}
                None => println!("No pending crash actions"),
            }
        }
        Command::Submit { notes } => {
            let store: Arc<dyn LogStore> = open_store(&config);
            let submitter = ReportSubmitter::new(&config.report, store)?;
            let runtime = tokio::runtime::Runtime::new()?;
            let report = runtime
                .block_on(submitter.submit(notes))
                .context("Failed to submit bug report")?;
            println!("Bug report {} submitted", report.request_id);
        }
        Command::Demo { thread, message } => {
            let reporter = Arc::new(CrashReporter::from_config(&config));
            Arc::clone(&reporter).install()?;

            let worker = std::thread::Builder::new()
                .name(thread.clone())
                .spawn(move || {
                    panic!("{}", message);
                })?;
            if worker.join().is_ok() {
                bail!("Thread '{}' did not panic", thread);
            }

            reporter.log_stats();
            let stats = reporter.stats();
            println!(
                "Handled {} failure(s), persisted {}, notified {}",
                stats.failures_handled, stats.records_persisted, stats.notifications_sent
            );
            println!("Run `crash-reporter copy` to copy the trace");
        }
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    if cli.verbose {
        std::env::set_var("RUST_LOG", "debug");
    }
    env_logger::init();

    if let Err(e) = cli.validate() {
        error!("Invalid arguments: {}", e);
        std::process::exit(1);
    }

    let config_path = match cli.config_path_str() {
        Ok(path) => path,
        Err(e) => {
            error!("Invalid configuration path: {}", e);
            std::process::exit(1);
        }
    };

    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(cli.command, config) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}
