//! Structured telemetry initialisation for both subcommands.

use std::fs::{self, File, OpenOptions};
use std::io::{self, IsTerminal};
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use once_cell::sync::OnceCell;
use tracing::{Subscriber, subscriber::SetGlobalDefaultError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::{self, writer::BoxMakeWriter, writer::MakeWriterExt};

use scenelink_config::{LogFormat, LoggingConfig};

static TELEMETRY_GUARD: OnceCell<()> = OnceCell::new();

/// Handle returned when telemetry has been initialised.
#[derive(Debug, Default, Clone, Copy)]
pub struct TelemetryHandle;

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Failed to parse the configured log filter expression.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// Failed to create or open the log file.
    #[error("failed to open log file {path}: {source}")]
    File {
        /// Log file path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Failed to install the tracing subscriber.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
}

/// Configures the global tracing subscriber when invoked for the first time.
///
/// Repeated calls are idempotent: only the first installs a subscriber, and
/// later calls return a fresh [`TelemetryHandle`] without touching global
/// state.
///
/// # Errors
///
/// Returns [`TelemetryError`] when the filter is invalid, the log file
/// cannot be opened, or another subscriber is already installed.
pub fn initialise(config: &LoggingConfig) -> Result<TelemetryHandle, TelemetryError> {
    TELEMETRY_GUARD
        .get_or_try_init(|| install_subscriber(config))
        .map(|_| TelemetryHandle)
}

fn install_subscriber(config: &LoggingConfig) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_new(config.filter())
        .map_err(|error| TelemetryError::Filter(error.to_string()))?;

    let (writer, ansi) = match config.file() {
        Some(path) => {
            let file = Arc::new(open_log_file(path)?);
            (BoxMakeWriter::new(io::stderr.and(file)), false)
        }
        None => (BoxMakeWriter::new(io::stderr), io::stderr().is_terminal()),
    };

    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(writer)
        // Colour codes only on interactive terminals, never in files.
        .with_ansi(ansi)
        .with_timer(fmt::time::UtcTime::rfc_3339());

    let subscriber: Box<dyn Subscriber + Send + Sync> = match config.format() {
        LogFormat::Json => Box::new(builder.json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(builder.compact().finish()),
    };

    tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::Subscriber)
}

/// Opens `path` for appending, creating missing parent directories.
fn open_log_file(path: &Utf8Path) -> Result<File, TelemetryError> {
    let to_error = |source| TelemetryError::File {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|dir| !dir.as_str().is_empty()) {
        fs::create_dir_all(parent).map_err(to_error)?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(to_error)
}
