use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::defaults::{DEFAULT_LOG_DIR, DEFAULT_LOG_FILTER};

/// Supported logging output formats.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// Structured JSON suitable for ingestion by logging stacks.
    #[default]
    Json,
    /// Human-readable single line output.
    Compact,
}

/// Shorthand verbosity levels accepted by `--log-level`.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, EnumString, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogLevel {
    /// Everything, including per-frame transport traces.
    Trace,
    /// Diagnostic detail.
    Debug,
    /// Lifecycle events.
    Info,
    /// Recoverable problems.
    Warn,
    /// Failures only.
    Error,
}

/// Resolved logging settings shared by both subcommands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    filter: String,
    format: LogFormat,
    file: Option<Utf8PathBuf>,
}

impl LoggingConfig {
    /// Combines the raw logging options.
    ///
    /// A `level` wins over `filter`. When `to_file` is set the log file is
    /// `<dir>/<file_stem>.log`, with `dir` defaulting to `logs`.
    #[must_use]
    pub fn resolve(
        filter: Option<&str>,
        level: Option<LogLevel>,
        format: Option<LogFormat>,
        to_file: bool,
        dir: Option<&Utf8Path>,
        file_stem: &str,
    ) -> Self {
        let directive = match level {
            Some(shorthand) => shorthand.to_string(),
            None => filter.unwrap_or(DEFAULT_LOG_FILTER).to_owned(),
        };
        let file = to_file.then(|| {
            dir.map_or_else(|| Utf8PathBuf::from(DEFAULT_LOG_DIR), Utf8Path::to_path_buf)
                .join(format!("{file_stem}.log"))
        });
        Self {
            filter: directive,
            format: format.unwrap_or_default(),
            file,
        }
    }

    /// Returns the `EnvFilter` directive.
    #[must_use]
    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Returns the output format.
    #[must_use]
    pub const fn format(&self) -> LogFormat {
        self.format
    }

    /// Returns the log file path when file logging is enabled.
    #[must_use]
    pub fn file(&self) -> Option<&Utf8Path> {
        self.file.as_deref()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::resolve(None, None, None, false, None, "scenelink")
    }
}
