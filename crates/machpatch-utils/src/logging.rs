//! # Logging Utilities
//!
//! Logging infrastructure for machpatch using `tracing`.
//!
//! Diagnostics go to **stderr** so they never interleave with the status
//! lines the CLI prints on stdout. Supported:
//! - Pretty (ANSI) or JSON output
//! - `RUST_LOG` filters
//! - An optional log file
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use machpatch_utils::init_logging;
//!
//! // Reads RUST_LOG, MACHPATCH_LOG_FORMAT and MACHPATCH_LOG_FILE
//! let _guard = init_logging().expect("Failed to initialize logging");
//!
//! tracing::warn!("shown by default");
//! tracing::debug!("shown with RUST_LOG=debug");
//! ```
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: filter (e.g. `RUST_LOG=debug`, `RUST_LOG=machpatch_core=trace`), default `warn`
//! - `MACHPATCH_LOG_FORMAT`: `json` or `pretty` (default: `pretty`)
//! - `MACHPATCH_LOG_FILE`: also write logs to this file
//!
//! The returned [`LoggingGuard`] flushes the file writer when dropped; keep
//! it alive for the whole run.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::{env, io};

use tracing::{Level, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::fmt::{self};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Environment variable selecting the output format
pub const LOG_FORMAT_ENV: &str = "MACHPATCH_LOG_FORMAT";

/// Environment variable naming an additional log file
pub const LOG_FILE_ENV: &str = "MACHPATCH_LOG_FILE";

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat
{
    /// Pretty-printed, human-readable format
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat
{
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "pretty" | "dev" | "development" => Ok(LogFormat::Pretty),
            "json" | "prod" | "production" => Ok(LogFormat::Json),
            _ => Err(LoggingError::InvalidFormat(s.to_string())),
        }
    }
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel
{
    Error,
    /// Default when nothing else is configured
    Warn,
    Info,
    /// Selected by `--verbose`
    Debug,
    Trace,
}

impl From<LogLevel> for Level
{
    fn from(level: LogLevel) -> Self
    {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

impl FromStr for LogLevel
{
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "error" | "err" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" | "dbg" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(LoggingError::InvalidLevel(s.to_string())),
        }
    }
}

/// Keeps the background file writer alive; logs are flushed on drop
#[derive(Debug, Default)]
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard
{
    file: Option<WorkerGuard>,
}

impl LoggingGuard
{
    /// Whether a log file is being written
    pub fn has_file(&self) -> bool
    {
        self.file.is_some()
    }
}

/// Initialize logging from the environment
///
/// ## Errors
///
/// - `InvalidFormat` when `MACHPATCH_LOG_FORMAT` is set to something unknown
/// - `InitializationFailed` when a global subscriber is already installed
/// - `FileError` when `MACHPATCH_LOG_FILE` cannot be created
pub fn init_logging() -> Result<LoggingGuard, LoggingError>
{
    init_logging_internal(format_from_env()?, None)
}

/// Initialize logging with an explicit level, overriding `RUST_LOG`
///
/// ```rust,no_run
/// use machpatch_utils::{init_logging_with_level, LogFormat, LogLevel};
///
/// let _guard = init_logging_with_level(LogLevel::Debug, LogFormat::Pretty)
///     .expect("Failed to initialize logging");
/// ```
///
/// ## Errors
///
/// Same as [`init_logging`], minus the format lookup.
pub fn init_logging_with_level(level: LogLevel, format: LogFormat) -> Result<LoggingGuard, LoggingError>
{
    init_logging_internal(format, Some(level.into()))
}

/// `MACHPATCH_LOG_FORMAT`, or [`LogFormat::Pretty`] when unset
///
/// ## Errors
///
/// `InvalidFormat` for an unrecognized value.
pub fn format_from_env() -> Result<LogFormat, LoggingError>
{
    match env::var(LOG_FORMAT_ENV) {
        Ok(value) if !value.trim().is_empty() => value.trim().parse(),
        _ => Ok(LogFormat::Pretty),
    }
}

/// Build the event filter
///
/// Priority:
/// 1. an explicit level (from `--verbose`)
/// 2. `RUST_LOG`, which also accepts per-module directives
/// 3. `warn`
pub fn build_filter(explicit_level: Option<Level>, rust_log: Option<&str>) -> EnvFilter
{
    if let Some(level) = explicit_level {
        return EnvFilter::new(level.to_string());
    }
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(Level::WARN.to_string()))
}

fn fmt_layer<S>(format: LogFormat, writer: BoxMakeWriter, ansi: bool) -> Box<dyn Layer<S> + Send + Sync + 'static>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let layer = fmt::layer()
        .with_writer(writer)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_timer(ChronoUtc::rfc_3339());

    match format {
        LogFormat::Pretty => layer.with_ansi(ansi).boxed(),
        LogFormat::Json => layer.json().with_current_span(true).with_span_list(true).boxed(),
    }
}

fn file_writer(path: &Path) -> Result<(BoxMakeWriter, WorkerGuard), LoggingError>
{
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let file_name = path
        .file_name()
        .ok_or_else(|| LoggingError::InvalidFile(path.display().to_string()))?;
    std::fs::create_dir_all(&directory)?;

    // The operator chose the exact path, so no rotation
    let appender = tracing_appender::rolling::never(directory, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    Ok((BoxMakeWriter::new(writer), guard))
}

fn init_logging_internal(format: LogFormat, explicit_level: Option<Level>) -> Result<LoggingGuard, LoggingError>
{
    let rust_log = env::var("RUST_LOG").ok();
    let filter = build_filter(explicit_level, rust_log.as_deref());

    let file = match env::var_os(LOG_FILE_ENV) {
        Some(path) if !path.is_empty() => Some(file_writer(Path::new(&path))?),
        _ => None,
    };
    let (file_sink, guard) = match file {
        Some((writer, guard)) => (Some(writer), Some(guard)),
        None => (None, None),
    };

    Registry::default()
        .with(filter)
        .with(fmt_layer(format, BoxMakeWriter::new(io::stderr), true))
        // No ANSI in files
        .with(file_sink.map(|writer| fmt_layer(format, writer, false)))
        .try_init()
        .map_err(|err| LoggingError::InitializationFailed(err.to_string()))?;

    Ok(LoggingGuard { file: guard })
}

/// Logging initialization error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError
{
    /// Invalid log format
    #[error("Invalid log format: {0}. Use 'pretty' or 'json'")]
    InvalidFormat(String),

    /// Invalid log level
    #[error("Invalid log level: {0}. Use 'error', 'warn', 'info', 'debug', or 'trace'")]
    InvalidLevel(String),

    /// Log file path without a file name
    #[error("Invalid log file: {0}")]
    InvalidFile(String),

    /// Failed to initialize logging
    #[error("Failed to initialize logging: {0}")]
    InitializationFailed(String),

    /// File logging error
    #[error("File logging error: {0}")]
    FileError(#[from] io::Error),
}
