//! Logging configuration

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

use crate::errors::BeamError;

/// Log level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn to_filter_string(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(format!("Invalid log level: {}", s)),
        }
    }
}

/// Logging options
#[derive(Debug, Clone)]
pub struct LogOptions {
    /// Log level
    pub log_level: LogLevel,

    /// Write logs to stderr
    pub stderr: bool,

    /// Also write logs to `<dir>/beam.log`
    pub log_dir: Option<PathBuf>,

    /// Enable JSON format
    pub json_format: bool,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            stderr: true,
            log_dir: None,
            json_format: false,
        }
    }
}

/// Initialize logging
///
/// The returned guard flushes the file sink on drop and must be held for
/// the lifetime of the process.
pub fn init_logging(options: LogOptions) -> Result<Option<WorkerGuard>, BeamError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(options.log_level.to_filter_string()));

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

    // Remote command output owns stdout, so log lines go to stderr
    if options.stderr {
        if options.json_format {
            layers.push(fmt::layer().json().with_writer(std::io::stderr).boxed());
        } else {
            layers.push(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .boxed(),
            );
        }
    }

    let mut guard = None;
    if let Some(dir) = &options.log_dir {
        std::fs::create_dir_all(dir)?;
        let appender = tracing_appender::rolling::never(dir, "beam.log");
        let (writer, file_guard) = tracing_appender::non_blocking(appender);
        layers.push(fmt::layer().with_ansi(false).with_writer(writer).boxed());
        guard = Some(file_guard);
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| BeamError::ConfigError(e.to_string()))?;

    Ok(guard)
}
