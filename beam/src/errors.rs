//! Error types for beam

use thiserror::Error;

/// Main error type for beam
#[derive(Error, Debug)]
pub enum BeamError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error on {host}: {message}")]
    ConnectionError { host: String, message: String },

    #[error("Command `{command}` failed on {host} (exit code: {}, signal: {})",
        fmt_opt(.exit_code), fmt_opt(.signal))]
    CommandError {
        host: String,
        command: String,
        exit_code: Option<i32>,
        signal: Option<String>,
    },

    #[error("Runtime version {detected} does not match required {required}")]
    VersionMismatch { detected: String, required: String },

    #[error("No runtime version found in output: {0:?}")]
    VersionNotDetected(String),

    #[error("Transfer of {local} to {host}:{remote} failed: {message}")]
    TransferError {
        host: String,
        local: String,
        remote: String,
        message: String,
    },

    #[error("Writing {host}:{remote} failed: {message}")]
    WriteError {
        host: String,
        remote: String,
        message: String,
    },

    #[error("Listing {host}:{remote} failed: {message}")]
    ListError {
        host: String,
        remote: String,
        message: String,
    },

    #[error("No releases found in {0}")]
    NoReleases(String),

    #[error("Prompt error: {0}")]
    PromptError(String),

    #[error("Session error: {0}")]
    SessionError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for BeamError {
    fn from(err: anyhow::Error) -> Self {
        BeamError::Internal(err.to_string())
    }
}

fn fmt_opt<T: std::fmt::Display>(value: &Option<T>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "none".to_string(),
    }
}

/// Fault raised by a transport implementation
///
/// The remote executor turns these into the operation specific
/// [`BeamError`] variant, adding host and path context.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{program} exited with {status}: {stderr}")]
    Process {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("Session is closed")]
    Closed,

    #[error("{0}")]
    Other(String),
}
