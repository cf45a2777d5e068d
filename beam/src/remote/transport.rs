//! Transport seams
//!
//! The orchestration core reaches remote hosts only through these traits.
//! [`crate::remote::ssh`] provides the OpenSSH backed implementation.

use std::path::Path;

use async_trait::async_trait;

use crate::config::{Credentials, ServerSpec};
use crate::errors::TransportError;

/// Result of one remote command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteOutput {
    pub exit_code: Option<i32>,
    pub signal: Option<String>,
    pub output: String,
}

impl RemoteOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Receives live progress from a session
pub trait OutputObserver: Send + Sync {
    /// A pipeline step is about to run
    fn step(&self, _title: &str) {}

    /// A command is about to run on `host`
    fn command(&self, _host: &str, _command: &str) {}

    /// A chunk of stdout or stderr arrived
    fn output(&self, chunk: &str);

    /// The last operation succeeded
    fn ok(&self) {}
}

/// One open connection to one host
#[async_trait]
pub trait Transport: Send {
    /// Run a command, streaming output to `observer` while capturing it
    async fn run(
        &mut self,
        command: &str,
        observer: &dyn OutputObserver,
    ) -> Result<RemoteOutput, TransportError>;

    /// Copy a local file to the host
    async fn upload(&mut self, local: &Path, remote: &str) -> Result<(), TransportError>;

    /// Create or truncate a remote file with the given content
    async fn write_file(&mut self, content: &str, remote: &str) -> Result<(), TransportError>;

    /// Entry names of a remote directory, including `.` and `..` when the
    /// backend reports them
    async fn list_directory(&mut self, remote: &str) -> Result<Vec<String>, TransportError>;

    /// Tear the connection down
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Opens transports
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(
        &self,
        server: &ServerSpec,
        credentials: &Credentials,
    ) -> Result<Box<dyn Transport>, TransportError>;
}
