//! Remote operation executor
//!
//! A [`Session`] wraps one open transport and offers the four primitives
//! every pipeline step is built from: exec, upload, write content and list
//! directory. Transport faults are mapped to the operation specific error
//! variant here, with the host attached.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, error, info};

use crate::config::{Credentials, ServerSpec};
use crate::errors::BeamError;
use crate::remote::transport::{Connector, OutputObserver, RemoteOutput, Transport};

/// Options for [`Session::exec`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecOptions {
    /// Treat a non-zero exit as success
    pub ignore_error: bool,

    /// Keep the captured output in the returned value
    pub return_output: bool,
}

impl ExecOptions {
    pub fn ignore_error() -> Self {
        Self {
            ignore_error: true,
            ..Default::default()
        }
    }

    pub fn return_output() -> Self {
        Self {
            return_output: true,
            ..Default::default()
        }
    }
}

/// One live connection to one host
pub struct Session {
    host: String,
    transport: Box<dyn Transport>,
    observer: Arc<dyn OutputObserver>,
    closed: bool,
}

impl Session {
    /// Connect to a server
    pub async fn open(
        connector: &dyn Connector,
        server: &ServerSpec,
        credentials: &Credentials,
        observer: Arc<dyn OutputObserver>,
    ) -> Result<Self, BeamError> {
        info!("Connecting to server: {}", server.host);
        match connector.connect(server, credentials).await {
            Ok(transport) => {
                debug!("Connected to {}", server.display_name());
                Ok(Self::new(server.host.clone(), transport, observer))
            }
            Err(e) => {
                error!("Error on server: {}: {}", server.host, e);
                Err(BeamError::ConnectionError {
                    host: server.host.clone(),
                    message: e.to_string(),
                })
            }
        }
    }

    /// Wrap an already open transport
    pub fn new(
        host: impl Into<String>,
        transport: Box<dyn Transport>,
        observer: Arc<dyn OutputObserver>,
    ) -> Self {
        Self {
            host: host.into(),
            transport,
            observer,
            closed: false,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Announce the start of a pipeline step
    pub fn announce(&self, title: &str) {
        info!("[{}] {}", self.host, title);
        self.observer.step(title);
    }

    fn ensure_open(&self) -> Result<(), BeamError> {
        if self.closed {
            return Err(BeamError::SessionError(format!(
                "Session for {} is already closed",
                self.host
            )));
        }
        Ok(())
    }

    /// Run a command on the host
    ///
    /// Output is streamed to the observer as it arrives. A non-zero exit
    /// fails with [`BeamError::CommandError`] unless `ignore_error` is set.
    pub async fn exec(
        &mut self,
        command: &str,
        options: ExecOptions,
    ) -> Result<RemoteOutput, BeamError> {
        self.ensure_open()?;
        self.observer.command(&self.host, command);

        let mut result = self
            .transport
            .run(command, self.observer.as_ref())
            .await
            .map_err(|e| {
                BeamError::SessionError(format!("{}: unable to run `{}`: {}", self.host, command, e))
            })?;

        debug!(
            "Exit-Code: {:?}, Signal: {:?}",
            result.exit_code, result.signal
        );

        if !result.success() && !options.ignore_error {
            return Err(BeamError::CommandError {
                host: self.host.clone(),
                command: command.to_string(),
                exit_code: result.exit_code,
                signal: result.signal,
            });
        }

        if !options.return_output {
            self.observer.ok();
            result.output.clear();
        }
        Ok(result)
    }

    /// Copy a local file to the host
    pub async fn upload(&mut self, local: &Path, remote: &str) -> Result<(), BeamError> {
        self.ensure_open()?;
        info!("Uploading {} to {}", local.display(), remote);

        self.transport.upload(local, remote).await.map_err(|e| {
            error!("Upload to {} failed: {}", self.host, e);
            BeamError::TransferError {
                host: self.host.clone(),
                local: local.display().to_string(),
                remote: remote.to_string(),
                message: e.to_string(),
            }
        })?;

        self.observer.ok();
        Ok(())
    }

    /// Write literal text to a remote file
    pub async fn write_content(&mut self, content: &str, remote: &str) -> Result<(), BeamError> {
        self.ensure_open()?;
        info!("Writing to {}", remote);

        self.transport.write_file(content, remote).await.map_err(|e| {
            error!("Error on server: {}: {}", self.host, e);
            BeamError::WriteError {
                host: self.host.clone(),
                remote: remote.to_string(),
                message: e.to_string(),
            }
        })?;

        self.observer.ok();
        Ok(())
    }

    /// Entry names of a remote directory in listing order
    pub async fn list_directory(&mut self, remote: &str) -> Result<Vec<String>, BeamError> {
        self.ensure_open()?;
        info!("Reading directory list: {}", remote);

        self.transport
            .list_directory(remote)
            .await
            .map_err(|e| BeamError::ListError {
                host: self.host.clone(),
                remote: remote.to_string(),
                message: e.to_string(),
            })
    }

    /// Close the connection; later calls are no-ops
    pub async fn close(&mut self) -> Result<(), BeamError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        self.transport.close().await.map_err(|e| {
            BeamError::SessionError(format!("{}: close failed: {}", self.host, e))
        })?;
        debug!("Closed connection for server: {}", self.host);
        Ok(())
    }
}
