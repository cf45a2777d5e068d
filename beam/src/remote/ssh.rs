//! OpenSSH transport
//!
//! Each session is one ControlMaster connection. Commands, uploads and
//! writes are multiplexed over its control socket, which lives in a private
//! temporary directory removed when the session closes.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use tempfile::TempDir;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::config::{Credentials, ServerSpec};
use crate::errors::TransportError;
use crate::remote::transport::{Connector, OutputObserver, RemoteOutput, Transport};
use crate::utils::shell_quote;

/// Client binaries and connection tuning
#[derive(Debug, Clone)]
pub struct SshOptions {
    pub ssh_binary: String,
    pub scp_binary: String,

    /// Used to feed passwords to the master connection
    pub sshpass_binary: String,

    pub connect_timeout: Duration,

    /// Value for `StrictHostKeyChecking`; the client default when unset
    pub strict_host_key_checking: Option<String>,
}

impl Default for SshOptions {
    fn default() -> Self {
        Self {
            ssh_binary: "ssh".to_string(),
            scp_binary: "scp".to_string(),
            sshpass_binary: "sshpass".to_string(),
            connect_timeout: Duration::from_secs(30),
            strict_host_key_checking: None,
        }
    }
}

/// Opens [`SshTransport`] sessions
#[derive(Debug, Clone, Default)]
pub struct SshConnector {
    options: SshOptions,
}

impl SshConnector {
    pub fn new(options: SshOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl Connector for SshConnector {
    async fn connect(
        &self,
        server: &ServerSpec,
        credentials: &Credentials,
    ) -> Result<Box<dyn Transport>, TransportError> {
        let transport = SshTransport::connect(self.options.clone(), server, credentials).await?;
        Ok(Box::new(transport))
    }
}

/// A multiplexed OpenSSH connection to one host
pub struct SshTransport {
    options: SshOptions,
    host: String,
    port: u16,
    username: String,
    control_path: PathBuf,
    control_dir: Option<TempDir>,
}

impl SshTransport {
    /// Start the master connection
    pub async fn connect(
        options: SshOptions,
        server: &ServerSpec,
        credentials: &Credentials,
    ) -> Result<Self, TransportError> {
        let control_dir = tempfile::Builder::new().prefix("beam-ssh-").tempdir()?;
        let control_path = control_dir.path().join("control.sock");

        let mut command = match &credentials.password {
            Some(password) => {
                let mut command = Command::new(&options.sshpass_binary);
                command
                    .env("SSHPASS", password.expose_secret())
                    .arg("-e")
                    .arg(&options.ssh_binary);
                command
            }
            None => Command::new(&options.ssh_binary),
        };

        command
            .arg("-o")
            .arg("ControlMaster=yes")
            .arg("-o")
            .arg(format!("ControlPath={}", control_path.display()))
            .arg("-o")
            .arg("ControlPersist=yes")
            .arg("-o")
            .arg(format!(
                "ServerAliveInterval={}",
                server.ping_interval.as_secs().max(1)
            ))
            .arg("-o")
            .arg(format!(
                "ConnectTimeout={}",
                options.connect_timeout.as_secs().max(1)
            ));

        if credentials.password.is_none() {
            command.arg("-o").arg("BatchMode=yes");
        }
        if let Some(policy) = &options.strict_host_key_checking {
            command.arg("-o").arg(format!("StrictHostKeyChecking={}", policy));
        }
        if let Some(key) = &credentials.private_key {
            command.arg("-i").arg(key).arg("-o").arg("IdentitiesOnly=yes");
        }
        if let Some(agent) = &credentials.agent {
            command.env("SSH_AUTH_SOCK", agent);
        }

        command
            .arg("-p")
            .arg(server.port.to_string())
            .arg("-l")
            .arg(&credentials.username)
            .args(["-N", "-f"])
            .arg(&server.host)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        debug!("Starting master connection to {}", server.display_name());
        let output = command.output().await?;
        check_status("ssh", output.status, &output.stderr)?;

        Ok(Self {
            options,
            host: server.host.clone(),
            port: server.port,
            username: credentials.username.clone(),
            control_path,
            control_dir: Some(control_dir),
        })
    }

    fn ensure_open(&self) -> Result<(), TransportError> {
        if self.control_dir.is_none() {
            return Err(TransportError::Closed);
        }
        Ok(())
    }

    /// `ssh` invocation multiplexed over the control socket
    ///
    /// Options must precede the host; everything after it is the remote
    /// command line.
    fn ssh_command(&self, options: &[&str]) -> Command {
        let mut command = Command::new(&self.options.ssh_binary);
        command
            .arg("-S")
            .arg(&self.control_path)
            .arg("-T")
            .arg("-p")
            .arg(self.port.to_string())
            .arg("-l")
            .arg(&self.username)
            .args(options)
            .arg(&self.host);
        command
    }

    fn scp_destination(&self, remote: &str) -> String {
        let host = if self.host.contains(':') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        format!("{}@{}:{}", self.username, host, remote)
    }
}

#[async_trait]
impl Transport for SshTransport {
    async fn run(
        &mut self,
        command: &str,
        observer: &dyn OutputObserver,
    ) -> Result<RemoteOutput, TransportError> {
        self.ensure_open()?;

        let mut child = self
            .ssh_command(&[])
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| TransportError::Other("stdout not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| TransportError::Other("stderr not captured".to_string()))?;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let stdout_task = tokio::spawn(pump(stdout, tx.clone()));
        let stderr_task = tokio::spawn(pump(stderr, tx));

        let mut output = String::new();
        while let Some(chunk) = rx.recv().await {
            observer.output(&chunk);
            output.push_str(&chunk);
        }
        let _ = stdout_task.await;
        let _ = stderr_task.await;

        let status = child.wait().await?;
        Ok(RemoteOutput {
            exit_code: status.code(),
            signal: exit_signal(&status),
            output,
        })
    }

    async fn upload(&mut self, local: &Path, remote: &str) -> Result<(), TransportError> {
        self.ensure_open()?;

        let output = Command::new(&self.options.scp_binary)
            .arg("-q")
            .arg("-o")
            .arg(format!("ControlPath={}", self.control_path.display()))
            .arg("-P")
            .arg(self.port.to_string())
            .arg(local)
            .arg(self.scp_destination(remote))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await?;

        check_status("scp", output.status, &output.stderr)
    }

    async fn write_file(&mut self, content: &str, remote: &str) -> Result<(), TransportError> {
        self.ensure_open()?;

        let mut child = self
            .ssh_command(&[])
            .arg(format!("cat > {}", shell_quote(remote)))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(content.as_bytes()).await?;
            stdin.shutdown().await?;
        }

        let output = child.wait_with_output().await?;
        check_status("ssh", output.status, &output.stderr)
    }

    async fn list_directory(&mut self, remote: &str) -> Result<Vec<String>, TransportError> {
        self.ensure_open()?;

        let output = self
            .ssh_command(&[])
            .arg(format!("ls -1a -- {}", shell_quote(remote)))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        check_status("ssh", output.status, &output.stderr)?;
        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        let Some(control_dir) = self.control_dir.take() else {
            return Ok(());
        };

        let output = self
            .ssh_command(&["-O", "exit"])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await;
        drop(control_dir);

        let output = output?;
        check_status("ssh", output.status, &output.stderr)
    }
}

impl Drop for SshTransport {
    fn drop(&mut self) {
        if self.control_dir.is_some() {
            warn!("Session for {} dropped while open, stopping master", self.host);
            // Not waited on; drop may run on a runtime worker
            let _ = std::process::Command::new(&self.options.ssh_binary)
                .arg("-S")
                .arg(&self.control_path)
                .args(["-O", "exit"])
                .arg(&self.host)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn();
        }
    }
}

async fn pump<R>(mut reader: R, tx: mpsc::UnboundedSender<String>)
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; 8192];
    let mut pending: Vec<u8> = Vec::new();
    loop {
        match reader.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                pending.extend_from_slice(&buf[..n]);
                let chunk = take_complete(&mut pending);
                if !chunk.is_empty() && tx.send(chunk).is_err() {
                    return;
                }
            }
        }
    }
    if !pending.is_empty() {
        let _ = tx.send(String::from_utf8_lossy(&pending).into_owned());
    }
}

/// Drain `pending` up to a character boundary; a trailing partial
/// multi-byte character stays for the next read
fn take_complete(pending: &mut Vec<u8>) -> String {
    let keep = incomplete_tail(pending);
    let rest = pending.split_off(pending.len() - keep);
    let chunk = String::from_utf8_lossy(pending).into_owned();
    *pending = rest;
    chunk
}

/// Length of an unfinished UTF-8 sequence at the end of `bytes`
fn incomplete_tail(bytes: &[u8]) -> usize {
    for back in 1..=bytes.len().min(3) {
        let byte = bytes[bytes.len() - back];
        if byte & 0xC0 != 0x80 {
            let width = match byte {
                0xF0..=0xFF => 4,
                0xE0..=0xEF => 3,
                0xC0..=0xDF => 2,
                _ => 1,
            };
            return if width > back { back } else { 0 };
        }
    }
    0
}

fn check_status(program: &str, status: ExitStatus, stderr: &[u8]) -> Result<(), TransportError> {
    if status.success() {
        return Ok(());
    }
    Err(TransportError::Process {
        program: program.to_string(),
        status: status.to_string(),
        stderr: String::from_utf8_lossy(stderr).trim().to_string(),
    })
}

#[cfg(unix)]
fn exit_signal(status: &ExitStatus) -> Option<String> {
    use std::os::unix::process::ExitStatusExt;

    status.signal().map(|signal| match signal {
        1 => "SIGHUP".to_string(),
        2 => "SIGINT".to_string(),
        9 => "SIGKILL".to_string(),
        13 => "SIGPIPE".to_string(),
        15 => "SIGTERM".to_string(),
        other => format!("signal {}", other),
    })
}

#[cfg(not(unix))]
fn exit_signal(_status: &ExitStatus) -> Option<String> {
    None
}
