//! Scripted transport and prompter shared by the integration tests

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use secrecy::SecretString;

use beam::config::{resolve, Credentials, Defaults, GroupConfig, ResolvedConfig, ServerConfig, ServerSpec};
use beam::errors::{BeamError, TransportError};
use beam::prompt::Prompter;
use beam::remote::{Connector, OutputObserver, RemoteOutput, Transport};

/// One recorded remote operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Connect { host: String, username: String, has_password: bool },
    Run { host: String, command: String },
    Upload { host: String, remote: String },
    Write { host: String, remote: String, content: String },
    List { host: String, remote: String },
    Close { host: String },
}

impl Op {
    pub fn host(&self) -> &str {
        match self {
            Op::Connect { host, .. }
            | Op::Run { host, .. }
            | Op::Upload { host, .. }
            | Op::Write { host, .. }
            | Op::List { host, .. }
            | Op::Close { host } => host,
        }
    }
}

#[derive(Default)]
struct Script {
    exit_codes: Vec<(String, i32)>,
    outputs: Vec<(String, String)>,
    listings: HashMap<String, Vec<String>>,
    unreachable: HashSet<String>,
    failing_uploads: Vec<String>,
    failing_writes: Vec<String>,
    ops: Vec<Op>,
}

/// In-memory connector recording everything done through it
#[derive(Clone, Default)]
pub struct MockConnector {
    script: Arc<Mutex<Script>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands starting with `prefix` exit with `code`
    pub fn exit_code(&self, prefix: &str, code: i32) -> &Self {
        self.script
            .lock()
            .unwrap()
            .exit_codes
            .push((prefix.to_string(), code));
        self
    }

    /// Commands starting with `prefix` print `output`
    pub fn output(&self, prefix: &str, output: &str) -> &Self {
        self.script
            .lock()
            .unwrap()
            .outputs
            .push((prefix.to_string(), output.to_string()));
        self
    }

    pub fn listing(&self, path: &str, entries: &[&str]) -> &Self {
        self.script.lock().unwrap().listings.insert(
            path.to_string(),
            entries.iter().map(|e| e.to_string()).collect(),
        );
        self
    }

    pub fn unreachable(&self, host: &str) -> &Self {
        self.script
            .lock()
            .unwrap()
            .unreachable
            .insert(host.to_string());
        self
    }

    /// Uploads to remote paths starting with `prefix` fail
    pub fn fail_upload(&self, prefix: &str) -> &Self {
        self.script
            .lock()
            .unwrap()
            .failing_uploads
            .push(prefix.to_string());
        self
    }

    /// Writes to remote paths starting with `prefix` fail
    pub fn fail_write(&self, prefix: &str) -> &Self {
        self.script
            .lock()
            .unwrap()
            .failing_writes
            .push(prefix.to_string());
        self
    }

    pub fn ops(&self) -> Vec<Op> {
        self.script.lock().unwrap().ops.clone()
    }

    pub fn ops_for(&self, host: &str) -> Vec<Op> {
        self.ops().into_iter().filter(|op| op.host() == host).collect()
    }

    pub fn commands_for(&self, host: &str) -> Vec<String> {
        self.ops_for(host)
            .into_iter()
            .filter_map(|op| match op {
                Op::Run { command, .. } => Some(command),
                _ => None,
            })
            .collect()
    }

    fn record(&self, op: Op) {
        self.script.lock().unwrap().ops.push(op);
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(
        &self,
        server: &ServerSpec,
        credentials: &Credentials,
    ) -> Result<Box<dyn Transport>, TransportError> {
        if self.script.lock().unwrap().unreachable.contains(&server.host) {
            return Err(TransportError::Other(format!(
                "connect to host {} port {}: Connection refused",
                server.host, server.port
            )));
        }

        self.record(Op::Connect {
            host: server.host.clone(),
            username: credentials.username.clone(),
            has_password: credentials.password.is_some(),
        });
        Ok(Box::new(MockTransport {
            host: server.host.clone(),
            connector: self.clone(),
        }))
    }
}

struct MockTransport {
    host: String,
    connector: MockConnector,
}

#[async_trait]
impl Transport for MockTransport {
    async fn run(
        &mut self,
        command: &str,
        observer: &dyn OutputObserver,
    ) -> Result<RemoteOutput, TransportError> {
        self.connector.record(Op::Run {
            host: self.host.clone(),
            command: command.to_string(),
        });

        let (exit_code, output) = {
            let script = self.connector.script.lock().unwrap();
            let exit_code = script
                .exit_codes
                .iter()
                .find(|(prefix, _)| command.starts_with(prefix.as_str()))
                .map(|(_, code)| *code)
                .unwrap_or(0);
            let output = script
                .outputs
                .iter()
                .find(|(prefix, _)| command.starts_with(prefix.as_str()))
                .map(|(_, output)| output.clone())
                .unwrap_or_default();
            (exit_code, output)
        };

        observer.output(&output);
        Ok(RemoteOutput {
            exit_code: Some(exit_code),
            signal: None,
            output,
        })
    }

    async fn upload(&mut self, _local: &Path, remote: &str) -> Result<(), TransportError> {
        self.connector.record(Op::Upload {
            host: self.host.clone(),
            remote: remote.to_string(),
        });
        let script = self.connector.script.lock().unwrap();
        if script.failing_uploads.iter().any(|p| remote.starts_with(p.as_str())) {
            return Err(TransportError::Other(format!("scp: {}: No space left on device", remote)));
        }
        Ok(())
    }

    async fn write_file(&mut self, content: &str, remote: &str) -> Result<(), TransportError> {
        self.connector.record(Op::Write {
            host: self.host.clone(),
            remote: remote.to_string(),
            content: content.to_string(),
        });
        let script = self.connector.script.lock().unwrap();
        if script.failing_writes.iter().any(|p| remote.starts_with(p.as_str())) {
            return Err(TransportError::Other(format!("{}: Permission denied", remote)));
        }
        Ok(())
    }

    async fn list_directory(&mut self, remote: &str) -> Result<Vec<String>, TransportError> {
        self.connector.record(Op::List {
            host: self.host.clone(),
            remote: remote.to_string(),
        });
        let script = self.connector.script.lock().unwrap();
        script
            .listings
            .get(remote)
            .cloned()
            .ok_or_else(|| TransportError::Other(format!("{}: No such file or directory", remote)))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.connector.record(Op::Close {
            host: self.host.clone(),
        });
        Ok(())
    }
}

/// Prompter answering from queues; confirms default to yes
#[derive(Default)]
pub struct ScriptedPrompter {
    confirms: Mutex<VecDeque<bool>>,
    selects: Mutex<VecDeque<usize>>,
    multi_selects: Mutex<VecDeque<Vec<usize>>>,
    inputs: Mutex<VecDeque<String>>,
    pub confirm_messages: Mutex<Vec<String>>,
    pub select_defaults: Mutex<Vec<Option<usize>>>,
}

impl ScriptedPrompter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn confirms(self, answers: &[bool]) -> Self {
        self.confirms.lock().unwrap().extend(answers.iter().copied());
        self
    }

    pub fn selects(self, answers: &[usize]) -> Self {
        self.selects.lock().unwrap().extend(answers.iter().copied());
        self
    }

    pub fn multi_selects(self, answer: &[usize]) -> Self {
        self.multi_selects.lock().unwrap().push_back(answer.to_vec());
        self
    }

    pub fn inputs(self, answers: &[&str]) -> Self {
        self.inputs
            .lock()
            .unwrap()
            .extend(answers.iter().map(|a| a.to_string()));
        self
    }
}

#[async_trait]
impl Prompter for ScriptedPrompter {
    async fn confirm(&self, message: &str, default: bool) -> Result<bool, BeamError> {
        self.confirm_messages.lock().unwrap().push(message.to_string());
        Ok(self.confirms.lock().unwrap().pop_front().unwrap_or(default))
    }

    async fn input(&self, _message: &str, default: Option<&str>) -> Result<String, BeamError> {
        Ok(self
            .inputs
            .lock()
            .unwrap()
            .pop_front()
            .or_else(|| default.map(str::to_string))
            .unwrap_or_default())
    }

    async fn password(&self, _message: &str) -> Result<SecretString, BeamError> {
        Ok(SecretString::from("s3cret".to_string()))
    }

    async fn select(
        &self,
        _message: &str,
        _items: &[String],
        default: Option<usize>,
    ) -> Result<usize, BeamError> {
        self.select_defaults.lock().unwrap().push(default);
        self.selects
            .lock()
            .unwrap()
            .pop_front()
            .or(default)
            .ok_or_else(|| BeamError::PromptError("no answer scripted".to_string()))
    }

    async fn multi_select(&self, _message: &str, _items: &[String]) -> Result<Vec<usize>, BeamError> {
        Ok(self.multi_selects.lock().unwrap().pop_front().unwrap_or_default())
    }
}

/// Swallows remote output
pub struct SilentObserver;

impl OutputObserver for SilentObserver {
    fn output(&self, _chunk: &str) {}
}

pub fn group(hosts: &[&str]) -> GroupConfig {
    GroupConfig {
        servers: Some(hosts.iter().map(|h| ServerConfig::new(*h)).collect()),
        release: Some("dist/app-1.0.3.tar.gz".into()),
        path: Some("/srv".to_string()),
        app_name: Some("app".to_string()),
        ..Default::default()
    }
}

pub fn config(hosts: &[&str]) -> ResolvedConfig {
    resolve(&Defaults::default(), group(hosts)).unwrap()
}

pub const RELEASES: &str = "/srv/app/releases";
