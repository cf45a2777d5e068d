//! Session orchestrator
//!
//! Walks the configured hosts strictly one after another: confirm, connect,
//! run the pipeline, close, then move on. One host failing or being skipped
//! never stops the run.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::{Credentials, ResolvedConfig, ServerSpec};
use crate::deploy::fsm::{HostEvent, HostFsm, HostState};
use crate::deploy::mode::Mode;
use crate::deploy::pipeline::{build_pipeline, Pipeline};
use crate::deploy::release::RollbackMemory;
use crate::deploy::steps::StepContext;
use crate::errors::BeamError;
use crate::prompt::Prompter;
use crate::remote::{Connector, OutputObserver, Session};

/// Outcome of one host
#[derive(Debug, Clone, Serialize)]
pub struct HostReport {
    pub host: String,
    pub state: HostState,
    pub failed_step: Option<&'static str>,
    pub error: Option<String>,
}

impl HostReport {
    fn from_fsm(host: &str, fsm: &HostFsm) -> Self {
        Self {
            host: host.to_string(),
            state: fsm.state(),
            failed_step: fsm.failed_step(),
            error: fsm.error().map(str::to_string),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.state, HostState::Failed | HostState::Unreachable)
    }
}

impl fmt::Display for HostReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.state, self.failed_step, &self.error) {
            (HostState::Failed, Some(step), Some(err)) => {
                write!(f, "{}: failed at {} ({})", self.host, step, err)
            }
            (_, _, Some(err)) => write!(f, "{}: {:?} ({})", self.host, self.state, err),
            _ => write!(f, "{}: {:?}", self.host, self.state),
        }
    }
}

/// What a whole run did, host by host
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub mode: Mode,
    pub hosts: Vec<HostReport>,
}

impl RunSummary {
    pub fn has_failures(&self) -> bool {
        self.hosts.iter().any(HostReport::is_failure)
    }

    pub fn count(&self, state: HostState) -> usize {
        self.hosts.iter().filter(|h| h.state == state).count()
    }

    /// Mode specific closing line
    pub fn completion_message(&self) -> &'static str {
        self.mode.messages().complete
    }
}

/// Runs one mode against every server of a resolved group
pub struct Orchestrator<'a> {
    config: &'a ResolvedConfig,
    connector: &'a dyn Connector,
    prompter: &'a dyn Prompter,
    observer: Arc<dyn OutputObserver>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        config: &'a ResolvedConfig,
        connector: &'a dyn Connector,
        prompter: &'a dyn Prompter,
        observer: Arc<dyn OutputObserver>,
    ) -> Self {
        Self {
            config,
            connector,
            prompter,
            observer,
        }
    }

    pub async fn run(&self, mode: Mode) -> RunSummary {
        let pipeline = build_pipeline(mode, self.config);
        let total = self.config.servers.len();
        info!(
            "{}: {} on {} server(s), steps: {}",
            mode.messages().title,
            self.config.release_name,
            total,
            pipeline.names().join(", ")
        );

        let mut rollback = RollbackMemory::new();
        let mut hosts = Vec::with_capacity(total);

        for (index, server) in self.config.servers.iter().enumerate() {
            let report = self
                .run_host(&pipeline, server, index + 1, total, &mut rollback)
                .await;
            match report.state {
                HostState::Completed => info!("[{}] Done", report.host),
                HostState::Skipped => info!("[{}] Skipped", report.host),
                _ => warn!("{}", report),
            }
            hosts.push(report);
        }

        let summary = RunSummary { mode, hosts };
        info!("{}", summary.completion_message());
        summary
    }

    async fn run_host(
        &self,
        pipeline: &Pipeline,
        server: &ServerSpec,
        position: usize,
        total: usize,
        rollback: &mut RollbackMemory,
    ) -> HostReport {
        let mut fsm = HostFsm::new();
        let question = format!(
            "{} ({}, {} of {})",
            pipeline.mode().messages().ready,
            server.display_name(),
            position,
            total
        );

        match self.prompter.confirm(&question, true).await {
            Ok(true) => transition(&mut fsm, HostEvent::Confirm),
            Ok(false) => {
                transition(&mut fsm, HostEvent::Decline);
                return HostReport::from_fsm(&server.host, &fsm);
            }
            Err(e) => {
                transition(&mut fsm, HostEvent::Abort(e.to_string()));
                return HostReport::from_fsm(&server.host, &fsm);
            }
        }

        let entered;
        let credentials = if server.enter_credentials {
            match self.enter_credentials(server).await {
                Ok(credentials) => {
                    entered = credentials;
                    &entered
                }
                Err(e) => {
                    transition(&mut fsm, HostEvent::Abort(e.to_string()));
                    return HostReport::from_fsm(&server.host, &fsm);
                }
            }
        } else {
            &server.credentials
        };

        let mut session =
            match Session::open(self.connector, server, credentials, self.observer.clone()).await {
                Ok(session) => session,
                Err(e) => {
                    transition(&mut fsm, HostEvent::ConnectFailed(e.to_string()));
                    return HostReport::from_fsm(&server.host, &fsm);
                }
            };
        transition(&mut fsm, HostEvent::Connected);

        let failure = {
            let mut ctx = StepContext {
                config: self.config,
                session: &mut session,
                prompter: self.prompter,
                rollback,
            };
            pipeline.run(&mut ctx).await
        };

        if let Some(failure) = failure {
            transition(
                &mut fsm,
                HostEvent::StepFailed {
                    step: failure.step.name(),
                    error: failure.error.to_string(),
                },
            );
        }

        if !session.is_closed() {
            if let Err(e) = session.close().await {
                error!("{}", e);
            }
        }

        transition(&mut fsm, HostEvent::Finished);
        HostReport::from_fsm(&server.host, &fsm)
    }

    /// Ask for a login, keeping the configured key and agent
    async fn enter_credentials(&self, server: &ServerSpec) -> Result<Credentials, BeamError> {
        let configured = &server.credentials;
        let username = self
            .prompter
            .input(
                &format!("Username for {}", server.host),
                Some(configured.username.as_str()),
            )
            .await?;
        let password = self
            .prompter
            .password(&format!("Password for {}@{}", username, server.host))
            .await?;

        Ok(Credentials {
            username,
            password: Some(password),
            private_key: configured.private_key.clone(),
            agent: configured.agent.clone(),
        })
    }
}

fn transition(fsm: &mut HostFsm, event: HostEvent) {
    if let Err(e) = fsm.process(event) {
        debug!("{}", e);
    }
}
