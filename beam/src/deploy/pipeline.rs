//! Mode to step list mapping and the per-host step runner

use tracing::{debug, error, warn};

use crate::config::ResolvedConfig;
use crate::deploy::mode::Mode;
use crate::deploy::steps::{Step, StepContext};
use crate::errors::BeamError;

/// Ordered steps run against every host of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    mode: Mode,
    steps: Vec<Step>,
}

/// The first step that failed on a host
#[derive(Debug)]
pub struct StepFailure {
    pub step: Step,
    pub error: BeamError,
}

/// Build the step list for a mode. Always ends with [`Step::CloseSession`].
pub fn build_pipeline(mode: Mode, config: &ResolvedConfig) -> Pipeline {
    let mut steps = match mode {
        Mode::Deploy | Mode::Redeploy => {
            let mut steps = vec![Step::CheckUptime];
            if config.node_version.is_some() {
                steps.push(Step::CheckRuntimeVersion);
            }
            steps.push(Step::PrepareDirectories);
            if mode == Mode::Redeploy {
                steps.push(Step::CleanCurrentReleaseDir);
            }
            steps.extend([
                Step::UploadArchive,
                Step::ExtractArchive,
                Step::CreateSymlink,
                Step::InstallDependencies,
                Step::WriteUnitFile,
                Step::SetOwnership,
                Step::StopIfRunning,
                Step::Start,
                Step::TailLogs,
            ]);
            steps
        }
        Mode::Undeploy => vec![Step::StopIfRunning, Step::RemoveUnitFile],
        Mode::Remove => vec![
            Step::StopIfRunning,
            Step::RemoveUnitFile,
            Step::RemoveAllApplicationData,
        ],
        Mode::Rollback => vec![
            Step::SelectReleaseInteractively,
            Step::WriteUnitFile,
            Step::SetOwnership,
            Step::StopIfRunning,
            Step::Start,
            Step::TailLogs,
        ],
        Mode::Clean => vec![Step::SelectReleasesToDeleteInteractively],
        Mode::Restart => vec![Step::StopIfRunning, Step::Start, Step::TailLogs],
        Mode::Uptime => vec![Step::CheckUptime],
        Mode::Log => vec![Step::TailLogs],
    };
    steps.push(Step::CloseSession);

    Pipeline { mode, steps }
}

impl Pipeline {
    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Step names in run order
    pub fn names(&self) -> Vec<&'static str> {
        self.steps.iter().map(Step::name).collect()
    }

    /// Run the steps in order against one host.
    ///
    /// After the first failure every remaining step is skipped except
    /// [`Step::CloseSession`]. Returns that first failure, if any.
    pub async fn run(&self, ctx: &mut StepContext<'_>) -> Option<StepFailure> {
        let mut failure: Option<StepFailure> = None;

        for step in &self.steps {
            if failure.is_some() && *step != Step::CloseSession {
                debug!("[{}] Skipping {}", ctx.session.host(), step.name());
                continue;
            }

            match step.run(ctx).await {
                Ok(()) => {}
                Err(err) if step.ignores_error() => {
                    warn!("[{}] {} failed, continuing: {}", ctx.session.host(), step.name(), err);
                }
                Err(err) => {
                    error!("[{}] {} failed: {}", ctx.session.host(), step.name(), err);
                    if failure.is_none() {
                        failure = Some(StepFailure {
                            step: *step,
                            error: err,
                        });
                    }
                }
            }
        }

        failure
    }
}
