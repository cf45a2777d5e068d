//! Pipeline steps
//!
//! Every step touches the host only through the [`Session`] primitives.

use tracing::{info, warn};

use crate::config::resolved::remote_join;
use crate::config::ResolvedConfig;
use crate::deploy::release::{self, RollbackMemory};
use crate::deploy::unit_file;
use crate::errors::BeamError;
use crate::prompt::Prompter;
use crate::remote::{ExecOptions, Session};
use crate::utils::shell_quote;

/// Everything a step may use while running against one host
pub struct StepContext<'a> {
    pub config: &'a ResolvedConfig,
    pub session: &'a mut Session,
    pub prompter: &'a dyn Prompter,
    pub rollback: &'a mut RollbackMemory,
}

/// One named operation of a pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    CheckUptime,
    CheckRuntimeVersion,
    PrepareDirectories,
    CleanCurrentReleaseDir,
    UploadArchive,
    ExtractArchive,
    CreateSymlink,
    InstallDependencies,
    WriteUnitFile,
    SetOwnership,
    StopIfRunning,
    Start,
    TailLogs,
    RemoveUnitFile,
    RemoveAllApplicationData,
    SelectReleaseInteractively,
    SelectReleasesToDeleteInteractively,
    CloseSession,
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::CheckUptime => "checkUptime",
            Step::CheckRuntimeVersion => "checkRuntimeVersion",
            Step::PrepareDirectories => "prepareDirectories",
            Step::CleanCurrentReleaseDir => "cleanCurrentReleaseDir",
            Step::UploadArchive => "uploadArchive",
            Step::ExtractArchive => "extractArchive",
            Step::CreateSymlink => "createSymlink",
            Step::InstallDependencies => "installDependencies",
            Step::WriteUnitFile => "writeUnitFile",
            Step::SetOwnership => "setOwnership",
            Step::StopIfRunning => "stopIfRunning",
            Step::Start => "start",
            Step::TailLogs => "tailLogs",
            Step::RemoveUnitFile => "removeUnitFile",
            Step::RemoveAllApplicationData => "removeAllApplicationData",
            Step::SelectReleaseInteractively => "selectReleaseInteractively",
            Step::SelectReleasesToDeleteInteractively => "selectReleasesToDeleteInteractively",
            Step::CloseSession => "closeSession",
        }
    }

    /// Heading shown before the step runs
    pub fn title(&self) -> &'static str {
        match self {
            Step::CheckUptime => "Checking uptime",
            Step::CheckRuntimeVersion => "Checking node.js version",
            Step::PrepareDirectories => "Preparing directory structure",
            Step::CleanCurrentReleaseDir => "Cleaning release directory",
            Step::UploadArchive => "Uploading deployment archive",
            Step::ExtractArchive => "Extracting release",
            Step::CreateSymlink => "Create symlink",
            Step::InstallDependencies => "Install dependencies",
            Step::WriteUnitFile => "Creating upstart script",
            Step::SetOwnership => "Setting file ownership",
            Step::StopIfRunning => "Stopping application (if running)",
            Step::Start => "Starting application",
            Step::TailLogs => "Printing log",
            Step::RemoveUnitFile => "Removing upstart script",
            Step::RemoveAllApplicationData => "Removing deployment",
            Step::SelectReleaseInteractively => "Selecting release",
            Step::SelectReleasesToDeleteInteractively => "Selecting releases to delete",
            Step::CloseSession => "Closing connection",
        }
    }

    /// Failure of this step is expected and does not stop the pipeline
    pub fn ignores_error(&self) -> bool {
        matches!(self, Step::StopIfRunning)
    }

    pub async fn run(&self, ctx: &mut StepContext<'_>) -> Result<(), BeamError> {
        ctx.session.announce(self.title());
        let config = ctx.config;

        match self {
            Step::CheckUptime => exec(ctx, "uptime").await,
            Step::CheckRuntimeVersion => check_runtime_version(ctx).await,
            Step::PrepareDirectories => {
                let log_path = config.log_path();
                let command = format!(
                    "mkdir -p {dir} && touch {err} {std}",
                    dir = shell_quote(&log_path),
                    err = shell_quote(&remote_join(&log_path, &config.err_log_name())),
                    std = shell_quote(&remote_join(&log_path, &config.std_log_name())),
                );
                exec(ctx, &command).await
            }
            Step::CleanCurrentReleaseDir => {
                let command = format!(
                    "find {} -mindepth 1 -maxdepth 1 ! -name logs -exec rm -Rf {{}} +",
                    shell_quote(&config.current_release_path())
                );
                exec(ctx, &command).await
            }
            Step::UploadArchive => {
                ctx.session
                    .upload(&config.release_archive, &config.release_archive_target_path())
                    .await
            }
            Step::ExtractArchive => {
                let archive = shell_quote(&config.archive_file_name);
                let command = format!(
                    "cd {} && tar xzfsv {archive} && rm {archive}",
                    shell_quote(&config.current_release_path()),
                );
                exec(ctx, &command).await
            }
            Step::CreateSymlink => {
                let command = release::link_command(
                    &config.current_release_path(),
                    &config.current_link_path(),
                );
                exec(ctx, &command).await
            }
            Step::InstallDependencies => {
                let command = format!(
                    "cd {} && {} {}",
                    shell_quote(&config.current_release_path()),
                    config.package_manager_binary,
                    config.package_manager_install_args
                );
                exec(ctx, command.trim_end()).await
            }
            Step::WriteUnitFile => {
                let content = unit_file::render(config);
                ctx.session
                    .write_content(&content, &config.unit_file_path())
                    .await
            }
            Step::SetOwnership => {
                let command = format!(
                    "chown -R {} {}",
                    shell_quote(&config.node_user),
                    shell_quote(&config.application_path())
                );
                exec(ctx, &command).await
            }
            Step::StopIfRunning => {
                let command = format!("stop {}", shell_quote(&config.job_name()));
                ctx.session
                    .exec(&command, ExecOptions::ignore_error())
                    .await
                    .map(|_| ())
            }
            Step::Start => {
                let command = format!("start {}", shell_quote(&config.job_name()));
                exec(ctx, &command).await
            }
            Step::TailLogs => {
                let command = format!(
                    "tail -n {} {} {}",
                    config.log_lines,
                    shell_quote(&config.err_log_path()),
                    shell_quote(&config.std_log_path())
                );
                ctx.session
                    .exec(&command, ExecOptions::return_output())
                    .await
                    .map(|_| ())
            }
            Step::RemoveUnitFile => {
                let command = format!("rm {}", shell_quote(&config.unit_file_path()));
                exec(ctx, &command).await
            }
            Step::RemoveAllApplicationData => {
                let command = format!("rm -Rf {}", shell_quote(&config.application_path()));
                exec(ctx, &command).await
            }
            Step::SelectReleaseInteractively => select_release(ctx).await,
            Step::SelectReleasesToDeleteInteractively => select_releases_to_delete(ctx).await,
            Step::CloseSession => ctx.session.close().await,
        }
    }
}

async fn exec(ctx: &mut StepContext<'_>, command: &str) -> Result<(), BeamError> {
    ctx.session.exec(command, ExecOptions::default()).await.map(|_| ())
}

async fn check_runtime_version(ctx: &mut StepContext<'_>) -> Result<(), BeamError> {
    let Some(constraint) = &ctx.config.node_version else {
        return Ok(());
    };

    let command = format!("{} --version", ctx.config.runtime_binary);
    let result = ctx.session.exec(&command, ExecOptions::return_output()).await?;
    let detected = constraint.check_output(&result.output)?;
    info!("[{}] Runtime version {} accepted", ctx.session.host(), detected);
    Ok(())
}

async fn select_release(ctx: &mut StepContext<'_>) -> Result<(), BeamError> {
    let releases = release::list_releases(ctx.session, ctx.config).await?;
    if releases.is_empty() {
        return Err(BeamError::NoReleases(ctx.config.releases_path()));
    }

    let default = ctx.rollback.default_index(&releases);
    let message = format!("Select the release to activate on {}", ctx.session.host());
    let index = ctx.prompter.select(&message, &releases, default).await?;
    let chosen = releases.get(index).ok_or_else(|| {
        BeamError::PromptError(format!("Selection {} is out of range", index))
    })?;

    info!("[{}] Rolling back to {}", ctx.session.host(), chosen);
    let command = release::link_command(
        &ctx.config.release_path(chosen),
        &ctx.config.current_link_path(),
    );
    exec(ctx, &command).await?;
    ctx.rollback.remember(chosen.clone());
    Ok(())
}

async fn select_releases_to_delete(ctx: &mut StepContext<'_>) -> Result<(), BeamError> {
    let releases = release::list_releases(ctx.session, ctx.config).await?;
    if releases.is_empty() {
        info!("[{}] No releases to clean", ctx.session.host());
        return Ok(());
    }

    let message = format!(
        "Select releases to delete on {} (the active release is not protected)",
        ctx.session.host()
    );
    let selected = ctx.prompter.multi_select(&message, &releases).await?;
    if selected.is_empty() {
        info!("[{}] Nothing selected", ctx.session.host());
        return Ok(());
    }

    for index in selected {
        let Some(name) = releases.get(index) else {
            warn!("Ignoring out of range selection {}", index);
            continue;
        };
        let command = release::remove_release_command(ctx.config, name);
        exec(ctx, &command).await?;
    }
    Ok(())
}
