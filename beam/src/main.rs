//! Beam - Entry Point
//!
//! Deploys, rolls back and controls a packaged service on every host of a
//! deployment group, one host at a time.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{ArgGroup, Parser};
use colored::Colorize;
use tracing::{error, info};

use beam::config::{file::DEFAULT_FILE_NAME, resolve, BeamFile};
use beam::deploy::{HostState, Mode, Orchestrator, RunSummary};
use beam::logs::{init_logging, LogLevel, LogOptions};
use beam::prompt::{AssumeYes, DialoguerPrompter, Prompter};
use beam::remote::{ConsoleObserver, SshConnector};
use beam::utils::version_info;

#[derive(Debug, Parser)]
#[command(name = "beam", version, about)]
#[command(group(
    ArgGroup::new("mode")
        .multiple(false)
        .args(["redeploy", "undeploy", "remove", "rollback", "clean", "restart", "uptime", "log"])
))]
struct Cli {
    /// Deployment group declared in the configuration file
    #[arg(required_unless_present = "build_info")]
    group: Option<String>,

    /// Replace the contents of the current release and deploy again
    #[arg(long)]
    redeploy: bool,

    /// Stop the application and remove its upstart job
    #[arg(long)]
    undeploy: bool,

    /// Undeploy and delete every file of the application
    #[arg(long)]
    remove: bool,

    /// Point `current` at a previous release
    #[arg(long)]
    rollback: bool,

    /// Delete selected releases
    #[arg(long)]
    clean: bool,

    #[arg(long)]
    restart: bool,

    #[arg(long)]
    uptime: bool,

    /// Print the tail of the application logs
    #[arg(long)]
    log: bool,

    /// Configuration file
    #[arg(short, long, default_value = DEFAULT_FILE_NAME)]
    config: PathBuf,

    /// Answer yes to every host confirmation
    #[arg(short, long)]
    yes: bool,

    /// Exit with a failure status when any host failed
    #[arg(long)]
    strict: bool,

    #[arg(long, default_value = "info")]
    log_level: LogLevel,

    #[arg(long)]
    log_json: bool,

    /// Also write logs to `<dir>/beam.log`
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Print build information as JSON and exit
    #[arg(long)]
    build_info: bool,
}

impl Cli {
    fn mode(&self) -> Mode {
        [
            (self.redeploy, Mode::Redeploy),
            (self.undeploy, Mode::Undeploy),
            (self.remove, Mode::Remove),
            (self.rollback, Mode::Rollback),
            (self.clean, Mode::Clean),
            (self.restart, Mode::Restart),
            (self.uptime, Mode::Uptime),
            (self.log, Mode::Log),
        ]
        .into_iter()
        .find_map(|(set, mode)| set.then_some(mode))
        .unwrap_or_default()
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.build_info {
        match serde_json::to_string_pretty(&version_info()) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Failed to serialize build information: {e}"),
        }
        return ExitCode::SUCCESS;
    }

    // Initialize logging
    let log_options = LogOptions {
        log_level: cli.log_level.clone(),
        json_format: cli.log_json,
        log_dir: cli.log_dir.clone(),
        ..Default::default()
    };
    let _guard = match init_logging(log_options) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            None
        }
    };

    match run(&cli).await {
        Ok(summary) => {
            print_summary(&summary);
            if cli.strict && summary.has_failures() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> anyhow::Result<RunSummary> {
    let group = cli.group.as_deref().context("No deployment group given")?;

    let file = BeamFile::load(&cli.config)
        .await
        .with_context(|| format!("Unable to load {}", cli.config.display()))?;
    let (defaults, group_config) = file.into_group(group)?;
    let config = resolve(&defaults, group_config)?;

    let mode = cli.mode();
    info!(
        "Running {} for group {} ({} server(s))",
        mode,
        group,
        config.servers.len()
    );

    let connector = SshConnector::default();
    let prompter: Box<dyn Prompter> = if cli.yes {
        Box::new(AssumeYes::new(DialoguerPrompter))
    } else {
        Box::new(DialoguerPrompter)
    };

    let orchestrator = Orchestrator::new(
        &config,
        &connector,
        prompter.as_ref(),
        Arc::new(ConsoleObserver),
    );
    Ok(orchestrator.run(mode).await)
}

fn print_summary(summary: &RunSummary) {
    println!();
    for host in &summary.hosts {
        let line = host.to_string();
        match host.state {
            HostState::Completed => println!("{} {}", "✔".green(), line),
            HostState::Skipped => println!("{} {}", "-".dimmed(), line),
            _ => println!("{} {}", "✘".red(), line),
        }
    }

    let message = summary.completion_message();
    if summary.has_failures() {
        println!(
            "{} ({} of {} host(s) failed)",
            message.yellow().bold(),
            summary.count(HostState::Failed) + summary.count(HostState::Unreachable),
            summary.hosts.len()
        );
    } else {
        println!("{}", message.green().bold());
    }
}
