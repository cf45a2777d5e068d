//! Resolved configuration and the derived path model
//!
//! Declared values are fixed once [`resolve`] returns. Every path, file
//! name and identity derived from them is computed on access, so a derived
//! value can never drift from the fields it is built from.

use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::SecretString;

use crate::config::defaults::{Defaults, ReleaseNaming};
use crate::config::group::{GroupConfig, ServerConfig};
use crate::config::version::VersionConstraint;
use crate::errors::BeamError;

/// Login material handed to the transport
#[derive(Debug, Default)]
pub struct Credentials {
    pub username: String,
    pub password: Option<SecretString>,
    pub private_key: Option<PathBuf>,
    pub agent: Option<PathBuf>,
}

/// A target host merged with the server defaults
#[derive(Debug)]
pub struct ServerSpec {
    pub host: String,
    pub port: u16,
    pub credentials: Credentials,
    pub enter_credentials: bool,
    pub ping_interval: Duration,
}

impl ServerSpec {
    /// `user@host:port`, used in prompts and logs
    pub fn display_name(&self) -> String {
        format!("{}@{}:{}", self.credentials.username, self.host, self.port)
    }
}

/// Fully resolved configuration for one run
#[derive(Debug)]
pub struct ResolvedConfig {
    pub servers: Vec<ServerSpec>,
    pub release_archive: PathBuf,
    pub target_base_path: String,
    pub app_name: String,
    pub node_user: String,
    pub node_env: String,
    pub app_env: String,
    pub node_version: Option<VersionConstraint>,
    pub runtime_binary: String,
    pub package_manager_binary: String,
    pub package_manager_install_args: String,
    pub app_entry_command: String,
    pub release_name: String,
    pub archive_file_name: String,
    pub job_name_override: Option<String>,
    pub err_log_name_override: Option<String>,
    pub std_log_name_override: Option<String>,
    pub unit_file_dir: String,
    pub log_lines: usize,
}

/// Merge a group over the defaults
///
/// Fails when the group has no servers, no release archive or no target
/// path.
pub fn resolve(defaults: &Defaults, group: GroupConfig) -> Result<ResolvedConfig, BeamError> {
    let servers = match group.servers {
        Some(servers) if !servers.is_empty() => servers,
        Some(_) => return Err(missing("servers (list is empty)")),
        None => return Err(missing("servers")),
    };
    let release_archive = group.release.ok_or_else(|| missing("release"))?;
    let target_base_path = group.path.ok_or_else(|| missing("path"))?;
    if target_base_path.trim().is_empty() {
        return Err(missing("path (empty)"));
    }

    let release_name = match group.release_name {
        Some(name) => name,
        None => match group.release_naming.unwrap_or(defaults.release_naming) {
            ReleaseNaming::Archive => archive_release_name(&release_archive)?,
            ReleaseNaming::Timestamp => chrono::Utc::now().format("%Y%m%d%H%M%S").to_string(),
        },
    };
    check_path_segment("release name", &release_name)?;

    let app_name = group.app_name.unwrap_or_else(|| defaults.app_name.clone());
    check_path_segment("app name", &app_name)?;
    if let Some(job_name) = &group.job_name {
        check_path_segment("job name", job_name)?;
    }

    let servers = servers
        .into_iter()
        .map(|server| resolve_server(defaults, server))
        .collect();

    Ok(ResolvedConfig {
        servers,
        release_archive,
        target_base_path,
        app_name,
        node_user: group.node_user.unwrap_or_else(|| defaults.node_user.clone()),
        node_env: group.node_env.unwrap_or_else(|| defaults.node_env.clone()),
        app_env: group.app_env.unwrap_or_else(|| defaults.app_env.clone()),
        node_version: group.node_version,
        runtime_binary: group
            .runtime_binary
            .unwrap_or_else(|| defaults.runtime_binary.clone()),
        package_manager_binary: group
            .package_manager_binary
            .unwrap_or_else(|| defaults.package_manager_binary.clone()),
        package_manager_install_args: group
            .package_manager_install_args
            .unwrap_or_else(|| defaults.package_manager_install_args.clone()),
        app_entry_command: group
            .app_entry_command
            .unwrap_or_else(|| defaults.app_entry_command.clone()),
        release_name,
        archive_file_name: group
            .archive_file_name
            .unwrap_or_else(|| defaults.archive_file_name.clone()),
        job_name_override: group.job_name,
        err_log_name_override: group.err_log_name,
        std_log_name_override: group.std_log_name,
        unit_file_dir: group
            .unit_file_dir
            .unwrap_or_else(|| defaults.unit_file_dir.clone()),
        log_lines: group.log_lines.unwrap_or(defaults.log_lines),
    })
}

/// Names that become a single remote path component
fn check_path_segment(what: &str, value: &str) -> Result<(), BeamError> {
    if value.trim().is_empty() || value.contains('/') || value == "." || value == ".." {
        return Err(BeamError::ConfigError(format!("Invalid {}: {:?}", what, value)));
    }
    Ok(())
}

fn missing(field: &str) -> BeamError {
    BeamError::ConfigError(format!("Missing required option: {}", field))
}

fn resolve_server(defaults: &Defaults, server: ServerConfig) -> ServerSpec {
    let server_defaults = &defaults.server;
    ServerSpec {
        host: server.host,
        port: server.port.unwrap_or(server_defaults.port),
        credentials: Credentials {
            username: server
                .username
                .unwrap_or_else(|| server_defaults.username.clone()),
            password: server.password,
            private_key: server
                .private_key
                .or_else(|| server_defaults.private_key.clone()),
            agent: server.agent.or_else(|| server_defaults.agent.clone()),
        },
        enter_credentials: server.enter_credentials,
        ping_interval: Duration::from_secs(
            server
                .ping_interval_secs
                .unwrap_or(server_defaults.ping_interval_secs),
        ),
    }
}

/// Release name taken from the archive file name
fn archive_release_name(archive: &Path) -> Result<String, BeamError> {
    let file_name = archive
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            BeamError::ConfigError(format!("Invalid release archive: {}", archive.display()))
        })?;

    let name = file_name
        .strip_suffix(".tar.gz")
        .or_else(|| file_name.strip_suffix(".tgz"))
        .unwrap_or(file_name);
    Ok(name.to_string())
}

/// Join remote POSIX path segments
pub fn remote_join(base: &str, name: &str) -> String {
    if base.ends_with('/') {
        format!("{}{}", base, name)
    } else {
        format!("{}/{}", base, name)
    }
}

impl ResolvedConfig {
    /// `<targetBasePath>/<appName>`
    pub fn application_path(&self) -> String {
        remote_join(&self.target_base_path, &self.app_name)
    }

    /// `<applicationPath>/releases`
    pub fn releases_path(&self) -> String {
        remote_join(&self.application_path(), "releases")
    }

    /// Directory of a named release
    pub fn release_path(&self, release: &str) -> String {
        remote_join(&self.releases_path(), release)
    }

    /// Directory of the release being deployed
    pub fn current_release_path(&self) -> String {
        self.release_path(&self.release_name)
    }

    /// Upload target of the release archive
    pub fn release_archive_target_path(&self) -> String {
        remote_join(&self.current_release_path(), &self.archive_file_name)
    }

    /// `<applicationPath>/current`, the symlink to the active release
    pub fn current_link_path(&self) -> String {
        remote_join(&self.application_path(), "current")
    }

    pub fn log_path(&self) -> String {
        remote_join(&self.current_release_path(), "logs")
    }

    /// Log directory reached through the current link
    pub fn log_path_sym(&self) -> String {
        remote_join(&self.current_link_path(), "logs")
    }

    pub fn err_log_name(&self) -> String {
        self.err_log_name_override
            .clone()
            .unwrap_or_else(|| format!("{}.err.log", self.app_name))
    }

    pub fn std_log_name(&self) -> String {
        self.std_log_name_override
            .clone()
            .unwrap_or_else(|| format!("{}.std.log", self.app_name))
    }

    pub fn err_log_path(&self) -> String {
        remote_join(&self.log_path_sym(), &self.err_log_name())
    }

    pub fn std_log_path(&self) -> String {
        remote_join(&self.log_path_sym(), &self.std_log_name())
    }

    /// Upstart job name
    pub fn job_name(&self) -> String {
        self.job_name_override
            .clone()
            .unwrap_or_else(|| format!("{}-{}", self.app_name, self.node_env))
    }

    /// `<unitFileDir>/<jobName>.conf`
    pub fn unit_file_path(&self) -> String {
        remote_join(&self.unit_file_dir, &format!("{}.conf", self.job_name()))
    }

    /// Entry point reached through the current link
    pub fn app_entry_path(&self) -> String {
        remote_join(&self.current_link_path(), &self.app_entry_command)
    }
}
