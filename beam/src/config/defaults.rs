//! Built-in defaults
//!
//! Every field can be overridden by the `[defaults]` table of the
//! deployment file, and again by each group.

use std::path::PathBuf;

use serde::Deserialize;

/// How the release directory name is chosen when not set explicitly
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseNaming {
    /// File name of the release archive without `.tar.gz`
    #[default]
    Archive,

    /// UTC timestamp taken when the configuration is resolved
    Timestamp,
}

/// Application defaults
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Defaults {
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Owner of the release files and of the running process
    #[serde(default = "default_node_user")]
    pub node_user: String,

    #[serde(default = "default_node_env")]
    pub node_env: String,

    /// Extra `KEY=value` assignments placed on the start command line
    #[serde(default)]
    pub app_env: String,

    #[serde(default = "default_runtime_binary")]
    pub runtime_binary: String,

    #[serde(default = "default_package_manager_binary")]
    pub package_manager_binary: String,

    #[serde(default = "default_package_manager_install_args")]
    pub package_manager_install_args: String,

    /// Entry point relative to the release directory
    #[serde(default = "default_app_entry_command")]
    pub app_entry_command: String,

    #[serde(default)]
    pub release_naming: ReleaseNaming,

    /// Name of the uploaded archive inside the release directory
    #[serde(default = "default_archive_file_name")]
    pub archive_file_name: String,

    /// Directory holding upstart job files
    #[serde(default = "default_unit_file_dir")]
    pub unit_file_dir: String,

    /// Number of log lines shown after start and in `log` mode
    #[serde(default = "default_log_lines")]
    pub log_lines: usize,

    #[serde(default)]
    pub server: ServerDefaults,
}

fn default_app_name() -> String {
    "default".to_string()
}

fn default_node_user() -> String {
    "root".to_string()
}

fn default_node_env() -> String {
    "production".to_string()
}

fn default_runtime_binary() -> String {
    "node".to_string()
}

fn default_package_manager_binary() -> String {
    "npm".to_string()
}

fn default_package_manager_install_args() -> String {
    "install --production".to_string()
}

fn default_app_entry_command() -> String {
    "index.js".to_string()
}

fn default_archive_file_name() -> String {
    "RELEASE.tar.gz".to_string()
}

fn default_unit_file_dir() -> String {
    "/etc/init".to_string()
}

fn default_log_lines() -> usize {
    50
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            node_user: default_node_user(),
            node_env: default_node_env(),
            app_env: String::new(),
            runtime_binary: default_runtime_binary(),
            package_manager_binary: default_package_manager_binary(),
            package_manager_install_args: default_package_manager_install_args(),
            app_entry_command: default_app_entry_command(),
            release_naming: ReleaseNaming::default(),
            archive_file_name: default_archive_file_name(),
            unit_file_dir: default_unit_file_dir(),
            log_lines: default_log_lines(),
            server: ServerDefaults::default(),
        }
    }
}

/// Connection defaults applied to every server entry
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerDefaults {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_username")]
    pub username: String,

    /// Keep-alive interval in seconds
    #[serde(default = "default_ping_interval_secs")]
    pub ping_interval_secs: u64,

    #[serde(default)]
    pub private_key: Option<PathBuf>,

    /// SSH agent socket
    #[serde(default)]
    pub agent: Option<PathBuf>,
}

fn default_port() -> u16 {
    22
}

fn default_username() -> String {
    "root".to_string()
}

fn default_ping_interval_secs() -> u64 {
    10
}

impl Default for ServerDefaults {
    fn default() -> Self {
        Self {
            port: default_port(),
            username: default_username(),
            ping_interval_secs: default_ping_interval_secs(),
            private_key: None,
            agent: None,
        }
    }
}
