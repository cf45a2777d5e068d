//! Deployment group declarations

use std::path::PathBuf;

use secrecy::SecretString;
use serde::{Deserialize, Deserializer};

use crate::config::defaults::ReleaseNaming;
use crate::config::version::VersionConstraint;

/// Options declared for one deployment group
///
/// Required fields are optional here so that their absence can be
/// reported by the resolver as a configuration error.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupConfig {
    #[serde(default)]
    pub servers: Option<Vec<ServerConfig>>,

    /// Local path of the release archive (`.tar.gz`)
    #[serde(default)]
    pub release: Option<PathBuf>,

    /// Base directory on the target hosts
    #[serde(default)]
    pub path: Option<String>,

    #[serde(default)]
    pub app_name: Option<String>,

    #[serde(default)]
    pub node_user: Option<String>,

    #[serde(default)]
    pub node_env: Option<String>,

    #[serde(default)]
    pub app_env: Option<String>,

    #[serde(default)]
    pub node_version: Option<VersionConstraint>,

    #[serde(default)]
    pub runtime_binary: Option<String>,

    #[serde(default)]
    pub package_manager_binary: Option<String>,

    #[serde(default)]
    pub package_manager_install_args: Option<String>,

    #[serde(default)]
    pub app_entry_command: Option<String>,

    #[serde(default)]
    pub release_name: Option<String>,

    #[serde(default)]
    pub release_naming: Option<ReleaseNaming>,

    #[serde(default)]
    pub archive_file_name: Option<String>,

    #[serde(default)]
    pub job_name: Option<String>,

    #[serde(default)]
    pub err_log_name: Option<String>,

    #[serde(default)]
    pub std_log_name: Option<String>,

    #[serde(default)]
    pub unit_file_dir: Option<String>,

    #[serde(default)]
    pub log_lines: Option<usize>,
}

/// One target host as declared in a group
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,

    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default, deserialize_with = "deserialize_secret")]
    pub password: Option<SecretString>,

    #[serde(default)]
    pub private_key: Option<PathBuf>,

    #[serde(default)]
    pub agent: Option<PathBuf>,

    /// Ask the operator for username and password before connecting
    #[serde(default)]
    pub enter_credentials: bool,

    #[serde(default)]
    pub ping_interval_secs: Option<u64>,
}

impl ServerConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Default::default()
        }
    }
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.map(SecretString::from))
}
