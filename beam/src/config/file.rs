//! Deployment file loading
//!
//! ```toml
//! [defaults]
//! node_user = "www"
//!
//! [defaults.server]
//! username = "deploy"
//!
//! [groups.production]
//! release = "dist/app-1.0.2.tar.gz"
//! path = "/srv"
//! app_name = "app"
//! node_version = "0.10"
//!
//! [[groups.production.servers]]
//! host = "10.0.0.1"
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::config::defaults::Defaults;
use crate::config::group::GroupConfig;
use crate::errors::BeamError;

/// Default name of the deployment file
pub const DEFAULT_FILE_NAME: &str = "beam.toml";

/// Parsed deployment file
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BeamFile {
    #[serde(default)]
    pub defaults: Defaults,

    #[serde(default)]
    pub groups: BTreeMap<String, GroupConfig>,
}

impl BeamFile {
    /// Parse a deployment file from TOML text
    pub fn parse(text: &str) -> Result<Self, BeamError> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a deployment file
    pub async fn load(path: &Path) -> Result<Self, BeamError> {
        debug!("Loading deployment file: {}", path.display());
        let text = tokio::fs::read_to_string(path).await.map_err(|e| {
            BeamError::ConfigError(format!("Unable to read {}: {}", path.display(), e))
        })?;
        Self::parse(&text)
    }

    /// Names of the declared groups
    pub fn group_names(&self) -> Vec<&str> {
        self.groups.keys().map(String::as_str).collect()
    }

    /// Split into defaults and the named group
    pub fn into_group(mut self, name: &str) -> Result<(Defaults, GroupConfig), BeamError> {
        match self.groups.remove(name) {
            Some(group) => Ok((self.defaults, group)),
            None => Err(BeamError::ConfigError(format!(
                "Unknown deployment group {:?} (declared: {})",
                name,
                self.group_names().join(", ")
            ))),
        }
    }
}
