//! Deployment configuration

pub mod defaults;
pub mod file;
pub mod group;
pub mod resolved;
pub mod version;

pub use defaults::{Defaults, ReleaseNaming, ServerDefaults};
pub use file::BeamFile;
pub use group::{GroupConfig, ServerConfig};
pub use resolved::{resolve, Credentials, ResolvedConfig, ServerSpec};
pub use version::{VersionConstraint, VersionPredicate};
