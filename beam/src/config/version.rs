//! Runtime version constraints

use std::fmt;
use std::sync::Arc;

use semver::{Version, VersionReq};
use serde::Deserialize;

use crate::errors::BeamError;

/// Longest version string accepted after the leading `v`
const MAX_VERSION_LEN: usize = 8;

/// Predicate over a detected version string such as `0.10.36`
#[derive(Clone)]
pub struct VersionPredicate(Arc<dyn Fn(&str) -> bool + Send + Sync>);

impl VersionPredicate {
    pub fn new(f: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }
}

impl fmt::Debug for VersionPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("VersionPredicate(..)")
    }
}

/// Constraint the remote runtime version must satisfy before deploying
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "VersionSetting")]
pub enum VersionConstraint {
    /// Detected version must start with this string (`"0.10"`)
    Prefix(String),

    /// Detected version must satisfy a semver requirement (`">=0.10, <0.12"`)
    Requirement(VersionReq),

    /// Arbitrary check, only available to library callers
    Predicate(VersionPredicate),
}

/// Shape of `node_version` in the deployment file
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum VersionSetting {
    Prefix(String),
    Requirement { semver: String },
}

impl TryFrom<VersionSetting> for VersionConstraint {
    type Error = String;

    fn try_from(setting: VersionSetting) -> Result<Self, Self::Error> {
        match setting {
            VersionSetting::Prefix(prefix) => Ok(VersionConstraint::Prefix(prefix)),
            VersionSetting::Requirement { semver } => VersionReq::parse(&semver)
                .map(VersionConstraint::Requirement)
                .map_err(|e| format!("invalid semver requirement {:?}: {}", semver, e)),
        }
    }
}

impl VersionConstraint {
    /// Check a detected version string against the constraint
    pub fn matches(&self, detected: &str) -> bool {
        match self {
            VersionConstraint::Prefix(prefix) => detected.starts_with(prefix.as_str()),
            VersionConstraint::Requirement(req) => {
                lenient_version(detected).is_some_and(|v| req.matches(&v))
            }
            VersionConstraint::Predicate(predicate) => (predicate.0)(detected),
        }
    }

    /// Human readable form used in mismatch errors
    pub fn describe(&self) -> String {
        match self {
            VersionConstraint::Prefix(prefix) => prefix.clone(),
            VersionConstraint::Requirement(req) => req.to_string(),
            VersionConstraint::Predicate(_) => "custom predicate".to_string(),
        }
    }

    /// Extract the version from `--version` output and check it
    ///
    /// Returns the detected version on success.
    pub fn check_output(&self, output: &str) -> Result<String, BeamError> {
        let detected = detect_version(output)
            .ok_or_else(|| BeamError::VersionNotDetected(output.trim().to_string()))?;

        if self.matches(&detected) {
            Ok(detected)
        } else {
            Err(BeamError::VersionMismatch {
                detected,
                required: self.describe(),
            })
        }
    }
}

/// Find the first `v<digits and dots>` run in the output
pub fn detect_version(output: &str) -> Option<String> {
    output.match_indices('v').find_map(|(idx, _)| {
        let version: String = output[idx + 1..]
            .chars()
            .take_while(|c| c.is_ascii_digit() || *c == '.')
            .take(MAX_VERSION_LEN)
            .collect();

        if version.starts_with(|c: char| c.is_ascii_digit()) {
            Some(version)
        } else {
            None
        }
    })
}

/// Parse `0.10` or `0.10.36` as semver, padding missing components
fn lenient_version(detected: &str) -> Option<Version> {
    let mut parts: Vec<&str> = detected
        .trim_end_matches('.')
        .split('.')
        .take(3)
        .collect();
    while parts.len() < 3 {
        parts.push("0");
    }
    Version::parse(&parts.join(".")).ok()
}
