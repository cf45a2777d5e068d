//! Operating modes

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// What a run does on every host
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Deploy,
    Redeploy,
    Undeploy,
    Remove,
    Rollback,
    Clean,
    Restart,
    Uptime,
    Log,
}

/// Operator facing texts of a mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeMessages {
    /// Short title
    pub title: &'static str,

    /// Per host confirmation question
    pub ready: &'static str,

    /// Printed when the run finishes
    pub complete: &'static str,
}

impl Mode {
    pub const ALL: [Mode; 9] = [
        Mode::Deploy,
        Mode::Redeploy,
        Mode::Undeploy,
        Mode::Remove,
        Mode::Rollback,
        Mode::Clean,
        Mode::Restart,
        Mode::Uptime,
        Mode::Log,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Deploy => "deploy",
            Mode::Redeploy => "redeploy",
            Mode::Undeploy => "undeploy",
            Mode::Remove => "remove",
            Mode::Rollback => "rollback",
            Mode::Clean => "clean",
            Mode::Restart => "restart",
            Mode::Uptime => "uptime",
            Mode::Log => "log",
        }
    }

    pub fn messages(&self) -> ModeMessages {
        match self {
            Mode::Deploy => ModeMessages {
                title: "Deploy",
                ready: "Ready to start deployment (or skip this server)?",
                complete: "Deployment completed!",
            },
            Mode::Redeploy => ModeMessages {
                title: "Redeploy",
                ready: "Ready to replace the release and redeploy (or skip this server)?",
                complete: "Redeployment completed!",
            },
            Mode::Undeploy => ModeMessages {
                title: "Undeploy",
                ready: "Ready to undeploy (or skip this server)?",
                complete: "Undeploy completed!",
            },
            Mode::Remove => ModeMessages {
                title: "Undeploy",
                ready: "Ready to undeploy and remove all related files from server (or skip this server)?",
                complete: "Deployment removal completed!",
            },
            Mode::Rollback => ModeMessages {
                title: "Rollback",
                ready: "Ready to rollback release (or skip this server)?",
                complete: "Rollback completed!",
            },
            Mode::Clean => ModeMessages {
                title: "Clean releases",
                ready: "Ready to clean release (or skip this server)?",
                complete: "Cleaning completed!",
            },
            Mode::Restart => ModeMessages {
                title: "Restart",
                ready: "Ready to restart application (or skip this server)?",
                complete: "Restart completed!",
            },
            Mode::Uptime => ModeMessages {
                title: "Uptime",
                ready: "Ready to check the uptime (or skip this server)?",
                complete: "Uptime printed!",
            },
            Mode::Log => ModeMessages {
                title: "Log",
                ready: "Ready to check log (or skip this server)?",
                complete: "Log printing completed!",
            },
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mode::ALL
            .iter()
            .copied()
            .find(|mode| mode.as_str() == s.to_lowercase())
            .ok_or_else(|| format!("Invalid mode: {}", s))
    }
}
