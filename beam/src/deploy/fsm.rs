//! Finite State Machine for one host's run

use serde::{Deserialize, Serialize};

/// Where a host stands within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostState {
    /// Waiting for the operator's confirmation
    Pending,

    /// Operator declined, nothing was done
    Skipped,

    /// Confirmed, opening the session
    Connecting,

    /// Session open, pipeline running
    Running,

    /// Every step succeeded
    Completed,

    /// A step failed; remaining steps were skipped
    Failed,

    /// The session could not be opened
    Unreachable,
}

impl HostState {
    /// No further events are expected
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            HostState::Skipped | HostState::Completed | HostState::Failed | HostState::Unreachable
        )
    }
}

/// Host run event
#[derive(Debug, Clone)]
pub enum HostEvent {
    /// Operator confirmed the host
    Confirm,

    /// Operator skipped the host
    Decline,

    /// Session is open
    Connected,

    /// Session could not be opened
    ConnectFailed(String),

    /// A pipeline step failed
    StepFailed { step: &'static str, error: String },

    /// The pipeline ran to its end
    Finished,

    /// Anything else that stops the host before its pipeline starts
    Abort(String),
}

/// Host run FSM
#[derive(Debug, Clone)]
pub struct HostFsm {
    state: HostState,
    failed_step: Option<&'static str>,
    error: Option<String>,
}

impl HostFsm {
    /// Create a new FSM in pending state
    pub fn new() -> Self {
        Self {
            state: HostState::Pending,
            failed_step: None,
            error: None,
        }
    }

    pub fn state(&self) -> HostState {
        self.state
    }

    /// Name of the first step that failed
    pub fn failed_step(&self) -> Option<&'static str> {
        self.failed_step
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Process an event and transition state
    pub fn process(&mut self, event: HostEvent) -> Result<(), String> {
        let new_state = match (self.state, &event) {
            // From Pending
            (HostState::Pending, HostEvent::Confirm) => HostState::Connecting,
            (HostState::Pending, HostEvent::Decline) => HostState::Skipped,
            (HostState::Pending | HostState::Connecting, HostEvent::Abort(err)) => {
                self.error = Some(err.clone());
                HostState::Failed
            }

            // From Connecting
            (HostState::Connecting, HostEvent::Connected) => HostState::Running,
            (HostState::Connecting, HostEvent::ConnectFailed(err)) => {
                self.error = Some(err.clone());
                HostState::Unreachable
            }

            // From Running
            (HostState::Running, HostEvent::StepFailed { step, error }) => {
                self.failed_step = Some(step);
                self.error = Some(error.clone());
                HostState::Failed
            }
            (HostState::Running, HostEvent::Finished) => HostState::Completed,

            // Closing the session still runs after a failure
            (HostState::Failed, HostEvent::StepFailed { .. }) => HostState::Failed,
            (HostState::Failed, HostEvent::Finished) => HostState::Failed,

            // Invalid transitions
            (state, event) => {
                return Err(format!("Invalid transition: {:?} -> {:?}", state, event));
            }
        };

        self.state = new_state;
        Ok(())
    }
}

impl Default for HostFsm {
    fn default() -> Self {
        Self::new()
    }
}
