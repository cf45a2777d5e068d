//! Host FSM tests

use beam::deploy::fsm::{HostEvent, HostFsm, HostState};

#[test]
fn test_fsm_initial_state() {
    let fsm = HostFsm::new();
    assert_eq!(fsm.state(), HostState::Pending);
    assert!(fsm.error().is_none());
    assert!(fsm.failed_step().is_none());
    assert!(!fsm.state().is_terminal());
}

#[test]
fn test_fsm_decline_flow() {
    let mut fsm = HostFsm::new();

    fsm.process(HostEvent::Decline).unwrap();
    assert_eq!(fsm.state(), HostState::Skipped);
    assert!(fsm.state().is_terminal());

    // Nothing follows a skip
    assert!(fsm.process(HostEvent::Connected).is_err());
}

#[test]
fn test_fsm_unreachable_flow() {
    let mut fsm = HostFsm::new();

    fsm.process(HostEvent::Confirm).unwrap();
    fsm.process(HostEvent::ConnectFailed("Connection refused".to_string()))
        .unwrap();

    assert_eq!(fsm.state(), HostState::Unreachable);
    assert_eq!(fsm.error(), Some("Connection refused"));
    assert!(fsm.failed_step().is_none());
}

#[test]
fn test_fsm_keeps_first_failure() {
    let mut fsm = HostFsm::new();

    fsm.process(HostEvent::Confirm).unwrap();
    fsm.process(HostEvent::Connected).unwrap();
    fsm.process(HostEvent::StepFailed {
        step: "start",
        error: "exit code 1".to_string(),
    })
    .unwrap();
    fsm.process(HostEvent::StepFailed {
        step: "closeSession",
        error: "broken pipe".to_string(),
    })
    .unwrap();
    fsm.process(HostEvent::Finished).unwrap();

    assert_eq!(fsm.state(), HostState::Failed);
    assert_eq!(fsm.failed_step(), Some("start"));
    assert_eq!(fsm.error(), Some("exit code 1"));
}

#[test]
fn test_fsm_invalid_transition() {
    let mut fsm = HostFsm::new();

    // Cannot finish before connecting
    let result = fsm.process(HostEvent::Finished);
    assert!(result.is_err());
    assert_eq!(fsm.state(), HostState::Pending);
}
