//! Pipeline builder tests

use beam::config::{resolve, Defaults, VersionConstraint};
use beam::deploy::{build_pipeline, Mode};

use crate::support::{config, group};

const DEPLOY_TAIL: [&str; 10] = [
    "uploadArchive",
    "extractArchive",
    "createSymlink",
    "installDependencies",
    "writeUnitFile",
    "setOwnership",
    "stopIfRunning",
    "start",
    "tailLogs",
    "closeSession",
];

#[test]
fn test_deploy_steps() {
    let pipeline = build_pipeline(Mode::Deploy, &config(&["web-1"]));

    let mut expected = vec!["checkUptime", "prepareDirectories"];
    expected.extend(DEPLOY_TAIL);
    assert_eq!(pipeline.names(), expected);
}

#[test]
fn test_deploy_steps_with_version_constraint() {
    let mut group = group(&["web-1"]);
    group.node_version = Some(VersionConstraint::Prefix("0.10".to_string()));
    let config = resolve(&Defaults::default(), group).unwrap();

    let mut expected = vec!["checkUptime", "checkRuntimeVersion", "prepareDirectories"];
    expected.extend(DEPLOY_TAIL);
    assert_eq!(build_pipeline(Mode::Deploy, &config).names(), expected);
}

#[test]
fn test_redeploy_cleans_after_prepare() {
    let pipeline = build_pipeline(Mode::Redeploy, &config(&["web-1"]));

    let mut expected = vec!["checkUptime", "prepareDirectories", "cleanCurrentReleaseDir"];
    expected.extend(DEPLOY_TAIL);
    assert_eq!(pipeline.names(), expected);
}

#[test]
fn test_lifecycle_steps() {
    let config = config(&["web-1"]);
    let cases: [(Mode, &[&str]); 7] = [
        (Mode::Undeploy, &["stopIfRunning", "removeUnitFile", "closeSession"]),
        (
            Mode::Remove,
            &["stopIfRunning", "removeUnitFile", "removeAllApplicationData", "closeSession"],
        ),
        (
            Mode::Rollback,
            &[
                "selectReleaseInteractively",
                "writeUnitFile",
                "setOwnership",
                "stopIfRunning",
                "start",
                "tailLogs",
                "closeSession",
            ],
        ),
        (Mode::Clean, &["selectReleasesToDeleteInteractively", "closeSession"]),
        (Mode::Restart, &["stopIfRunning", "start", "tailLogs", "closeSession"]),
        (Mode::Uptime, &["checkUptime", "closeSession"]),
        (Mode::Log, &["tailLogs", "closeSession"]),
    ];

    for (mode, expected) in cases {
        assert_eq!(build_pipeline(mode, &config).names(), expected, "mode {}", mode);
    }
}

#[test]
fn test_pipeline_is_host_independent() {
    let one = build_pipeline(Mode::Deploy, &config(&["web-1"]));
    let many = build_pipeline(Mode::Deploy, &config(&["web-1", "web-2", "web-3"]));
    assert_eq!(one, many);
}
