//! Remote operation executor tests

use std::path::Path;
use std::sync::Arc;

use beam::config::Credentials;
use beam::errors::BeamError;
use beam::remote::{ExecOptions, Session};

use crate::support::{config, MockConnector, Op, SilentObserver};

async fn open(connector: &MockConnector) -> Session {
    let config = config(&["web-1"]);
    Session::open(
        connector,
        &config.servers[0],
        &Credentials::default(),
        Arc::new(SilentObserver),
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn test_exec_ignore_error() {
    let connector = MockConnector::new();
    connector.exit_code("stop", 1);
    let mut session = open(&connector).await;

    let result = session
        .exec("stop app-production", ExecOptions::ignore_error())
        .await
        .unwrap();
    assert_eq!(result.exit_code, Some(1));

    let err = session
        .exec("stop app-production", ExecOptions::default())
        .await
        .unwrap_err();
    match err {
        BeamError::CommandError {
            host,
            command,
            exit_code,
            signal,
        } => {
            assert_eq!(host, "web-1");
            assert_eq!(command, "stop app-production");
            assert_eq!(exit_code, Some(1));
            assert_eq!(signal, None);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_exec_return_output() {
    let connector = MockConnector::new();
    connector.output("node --version", "v0.10.36\n");
    let mut session = open(&connector).await;

    let kept = session
        .exec("node --version", ExecOptions::return_output())
        .await
        .unwrap();
    assert_eq!(kept.output, "v0.10.36\n");

    let dropped = session
        .exec("node --version", ExecOptions::default())
        .await
        .unwrap();
    assert!(dropped.output.is_empty());
}

#[tokio::test]
async fn test_list_directory_error_carries_path() {
    let connector = MockConnector::new();
    let mut session = open(&connector).await;

    let err = session.list_directory("/srv/missing").await.unwrap_err();
    assert!(matches!(
        err,
        BeamError::ListError { ref host, ref remote, .. } if host == "web-1" && remote == "/srv/missing"
    ));
}

#[tokio::test]
async fn test_closed_session_rejects_operations() {
    let connector = MockConnector::new();
    let mut session = open(&connector).await;

    session.close().await.unwrap();
    session.close().await.unwrap();
    assert!(session.is_closed());

    assert!(matches!(
        session.exec("uptime", ExecOptions::default()).await,
        Err(BeamError::SessionError(_))
    ));
    assert!(matches!(
        session.upload(Path::new("app.tar.gz"), "/tmp/app.tar.gz").await,
        Err(BeamError::SessionError(_))
    ));

    // Only one close reaches the transport
    let closes = connector
        .ops()
        .into_iter()
        .filter(|op| matches!(op, Op::Close { .. }))
        .count();
    assert_eq!(closes, 1);
}

#[tokio::test]
async fn test_unreachable_host_is_connection_error() {
    let connector = MockConnector::new();
    connector.unreachable("web-1");
    let config = config(&["web-1"]);

    let result = Session::open(
        &connector,
        &config.servers[0],
        &Credentials::default(),
        Arc::new(SilentObserver),
    )
    .await;
    assert!(matches!(result, Err(BeamError::ConnectionError { ref host, .. }) if host == "web-1"));
}

#[tokio::test]
async fn test_failed_upload_is_transfer_error() {
    let connector = MockConnector::new();
    connector.fail_upload("/srv/app/releases");
    let mut session = open(&connector).await;

    let err = session
        .upload(Path::new("dist/app-1.0.3.tar.gz"), "/srv/app/releases/app-1.0.3/RELEASE.tar.gz")
        .await
        .unwrap_err();
    match err {
        BeamError::TransferError {
            host,
            local,
            remote,
            message,
        } => {
            assert_eq!(host, "web-1");
            assert_eq!(local, "dist/app-1.0.3.tar.gz");
            assert_eq!(remote, "/srv/app/releases/app-1.0.3/RELEASE.tar.gz");
            assert!(message.contains("No space left on device"));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    // Other destinations are unaffected
    session
        .upload(Path::new("dist/app-1.0.3.tar.gz"), "/tmp/app.tar.gz")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_failed_write_is_write_error() {
    let connector = MockConnector::new();
    connector.fail_write("/etc/init");
    let mut session = open(&connector).await;

    let err = session
        .write_content("#!upstart\n", "/etc/init/app-production.conf")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        BeamError::WriteError { ref host, ref remote, ref message }
            if host == "web-1"
                && remote == "/etc/init/app-production.conf"
                && message.contains("Permission denied")
    ));
    assert!(err.to_string().contains("web-1:/etc/init/app-production.conf"));
}
