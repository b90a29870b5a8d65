//! Integration tests for the tokio façade

use std::sync::Arc;
use std::time::Duration;

use nix::sys::signal::Signal;
use spawnkit::{Capture, ProcessConfig, ProcessError, ProcessManager};

#[tokio::test]
async fn test_manager_output() {
    let manager = ProcessManager::new();
    let config = ProcessConfig::new("sh")
        .args(["-c", "echo 42; echo warn >&2; exit 4"])
        .poll_interval(Duration::from_millis(10))
        .settle_delay(Duration::ZERO);

    let output = manager.output(config).await.expect("output");
    assert_eq!(output.status.code(), 4);
    assert_eq!(output.stdout, b"42\n");
    assert_eq!(output.stderr, b"warn\n");
}

#[tokio::test]
async fn test_manager_wait_times_out_then_shutdown() {
    let manager = ProcessManager::new();
    let config = ProcessConfig::new("sleep")
        .args(["10"])
        .capture(Capture::NONE)
        .wait_timeout(Duration::from_millis(100))
        .poll_interval(Duration::from_millis(20));

    let process = manager.spawn(config).expect("spawn");
    let err = manager.wait(Arc::clone(&process)).await.unwrap_err();
    assert!(matches!(err, ProcessError::Timeout { .. }));
    assert!(process.exists());

    manager
        .shutdown(Arc::clone(&process), Duration::from_secs(2))
        .await
        .expect("shutdown");
    assert!(!process.exists());

    let status = manager.wait(process).await.expect("recorded termination");
    assert_eq!(status.signal(), Some(Signal::SIGINT));
}

#[tokio::test]
async fn test_manager_spawn_failure() {
    let manager = ProcessManager::new();
    let err = manager
        .spawn(ProcessConfig::new("spawnkit-definitely-not-a-command"))
        .unwrap_err();
    assert!(matches!(err, ProcessError::SpawnFailed(_)));
}
