//! Shutdown on SIGINT and SIGTERM.
//!
//! Signals are raised on the test process itself, and every running daemon
//! in the process sees them. These tests live in their own binary and take
//! turns through `SERIAL` so each signal reaches exactly one daemon.

use std::process::Command as Process;

use pretty_assertions::assert_eq;
use tokio::sync::Mutex;

use torchd_core::LedState;
use torchd_test_utils::TestDaemon;

static SERIAL: Mutex<()> = Mutex::const_new(());

fn raise(signal: &str) {
    let status = Process::new("kill")
        .args([signal, &std::process::id().to_string()])
        .status()
        .expect("failed to run kill");
    assert!(status.success());
}

#[test_log::test(tokio::test)]
async fn test_sigterm_releases_held_line() {
    let _turn = SERIAL.lock().await;
    let mut daemon = TestDaemon::start().await;

    daemon.send("torch").await;
    assert!(daemon.wait_for(|s| s.open_lines == 1).await);

    raise("-TERM");
    let (stopped, result) = daemon.join().await;

    result.unwrap();
    assert_eq!(daemon.hardware.open_lines(), 0);
    assert_eq!(stopped.led_state(), LedState::Off);
    assert!(!stopped.line_held());
    assert!(!daemon.socket_path().exists());
}

#[tokio::test]
async fn test_sigterm_when_idle() {
    let _turn = SERIAL.lock().await;
    let mut daemon = TestDaemon::start().await;

    raise("-TERM");
    let (stopped, result) = daemon.join().await;

    result.unwrap();
    assert_eq!(daemon.hardware.open_lines(), 0);
    assert_eq!(stopped.led_state(), LedState::Off);
    assert!(!daemon.socket_path().exists());
}

#[tokio::test]
async fn test_sigint_during_open_session() {
    let _turn = SERIAL.lock().await;
    let mut daemon = TestDaemon::start().await;
    let mut client = daemon.connect().await;

    tokio::io::AsyncWriteExt::write_all(&mut client, b"red")
        .await
        .unwrap();
    assert!(daemon.wait_for(|s| s.open_lines == 1).await);

    raise("-INT");
    let (stopped, result) = daemon.join().await;

    result.unwrap();
    assert_eq!(daemon.hardware.open_lines(), 0);
    assert_eq!(stopped.led_state(), LedState::Off);
    assert!(!daemon.socket_path().exists());
}
