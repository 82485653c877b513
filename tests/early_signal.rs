//! A termination signal that arrives while listeners are still being opened.
//!
//! Kept in its own test binary: the signal is sent to the test process.

use std::process::Command;
use std::time::Duration;

use exporter_helper::config::ListenerConfig;
use exporter_helper::http::serve_with_signals;
use exporter_helper::lifecycle::{TerminationSignal, TerminationSignals};
use exporter_helper::net::select_listeners;
use exporter_helper::{ServeOutcome, Shutdown};

mod common;

#[tokio::test]
async fn signal_before_serving_still_removes_socket() {
    let dir = tempfile::tempdir().unwrap();
    let sock = common::socket_path(dir.path(), "exporter.sock");

    let signals = TerminationSignals::install().unwrap();
    let status = Command::new("kill")
        .args(["-TERM", &std::process::id().to_string()])
        .status()
        .unwrap();
    assert!(status.success());

    let config = ListenerConfig {
        listen_addresses: vec![sock.to_str().unwrap().into()],
        systemd_socket: false,
    };
    let set = select_listeners(&config, &[]).await.unwrap();
    assert!(sock.exists());

    let outcome = tokio::time::timeout(
        Duration::from_secs(5),
        serve_with_signals(set, axum::Router::new(), signals, &Shutdown::new()),
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(outcome, ServeOutcome::Signal(TerminationSignal::Terminate));
    assert!(!sock.exists());
}
