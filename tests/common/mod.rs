//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use exporter_helper::config::{HelperConfig, ListenerConfig};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;

/// Configuration listening on `addresses`, with the overlay pointed at a
/// file that does not exist so it stays unavailable.
pub fn config_with_addresses(dir: &Path, addresses: &[&str]) -> HelperConfig {
    let mut config = HelperConfig::default();
    config.web.listener = ListenerConfig {
        listen_addresses: addresses.iter().map(|a| a.to_string()).collect(),
        systemd_socket: false,
    };
    config.overlay.identity_file = dir.join("missing-identity.json");
    config.overlay.service_name = "test_exporter".into();
    config.overlay.tunnel_dir = dir.to_path_buf();
    config
}

pub fn socket_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(name)
}

fn split_response(raw: &[u8]) -> (u16, String) {
    let text = String::from_utf8_lossy(raw).to_string();
    let status = text
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);
    let body = text
        .split_once("\r\n\r\n")
        .map(|(_, body)| body.to_string())
        .unwrap_or_default();
    (status, body)
}

fn request(uri: &str) -> String {
    format!("GET {} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n", uri)
}

/// Issue a GET over a unix socket and return status and body.
pub async fn unix_get(path: &Path, uri: &str) -> (u16, String) {
    let mut stream = UnixStream::connect(path).await.unwrap();
    stream.write_all(request(uri).as_bytes()).await.unwrap();
    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.unwrap();
    split_response(&raw)
}

/// Blocking variant for tests that drive a child process.
pub fn unix_get_blocking(path: &Path, uri: &str) -> std::io::Result<(u16, String)> {
    let mut stream = std::os::unix::net::UnixStream::connect(path)?;
    stream.set_read_timeout(Some(Duration::from_secs(5)))?;
    stream.write_all(request(uri).as_bytes())?;
    let mut raw = Vec::new();
    stream.read_to_end(&mut raw)?;
    Ok(split_response(&raw))
}

/// Poll until a unix socket answers HTTP, or give up after `timeout`.
pub async fn wait_for_unix_server(path: &Path, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if path.exists() && UnixStream::connect(path).await.is_ok() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}
