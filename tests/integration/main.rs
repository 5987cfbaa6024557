// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]

//! Integration tests for vuln-admission-webhook.
//!
//! These tests start the real listener in plain HTTP mode on an ephemeral
//! port and talk to it over TCP.

mod listener_tests;
mod router_tests;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum_server::Handle;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

use vuln_admission_webhook::{
    Config, HealthState, VulnerabilityTable, WebhookError, WebhookState, run_webhook_server,
};

/// A webhook server running on an ephemeral port
pub struct RunningServer {
    pub addr: SocketAddr,
    pub handle: Handle,
    pub health: Arc<HealthState>,
    pub task: JoinHandle<Result<(), WebhookError>>,
}

/// Config that forces plain HTTP on an ephemeral port
pub fn plaintext_config() -> Config {
    Config {
        port: 0,
        cert_path: PathBuf::from("/nonexistent/tls.crt"),
        key_path: PathBuf::from("/nonexistent/tls.key"),
        ..Config::default()
    }
}

pub async fn start_server(config: Config) -> RunningServer {
    let health = Arc::new(HealthState::new());
    let state = Arc::new(WebhookState::new(
        Arc::new(VulnerabilityTable::from_json(r#"{"CVE-2024-1234": {}}"#)),
        health.clone(),
    ));
    let handle = Handle::new();
    let task = {
        let handle = handle.clone();
        tokio::spawn(async move { run_webhook_server(&config, state, handle).await })
    };

    let bound = tokio::time::timeout(Duration::from_secs(5), handle.listening())
        .await
        .expect("server did not start listening in time")
        .expect("server failed to bind");
    let addr = SocketAddr::from(([127, 0, 0, 1], bound.port()));

    RunningServer {
        addr,
        handle,
        health,
        task,
    }
}

/// Send one HTTP/1.1 request and return (status code, body)
pub async fn http_request(addr: SocketAddr, method: &str, path: &str, body: &str) -> (u16, String) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!(
        "{method} {path} HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.unwrap();
    let raw = String::from_utf8(raw).unwrap();

    let (head, body) = raw.split_once("\r\n\r\n").expect("malformed HTTP response");
    let status = head
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse().ok())
        .expect("missing status code");
    (status, body.to_string())
}
