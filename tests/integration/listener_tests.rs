//! Tests against a live plain-HTTP listener.

use std::sync::Arc;
use std::time::Duration;

use axum_server::Handle;
use serde_json::Value;

use vuln_admission_webhook::{
    HealthState, VulnerabilityTable, WebhookError, WebhookState, run_webhook_server,
};

use crate::{http_request, plaintext_config, start_server};

#[tokio::test]
async fn test_health_over_tcp() {
    let server = start_server(plaintext_config()).await;

    let (status, body) = http_request(server.addr, "POST", "/health", "").await;
    assert_eq!(status, 200);
    assert!(body.contains(r#""status":"healthy""#));

    server.handle.graceful_shutdown(Some(Duration::from_secs(1)));
    server.task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_validate_over_tcp() {
    let server = start_server(plaintext_config()).await;

    let review = r#"{
        "apiVersion": "admission.k8s.io/v1",
        "kind": "AdmissionReview",
        "request": {
            "uid": "e911857d-c318-11e8-bbad-025000000001",
            "object": {
                "metadata": {
                    "name": "payments",
                    "annotations": {"cve.detected": "CVE-2024-1234", "signature.verified": "false"}
                }
            }
        }
    }"#;
    let (status, body) = http_request(server.addr, "POST", "/validate", review).await;
    assert_eq!(status, 200);

    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["response"]["uid"], "e911857d-c318-11e8-bbad-025000000001");
    assert_eq!(json["response"]["allowed"], false);
    assert_eq!(
        json["response"]["status"]["message"],
        "Deployment blocked: Image signature not verified"
    );

    server.handle.graceful_shutdown(Some(Duration::from_secs(1)));
    server.task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_malformed_body_does_not_stop_listener() {
    let server = start_server(plaintext_config()).await;

    let (status, body) = http_request(server.addr, "POST", "/validate", "not json").await;
    assert_eq!(status, 500);
    assert!(body.contains("Error processing request"));

    // The listener keeps serving after a failed request
    let (status, _) = http_request(server.addr, "POST", "/validate", "{}").await;
    assert_eq!(status, 200);

    let (status, _) = http_request(server.addr, "POST", "/unknown", "{}").await;
    assert_eq!(status, 404);

    server.handle.graceful_shutdown(Some(Duration::from_secs(1)));
    server.task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_ready_once_listening() {
    let server = start_server(plaintext_config()).await;

    // Readiness is flipped by a task that races the first connection
    let mut ready = false;
    for _ in 0..50 {
        if server.health.is_ready().await {
            ready = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(ready);

    server.handle.graceful_shutdown(Some(Duration::from_secs(1)));
    server.task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_invalid_tls_material_is_fatal() {
    let dir = std::env::temp_dir().join(format!(
        "vuln-admission-webhook-tls-{}",
        std::process::id()
    ));
    std::fs::create_dir_all(&dir).unwrap();
    let cert_path = dir.join("tls.crt");
    let key_path = dir.join("tls.key");
    std::fs::write(&cert_path, "not a certificate").unwrap();
    std::fs::write(&key_path, "not a key").unwrap();

    let mut config = plaintext_config();
    config.cert_path = cert_path;
    config.key_path = key_path;

    let state = Arc::new(WebhookState::new(
        Arc::new(VulnerabilityTable::empty()),
        Arc::new(HealthState::new()),
    ));
    let result = run_webhook_server(&config, state, Handle::new()).await;
    assert!(matches!(result, Err(WebhookError::TlsConfig(_))));

    std::fs::remove_dir_all(dir).unwrap();
}
