//! Router-level tests driven through `tower::ServiceExt::oneshot`.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::extract::connect_info::MockConnectInfo;
use axum::http::{Request, StatusCode};
use kube::core::DynamicObject;
use tower::ServiceExt;

use vuln_admission_webhook::health::{self, HealthState};
use vuln_admission_webhook::webhooks::AdmissionReview;
use vuln_admission_webhook::{VulnerabilityTable, WebhookState, create_webhook_router};

fn webhook_router(health: Arc<HealthState>) -> Router {
    let state = Arc::new(WebhookState::new(
        Arc::new(VulnerabilityTable::empty()),
        health,
    ));
    create_webhook_router(state).layer(MockConnectInfo(SocketAddr::from(([127, 0, 0, 1], 5555))))
}

async fn post(router: Router, uri: &str, body: String) -> (StatusCode, Vec<u8>) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    (status, body.to_vec())
}

fn deployment_review(uid: &str, annotations: serde_json::Value) -> String {
    serde_json::json!({
        "apiVersion": "admission.k8s.io/v1",
        "kind": "AdmissionReview",
        "request": {
            "uid": uid,
            "kind": {"group": "apps", "version": "v1", "kind": "Deployment"},
            "resource": {"group": "apps", "version": "v1", "resource": "deployments"},
            "operation": "CREATE",
            "userInfo": {"username": "system:admin"},
            "object": {
                "apiVersion": "apps/v1",
                "kind": "Deployment",
                "metadata": {"name": "api", "namespace": "prod", "annotations": annotations}
            }
        }
    })
    .to_string()
}

#[tokio::test]
async fn test_response_parses_as_kube_admission_review() {
    let router = webhook_router(Arc::new(HealthState::new()));
    let (status, body) = post(
        router,
        "/validate",
        deployment_review("abc-123", serde_json::json!({"cve.detected": "CVE-2021-44228"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let review: AdmissionReview<DynamicObject> = serde_json::from_slice(&body).unwrap();
    let response = review.response.expect("response present");
    assert_eq!(response.uid, "abc-123");
    assert!(!response.allowed);
}

#[tokio::test]
async fn test_metrics_reflect_decisions() {
    let health = Arc::new(HealthState::new());

    let (status, _) = post(
        webhook_router(health.clone()),
        "/validate",
        deployment_review("a", serde_json::json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = post(
        webhook_router(health.clone()),
        "/validate",
        deployment_review("b", serde_json::json!({"signature.verified": "false"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = post(webhook_router(health.clone()), "/validate", "[".to_string()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let request = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
    let response = health::create_router(health).oneshot(request).await.unwrap();
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();

    assert!(text.contains("admission_requests_total{outcome=\"allowed\"} 1"));
    assert!(text.contains("admission_requests_total{outcome=\"denied\"} 1"));
    assert!(text.contains("admission_denials_total{rule=\"UnverifiedSignature\"} 1"));
    assert!(text.contains("admission_decode_errors_total 1"));
}
