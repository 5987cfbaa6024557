//! Admission webhook server.
//!
//! Serves `POST /validate` for the API server and `/health` for liveness
//! checks. TLS is terminated with rustls when both the certificate and key
//! files exist; otherwise the server falls back to plain HTTP and says so.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{ConnectInfo, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use axum_server::Handle;
use axum_server::tls_rustls::RustlsConfig;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::health::HealthState;
use crate::vulnerability::VulnerabilityTable;
use crate::webhooks::codec;
use crate::webhooks::policies::{RuleSet, evaluate};

/// Tracing target for the per-request audit trail
pub const AUDIT_TARGET: &str = "audit";

/// Shared state for webhook handlers
pub struct WebhookState {
    /// Policies applied to every request
    pub rules: RuleSet,
    /// Reference table loaded at startup; read-only
    pub vulnerabilities: Arc<VulnerabilityTable>,
    /// Readiness state and metrics
    pub health: Arc<HealthState>,
}

impl WebhookState {
    pub fn new(vulnerabilities: Arc<VulnerabilityTable>, health: Arc<HealthState>) -> Self {
        Self {
            rules: RuleSet::standard(),
            vulnerabilities,
            health,
        }
    }
}

/// Create the webhook router
pub fn create_webhook_router(state: Arc<WebhookState>) -> Router {
    Router::new()
        .route("/validate", post(validate).fallback(not_found))
        .route("/health", get(health).post(health).fallback(not_found))
        .fallback(not_found)
        .with_state(state)
}

/// Static liveness reply
async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

/// Validate an AdmissionReview.
///
/// Denials are still HTTP 200; the decision lives in the response body.
async fn validate(
    State(state): State<Arc<WebhookState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    body: Bytes,
) -> Response {
    let started = Instant::now();

    let view = match codec::decode(&body) {
        Ok(view) => view,
        Err(e) => {
            state.health.metrics.record_decode_error();
            error!(client = %peer.ip(), error = %e, "Error processing request");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error processing request: {}", e),
            )
                .into_response();
        }
    };

    debug!(uid = %view.uid(), "Processing admission request");

    let verdict = evaluate(&view, &state.rules);
    state
        .health
        .metrics
        .record_verdict(&verdict, started.elapsed().as_secs_f64());

    let name = view.object_name().unwrap_or("unknown");
    info!(
        target: AUDIT_TARGET,
        client = %peer.ip(),
        uid = %view.uid(),
        name = %name,
        outcome = verdict.outcome(),
        rule = verdict.deciding_rule().unwrap_or(""),
        message = %verdict.message(),
        "[{}] Deployment: {} - {}: {}",
        peer.ip(),
        name,
        verdict.outcome(),
        verdict.message()
    );

    (StatusCode::OK, Json(codec::encode(view.uid(), &verdict))).into_response()
}

/// Errors that can occur when running the webhook server
#[derive(Error, Debug)]
pub enum WebhookError {
    /// TLS configuration error
    #[error("TLS configuration error: {0}")]
    TlsConfig(String),
    /// Server error
    #[error("Webhook server error: {0}")]
    Server(String),
}

/// Run the webhook server until `handle` is told to shut down.
///
/// Binds to `0.0.0.0:<config.port>`. Marks the readiness state ready once the
/// socket is listening. Shutdown through the handle drains in-flight
/// connections before the socket is released.
pub async fn run_webhook_server(
    config: &Config,
    state: Arc<WebhookState>,
    handle: Handle,
) -> Result<(), WebhookError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let health = state.health.clone();
    let app = create_webhook_router(state).into_make_service_with_connect_info::<SocketAddr>();

    if config.tls_available() {
        let tls = RustlsConfig::from_pem_file(&config.cert_path, &config.key_path)
            .await
            .map_err(|e| WebhookError::TlsConfig(e.to_string()))?;

        info!(port = config.port, "Webhook server starting with TLS");
        mark_ready_when_listening(&handle, health);
        axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(app)
            .await
            .map_err(|e| WebhookError::Server(e.to_string()))?;
    } else {
        warn!(
            port = config.port,
            cert_file = %config.cert_path.display(),
            key_file = %config.key_path.display(),
            "Certificates not found, starting without TLS"
        );
        mark_ready_when_listening(&handle, health);
        axum_server::bind(addr)
            .handle(handle)
            .serve(app)
            .await
            .map_err(|e| WebhookError::Server(e.to_string()))?;
    }

    info!("Webhook server stopped accepting connections");
    Ok(())
}

fn mark_ready_when_listening(handle: &Handle, health: Arc<HealthState>) {
    let handle = handle.clone();
    tokio::spawn(async move {
        if let Some(local) = handle.listening().await {
            info!(address = %local, "Vulnerability validator webhook server ready");
            health.set_ready(true).await;
        }
    });
}
