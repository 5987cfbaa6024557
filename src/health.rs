//! Health server and Prometheus metrics.
//!
//! Provides:
//! - `/healthz` - Liveness check (always returns 200 if server is running)
//! - `/readyz` - Readiness check (returns 200 while the webhook listener is serving)
//! - `/metrics` - Prometheus metrics endpoint

use std::future::Future;
use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::{EncodeLabel, EncodeLabelSet, LabelSetEncoder};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::histogram::{Histogram, exponential_buckets};
use prometheus_client::registry::Registry;
use tokio::sync::RwLock;
use tracing::info;

use crate::webhooks::Verdict;

/// Labels for admission outcomes
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct OutcomeLabels {
    pub outcome: &'static str,
}

impl EncodeLabelSet for OutcomeLabels {
    fn encode(&self, encoder: &mut LabelSetEncoder<'_>) -> Result<(), std::fmt::Error> {
        ("outcome", self.outcome).encode(encoder.encode_label())?;
        Ok(())
    }
}

/// Labels for per-rule denial counts
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct RuleLabels {
    pub rule: &'static str,
}

impl EncodeLabelSet for RuleLabels {
    fn encode(&self, encoder: &mut LabelSetEncoder<'_>) -> Result<(), std::fmt::Error> {
        ("rule", self.rule).encode(encoder.encode_label())?;
        Ok(())
    }
}

/// Shared metrics for the webhook
pub struct Metrics {
    /// Admission decisions by outcome
    pub admission_requests_total: Family<OutcomeLabels, Counter>,
    /// Rule firings; one request can fire several rules
    pub admission_denials_total: Family<RuleLabels, Counter>,
    /// Request bodies that failed to decode
    pub admission_decode_errors_total: Counter,
    /// Time spent decoding and evaluating a request
    pub admission_evaluation_duration_seconds: Histogram,
    /// Entries in the vulnerability reference table
    pub vulnerability_db_entries: Gauge,
    registry: Registry,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    /// Create a new metrics instance with registered metrics
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let admission_requests_total = Family::<OutcomeLabels, Counter>::default();
        registry.register(
            "admission_requests",
            "Total number of admission decisions by outcome",
            admission_requests_total.clone(),
        );

        let admission_denials_total = Family::<RuleLabels, Counter>::default();
        registry.register(
            "admission_denials",
            "Total number of times each policy rule fired",
            admission_denials_total.clone(),
        );

        let admission_decode_errors_total = Counter::default();
        registry.register(
            "admission_decode_errors",
            "Total number of AdmissionReview bodies that failed to decode",
            admission_decode_errors_total.clone(),
        );

        let admission_evaluation_duration_seconds =
            Histogram::new(exponential_buckets(0.00001, 2.0, 15));
        registry.register(
            "admission_evaluation_duration_seconds",
            "Duration of decode and policy evaluation in seconds",
            admission_evaluation_duration_seconds.clone(),
        );

        let vulnerability_db_entries = Gauge::default();
        registry.register(
            "vulnerability_db_entries",
            "Number of entries in the vulnerability reference table",
            vulnerability_db_entries.clone(),
        );

        Self {
            admission_requests_total,
            admission_denials_total,
            admission_decode_errors_total,
            admission_evaluation_duration_seconds,
            vulnerability_db_entries,
            registry,
        }
    }

    /// Record a completed admission decision
    pub fn record_verdict(&self, verdict: &Verdict, duration_secs: f64) {
        let outcome = if verdict.allowed() { "allowed" } else { "denied" };
        self.admission_requests_total
            .get_or_create(&OutcomeLabels { outcome })
            .inc();
        for rule in verdict.fired_rules() {
            self.admission_denials_total
                .get_or_create(&RuleLabels { rule: *rule })
                .inc();
        }
        self.admission_evaluation_duration_seconds
            .observe(duration_secs);
    }

    /// Record a request body that could not be decoded
    pub fn record_decode_error(&self) {
        self.admission_decode_errors_total.inc();
    }

    /// Report the size of the vulnerability table
    pub fn set_vulnerability_entries(&self, count: usize) {
        self.vulnerability_db_entries
            .set(i64::try_from(count).unwrap_or(i64::MAX));
    }

    /// Encode metrics to Prometheus text format
    pub fn encode(&self) -> String {
        let mut buffer = String::new();
        if encode(&mut buffer, &self.registry).is_err() {
            tracing::error!("Failed to encode metrics");
            return "# Error encoding metrics".to_string();
        }
        buffer
    }
}

/// Shared state for the health server
pub struct HealthState {
    /// Whether the webhook listener is accepting requests
    ready: RwLock<bool>,
    /// Metrics registry
    pub metrics: Metrics,
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthState {
    /// Create a new health state (starts as not ready)
    pub fn new() -> Self {
        Self {
            ready: RwLock::new(false),
            metrics: Metrics::new(),
        }
    }

    /// Mark the webhook as ready or not ready
    pub async fn set_ready(&self, ready: bool) {
        *self.ready.write().await = ready;
    }

    /// Check if the webhook is ready
    pub async fn is_ready(&self) -> bool {
        *self.ready.read().await
    }
}

/// Liveness check handler
async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// Readiness check handler
///
/// Returns 503 Service Unavailable until the webhook listener is up, and
/// again once shutdown has started.
async fn readyz(State(state): State<Arc<HealthState>>) -> Response {
    if state.is_ready().await {
        (StatusCode::OK, "ready").into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not ready").into_response()
    }
}

/// Metrics handler
async fn metrics_handler(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    let body = state.metrics.encode();
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}

/// Create the health server router
pub fn create_router(state: Arc<HealthState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Run the health server until `shutdown` resolves
pub async fn run_health_server<F>(
    state: Arc<HealthState>,
    port: u16,
    shutdown: F,
) -> Result<(), std::io::Error>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_router(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    info!(port, "Starting health server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
