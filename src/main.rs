//! vuln-admission-webhook - validating admission webhook for workload objects.
//!
//! This is the main entry point that:
//! - Initializes structured logging (audit trail on stdout, everything else on stderr)
//! - Loads configuration and the vulnerability snapshot
//! - Starts the health/metrics server and the webhook server
//! - Drains in-flight requests on SIGTERM or SIGINT

use std::sync::Arc;

use axum_server::Handle;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};

use vuln_admission_webhook::health::run_health_server;
use vuln_admission_webhook::telemetry;
use vuln_admission_webhook::{
    Config, HealthState, VulnerabilityTable, WebhookState, run_webhook_server,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    telemetry::init()?;

    if rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .is_err()
    {
        warn!("A rustls crypto provider was already installed");
    }

    info!("Starting vuln-admission-webhook");

    let config = Config::from_env()?;

    let vulnerabilities = Arc::new(VulnerabilityTable::load(&config.vulnerability_source));
    info!(
        entries = vulnerabilities.len(),
        "Vulnerability database loaded"
    );

    let health_state = Arc::new(HealthState::new());
    health_state
        .metrics
        .set_vulnerability_entries(vulnerabilities.len());

    // Health server outlives the webhook listener so readiness can report the drain
    let (health_stop_tx, mut health_stop_rx) = watch::channel(false);
    let health_handle = {
        let health_state = health_state.clone();
        let port = config.metrics_port;
        tokio::spawn(async move {
            let shutdown = async move {
                let _ = health_stop_rx.changed().await;
            };
            if let Err(e) = run_health_server(health_state, port, shutdown).await {
                error!("Health server error: {}", e);
            }
        })
    };

    let server_handle = Handle::new();
    let mut webhook_handle = {
        let state = Arc::new(WebhookState::new(vulnerabilities, health_state.clone()));
        let handle = server_handle.clone();
        let config = config.clone();
        tokio::spawn(async move { run_webhook_server(&config, state, handle).await })
    };

    let mut failure = None;
    tokio::select! {
        result = &mut webhook_handle => {
            match result {
                Ok(Ok(())) => info!("Webhook server exited"),
                Ok(Err(e)) => {
                    error!("Webhook server error: {}", e);
                    failure = Some(e);
                }
                Err(e) => error!("Webhook server task panicked: {}", e),
            }
        }
        _ = shutdown_signal() => {
            info!("Received shutdown signal, initiating graceful shutdown...");

            health_state.set_ready(false).await;
            info!("Marked webhook as not ready");

            info!(
                grace_period_secs = config.shutdown_grace_period.as_secs(),
                "Waiting for in-flight requests to complete..."
            );
            server_handle.graceful_shutdown(Some(config.shutdown_grace_period));

            match webhook_handle.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("Webhook server error during shutdown: {}", e),
                Err(e) => error!("Webhook server task panicked: {}", e),
            }
        }
    }

    let _ = health_stop_tx.send(true);
    if let Err(e) = health_handle.await {
        error!("Health server task panicked: {}", e);
    }

    if let Some(e) = failure {
        return Err(e.into());
    }

    info!("Webhook stopped");
    Ok(())
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
///
/// Note: Signal handler setup failures are fatal - the webhook cannot shut down
/// gracefully without them. Using expect() here is intentional.
#[allow(clippy::expect_used)]
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
