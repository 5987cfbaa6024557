//! vuln-admission-webhook library crate
//!
//! A Kubernetes validating admission webhook that blocks workloads flagged
//! as vulnerable, malicious or unsigned through their metadata.

pub mod config;
pub mod health;
pub mod telemetry;
pub mod vulnerability;
pub mod webhooks;

pub use config::{Config, ConfigError};
pub use health::HealthState;
pub use vulnerability::{SnapshotSource, VulnerabilityTable};
pub use webhooks::{
    AUDIT_TARGET, AdmissionRequestView, RuleSet, Verdict, WebhookError, WebhookState,
    create_webhook_router, evaluate, run_webhook_server,
};
