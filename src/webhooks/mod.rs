//! Validating admission webhook.
//!
//! - `codec`: AdmissionReview v1 decoding and encoding
//! - `policies`: the compiled-in rule set and the decision engine
//! - `server`: HTTP(S) listener, routing and audit logging

pub mod codec;
pub mod policies;
mod server;

pub use codec::{DecodeError, ResponseEnvelope, decode, encode};
pub use policies::{AdmissionRequestView, Rule, RuleSet, Verdict, evaluate};
pub use server::{
    AUDIT_TARGET, WebhookError, WebhookState, create_webhook_router, run_webhook_server,
};

// Re-export kube-rs admission types for contract testing
pub use kube::core::admission::{AdmissionResponse, AdmissionReview};
