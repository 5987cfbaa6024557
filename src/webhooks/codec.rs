//! AdmissionReview v1 codec.
//!
//! Decoding only reads `request.uid` and `request.object.metadata.{name,
//! annotations, labels}`. Every other field is ignored whatever its type, and
//! a missing or mistyped `request`, `object`, `metadata`, `annotations` or
//! `labels` reads as empty. Only bytes that are not JSON are rejected.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::webhooks::policies::{AdmissionRequestView, Verdict};

/// API version of the admission envelope
pub const API_VERSION: &str = "admission.k8s.io/v1";
/// Kind of the admission envelope
pub const KIND: &str = "AdmissionReview";

/// Failure to decode a request body
#[derive(Error, Debug)]
pub enum DecodeError {
    /// Body is not valid UTF-8 JSON
    #[error("malformed AdmissionReview: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Decode a request body into the view the policies evaluate
pub fn decode(body: &[u8]) -> Result<AdmissionRequestView, DecodeError> {
    let review: Value = serde_json::from_slice(body)?;

    let request = review.get("request");
    let metadata = request
        .and_then(|request| request.get("object"))
        .and_then(|object| object.get("metadata"));
    let field = |key: &str| metadata.and_then(|metadata| metadata.get(key));

    Ok(AdmissionRequestView::new(
        request
            .and_then(|request| request.get("uid"))
            .and_then(text)
            .unwrap_or_default(),
        field("name").and_then(text),
        text_map(field("annotations")),
        text_map(field("labels")),
    ))
}

/// Text form of a metadata value.
///
/// `null` reads as absent. Strings are taken as-is; numbers, booleans and
/// nested values use their compact JSON form, so `7` becomes `"7"`.
fn text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Annotations or labels as a string map; anything but an object is empty
fn text_map(value: Option<&Value>) -> BTreeMap<String, String> {
    value
        .and_then(Value::as_object)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|(key, value)| text(value).map(|value| (key.clone(), value)))
                .collect()
        })
        .unwrap_or_default()
}

/// AdmissionReview response envelope
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    pub api_version: &'static str,
    pub kind: &'static str,
    pub response: ReviewResponse,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ReviewResponse {
    pub uid: String,
    pub allowed: bool,
    pub status: ReviewStatus,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ReviewStatus {
    pub code: u16,
    pub message: String,
}

/// Wrap a verdict in the response envelope, echoing `uid` verbatim
pub fn encode(uid: &str, verdict: &Verdict) -> ResponseEnvelope {
    ResponseEnvelope {
        api_version: API_VERSION,
        kind: KIND,
        response: ReviewResponse {
            uid: uid.to_string(),
            allowed: verdict.allowed(),
            status: ReviewStatus {
                code: verdict.status_code(),
                message: verdict.message().to_string(),
            },
        },
    }
}
