//! CVE annotation policy.
//!
//! Denies objects whose `cve.detected` annotation names a vulnerability.
//! The literal value `none` means a scan ran and found nothing.

use super::{AdmissionRequestView, Rule};

/// Annotation written by the image scanner
pub const ANNOTATION: &str = "cve.detected";
/// Value meaning "scanned, nothing found"
pub const NO_CVE: &str = "none";

pub const NAME: &str = "CriticalVulnerability";

pub const RULE: Rule = Rule { name: NAME, check };

/// Returns the CVE identifier when the annotation reports one
pub fn detected_cve(view: &AdmissionRequestView) -> Option<&str> {
    let value = view.annotation(ANNOTATION);
    if value.is_empty() || value == NO_CVE {
        None
    } else {
        Some(value)
    }
}

pub fn check(view: &AdmissionRequestView) -> Option<String> {
    detected_cve(view).map(|cve| {
        format!(
            "Deployment blocked: Critical vulnerability detected ({})",
            cve
        )
    })
}
