//! Malicious or vulnerable label policy.

use super::{AdmissionRequestView, Rule};

pub const MALICIOUS_LABEL: &str = "malicious";
pub const VULNERABLE_LABEL: &str = "vulnerable";

pub const NAME: &str = "MaliciousOrVulnerable";
pub const MESSAGE: &str = "Deployment blocked: Malicious or vulnerable deployment detected";

pub const RULE: Rule = Rule { name: NAME, check };

pub fn check(view: &AdmissionRequestView) -> Option<String> {
    let flagged =
        view.label(MALICIOUS_LABEL) == "true" || view.label(VULNERABLE_LABEL) == "true";
    flagged.then(|| MESSAGE.to_string())
}
