//! Vulnerability scan policy.
//!
//! Fires when a scan was requested and the scanner reported a CVE. Overlaps
//! with the CVE annotation policy; when both fire, this rule runs later and
//! its message is the one returned.

use super::{AdmissionRequestView, Rule, cve};

pub const ANNOTATION: &str = "vulnerability.scan";

pub const NAME: &str = "VulnerabilityScan";
pub const MESSAGE: &str = "Deployment blocked: Vulnerability scan detected issues";

pub const RULE: Rule = Rule { name: NAME, check };

pub fn check(view: &AdmissionRequestView) -> Option<String> {
    let scanned = view.annotation(ANNOTATION) == "true";
    (scanned && cve::detected_cve(view).is_some()).then(|| MESSAGE.to_string())
}
