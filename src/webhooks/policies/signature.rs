//! Image signature verification policy.
//!
//! Only an explicit `signature.verified=false` denies. A missing annotation
//! means no verifier ran and is left to other controls.

use super::{AdmissionRequestView, Rule};

pub const ANNOTATION: &str = "signature.verified";

pub const NAME: &str = "UnverifiedSignature";
pub const MESSAGE: &str = "Deployment blocked: Image signature not verified";

pub const RULE: Rule = Rule { name: NAME, check };

pub fn check(view: &AdmissionRequestView) -> Option<String> {
    (view.annotation(ANNOTATION) == "false").then(|| MESSAGE.to_string())
}
