//! Admission verdicts and the accumulator that builds them.

/// Message returned when no rule fires
pub const ALLOWED_MESSAGE: &str = "Deployment allowed";
/// Message used when a denying rule supplies none
pub const DENIED_MESSAGE: &str = "Deployment blocked";

/// Final allow/deny decision for one request.
///
/// The HTTP-style status code is derived from `allowed` and cannot be set
/// independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    allowed: bool,
    message: String,
    fired_rules: Vec<&'static str>,
}

impl Verdict {
    /// An allowing verdict with the default message
    pub fn allow() -> Self {
        Self {
            allowed: true,
            message: ALLOWED_MESSAGE.to_string(),
            fired_rules: Vec::new(),
        }
    }

    pub fn allowed(&self) -> bool {
        self.allowed
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// 200 when allowed, 403 when denied
    pub fn status_code(&self) -> u16 {
        if self.allowed { 200 } else { 403 }
    }

    /// Names of every rule that fired, in evaluation order
    pub fn fired_rules(&self) -> &[&'static str] {
        &self.fired_rules
    }

    /// Rule whose message the verdict carries
    pub fn deciding_rule(&self) -> Option<&'static str> {
        self.fired_rules.last().copied()
    }

    /// Log-friendly outcome label
    pub fn outcome(&self) -> &'static str {
        if self.allowed { "ALLOWED" } else { "BLOCKED" }
    }
}

/// Mutable state threaded through the rule sequence
#[derive(Debug)]
pub(super) struct Accumulator {
    verdict: Verdict,
}

impl Accumulator {
    pub(super) fn new() -> Self {
        Self {
            verdict: Verdict::allow(),
        }
    }

    /// Deny and take over the message. An empty message becomes
    /// [`DENIED_MESSAGE`] so a denial never reads as an allow.
    pub(super) fn deny(&mut self, rule: &'static str, message: String) {
        self.verdict.allowed = false;
        self.verdict.message = if message.is_empty() {
            DENIED_MESSAGE.to_string()
        } else {
            message
        };
        self.verdict.fired_rules.push(rule);
    }

    pub(super) fn finish(self) -> Verdict {
        self.verdict
    }
}
