//! Admission policies for workload objects.
//!
//! Every rule is a pure predicate over an object's annotations and labels.
//! Rules run in a fixed order against one accumulator:
//! - A firing rule denies the request and overwrites the message
//! - Later rules still run after a denial, so the last rule to fire owns the message
//! - No rule can grant admission back once it has been denied

pub mod cve;
pub mod labels;
pub mod scan;
pub mod signature;
mod verdict;

use std::collections::BTreeMap;

pub use verdict::{ALLOWED_MESSAGE, DENIED_MESSAGE, Verdict};

use verdict::Accumulator;

/// Canonical view of the parts of an admission request the policies read
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdmissionRequestView {
    uid: String,
    object_name: Option<String>,
    annotations: BTreeMap<String, String>,
    labels: BTreeMap<String, String>,
}

impl AdmissionRequestView {
    /// Create a view from already-extracted request parts
    pub fn new(
        uid: impl Into<String>,
        object_name: Option<String>,
        annotations: BTreeMap<String, String>,
        labels: BTreeMap<String, String>,
    ) -> Self {
        Self {
            uid: uid.into(),
            object_name,
            annotations,
            labels,
        }
    }

    /// Correlation token echoed back in the response
    pub fn uid(&self) -> &str {
        &self.uid
    }

    /// Name of the object under review, if the request carried one
    pub fn object_name(&self) -> Option<&str> {
        self.object_name.as_deref()
    }

    /// Annotation value, or the empty string when absent
    pub fn annotation(&self, key: &str) -> &str {
        self.annotations.get(key).map(String::as_str).unwrap_or("")
    }

    /// Label value, or the empty string when absent
    pub fn label(&self, key: &str) -> &str {
        self.labels.get(key).map(String::as_str).unwrap_or("")
    }

    pub fn annotations(&self) -> &BTreeMap<String, String> {
        &self.annotations
    }

    pub fn labels(&self) -> &BTreeMap<String, String> {
        &self.labels
    }
}

/// A single compiled-in policy rule.
///
/// `check` returns the denial message when the rule fires.
#[derive(Clone, Copy)]
pub struct Rule {
    /// Stable identifier used in logs and metrics
    pub name: &'static str,
    /// Predicate producing a denial message
    pub check: fn(&AdmissionRequestView) -> Option<String>,
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule").field("name", &self.name).finish()
    }
}

/// Ordered set of rules evaluated for every request
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::standard()
    }
}

impl RuleSet {
    /// The fixed production rule order
    pub fn standard() -> Self {
        Self::from_rules(vec![cve::RULE, labels::RULE, signature::RULE, scan::RULE])
    }

    /// Build a rule set with a custom order (used by tests and tooling)
    pub fn from_rules(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Rule names in evaluation order
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.rules.iter().map(|rule| rule.name)
    }
}

/// Evaluate every rule against the view and produce the final verdict
pub fn evaluate(view: &AdmissionRequestView, rules: &RuleSet) -> Verdict {
    let mut acc = Accumulator::new();

    for rule in rules.rules() {
        if let Some(message) = (rule.check)(view) {
            acc.deny(rule.name, message);
        }
    }

    acc.finish()
}
