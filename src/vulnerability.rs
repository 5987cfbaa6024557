//! Read-only vulnerability reference table.
//!
//! The table is loaded once before the listener starts and shared through an
//! `Arc`. Admission policies do not consult it yet; only its size is reported.

use std::collections::HashMap;
use std::path::Path;

use serde_json::Value;
use tracing::warn;

/// Snapshot of known vulnerabilities keyed by identifier
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VulnerabilityTable {
    entries: HashMap<String, Value>,
}

/// Where the snapshot comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotSource {
    /// JSON document passed inline (e.g. through an environment variable)
    Inline(String),
    /// JSON document on disk
    File(std::path::PathBuf),
}

impl VulnerabilityTable {
    /// An empty table
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load the table from its configured source.
    ///
    /// Never fails: unreadable or malformed snapshots produce an empty table
    /// and a warning.
    pub fn load(source: &SnapshotSource) -> Self {
        match source {
            SnapshotSource::Inline(raw) => Self::from_json(raw),
            SnapshotSource::File(path) => Self::from_file(path),
        }
    }

    fn from_file(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(raw) => Self::from_json(&raw),
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to read vulnerability snapshot, using empty table"
                );
                Self::empty()
            }
        }
    }

    /// Parse a JSON object of identifier -> entry
    pub fn from_json(raw: &str) -> Self {
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => Self {
                entries: map.into_iter().collect(),
            },
            Ok(other) => {
                warn!(
                    found = json_type(&other),
                    "Vulnerability snapshot is not a JSON object, using empty table"
                );
                Self::empty()
            }
            Err(e) => {
                warn!(error = %e, "Malformed vulnerability snapshot, using empty table");
                Self::empty()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
