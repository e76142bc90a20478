//! Partition type

use crate::types::JsonObject;
use serde_json::Value;
use std::collections::BTreeMap;

/// Identifier used for the implicit partition of unpartitioned streams
pub const DEFAULT_PARTITION_ID: &str = "default";

/// Query scope of one extraction pass (e.g. `{financialYear: 2023}`)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Partition {
    values: BTreeMap<String, Value>,
}

impl Partition {
    /// The empty partition
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value
    #[must_use]
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Build from a JSON object (as stored in state contexts)
    pub fn from_context(context: &JsonObject) -> Self {
        Self {
            values: context
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }

    /// Get a value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Whether this is the implicit empty partition
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Stable identifier used as the state key
    pub fn id(&self) -> String {
        if self.values.is_empty() {
            return DEFAULT_PARTITION_ID.to_string();
        }
        self.query_pairs()
            .into_iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Values as query parameters, sorted by key
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.values
            .iter()
            .map(|(k, v)| (k.clone(), query_value(v)))
            .collect()
    }

    /// Values as a JSON object
    pub fn context(&self) -> JsonObject {
        self.values
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl std::fmt::Display for Partition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.id())
    }
}

fn query_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
