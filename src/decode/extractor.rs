//! Record extraction from response bodies

use crate::error::{Error, Result};
use serde_json::Value;

/// Selects every element of the top-level array
pub const DEFAULT_RECORDS_PATH: &str = "$[*]";

/// Parses a response body into records
#[derive(Debug, Clone)]
pub struct ResponseExtractor {
    records_path: String,
}

impl Default for ResponseExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseExtractor {
    /// Extractor for top-level arrays
    pub fn new() -> Self {
        Self {
            records_path: DEFAULT_RECORDS_PATH.to_string(),
        }
    }

    /// Extractor with a custom records path
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            records_path: path.into(),
        }
    }

    /// The JSONPath used to select records
    pub fn records_path(&self) -> &str {
        &self.records_path
    }

    /// Parse a body and return its records in response order
    pub fn extract(&self, body: &str) -> Result<std::vec::IntoIter<Value>> {
        let value: Value = serde_json::from_str(body)
            .map_err(|e| Error::parse(format!("Failed to parse response JSON: {e}")))?;
        self.extract_value(value)
    }

    /// Select records from an already parsed body.
    ///
    /// With the default path the body must be a JSON array; an empty array
    /// yields no records. A custom path may start at any JSON value.
    pub fn extract_value(&self, value: Value) -> Result<std::vec::IntoIter<Value>> {
        if self.records_path != DEFAULT_RECORDS_PATH {
            return select(&value, &self.records_path).map(Vec::into_iter);
        }
        match value {
            Value::Array(items) => Ok(items.into_iter()),
            other => Err(Error::parse(format!(
                "Expected a JSON array response, got {}",
                kind(&other)
            ))),
        }
    }
}

fn select(value: &Value, path: &str) -> Result<Vec<Value>> {
    use jsonpath_rust::JsonPath;

    let jp = JsonPath::try_from(path)
        .map_err(|e| Error::json_path(format!("Invalid JSONPath '{path}': {e}")))?;

    match jp.find(value) {
        Value::Array(items) => Ok(items),
        Value::Null => Ok(Vec::new()),
        other => Ok(vec![other]),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
