//! Flattening processor

use super::RecordPostProcessor;
use crate::error::{Error, Result};
use crate::stream::{FlattenRule, StreamDefinition};
use crate::types::JsonObject;
use serde_json::Value;

/// Applies a stream's flatten rules and enforces its key and schema invariants
#[derive(Debug, Clone, Copy, Default)]
pub struct FlattenProcessor;

impl FlattenProcessor {
    /// Create a processor
    pub fn new() -> Self {
        Self
    }

    fn apply(rule: &FlattenRule, record: &mut JsonObject) {
        let Some((head, rest)) = rule.source().split_first() else {
            return;
        };
        let mut current = record.get(head.as_str());
        for segment in rest {
            current = current.and_then(|v| v.get(segment.as_str()));
        }
        if let Some(value) = current.cloned() {
            record.insert(rule.target().to_string(), value);
        }
    }
}

impl RecordPostProcessor for FlattenProcessor {
    fn process(&self, record: Value, stream: &StreamDefinition) -> Result<Option<Value>> {
        let Value::Object(mut object) = record else {
            return Err(Error::schema_violation(
                stream.name(),
                "record is not a JSON object",
            ));
        };

        for rule in stream.flatten_rules() {
            Self::apply(rule, &mut object);
        }

        for key in stream.primary_keys() {
            match object.get(key) {
                None | Some(Value::Null) => {
                    return Err(Error::schema_violation(
                        stream.name(),
                        format!("primary key '{key}' is missing"),
                    ));
                }
                Some(Value::Object(_) | Value::Array(_)) => {
                    return Err(Error::schema_violation(
                        stream.name(),
                        format!("primary key '{key}' is not a scalar value"),
                    ));
                }
                Some(_) => {}
            }
        }

        stream
            .schema()
            .check_record(&object)
            .map_err(|message| Error::schema_violation(stream.name(), message))?;

        Ok(Some(Value::Object(object)))
    }
}
