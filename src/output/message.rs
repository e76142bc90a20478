//! Singer message types

use crate::stream::StreamDefinition;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A message on the Singer output stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
    /// Describes a stream before its records
    Schema {
        /// Stream name
        stream: String,
        /// JSON Schema document
        schema: Value,
        /// Primary key fields
        key_properties: Vec<String>,
        /// Replication key fields, empty for full-table streams
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        bookmark_properties: Vec<String>,
    },
    /// One processed record
    Record {
        /// Stream name
        stream: String,
        /// Processed record
        record: Value,
        /// When the page holding the record was fetched
        #[serde(default, skip_serializing_if = "Option::is_none")]
        time_extracted: Option<DateTime<Utc>>,
    },
    /// Full state snapshot
    State {
        /// Bookmarks keyed by stream name
        value: Value,
    },
}

impl Message {
    /// SCHEMA message for a stream definition
    pub fn schema(stream: &StreamDefinition) -> Self {
        Self::Schema {
            stream: stream.name().to_string(),
            schema: stream.schema().to_json_schema(),
            key_properties: stream.primary_keys().to_vec(),
            bookmark_properties: stream
                .replication_key()
                .map(|key| vec![key.to_string()])
                .unwrap_or_default(),
        }
    }

    /// RECORD message stamped with the extraction time
    pub fn record(stream: impl Into<String>, record: Value, time_extracted: DateTime<Utc>) -> Self {
        Self::Record {
            stream: stream.into(),
            record,
            time_extracted: Some(time_extracted),
        }
    }

    /// STATE message
    pub fn state(value: Value) -> Self {
        Self::State { value }
    }

    /// Stream the message belongs to, if any
    pub fn stream(&self) -> Option<&str> {
        match self {
            Self::Schema { stream, .. } | Self::Record { stream, .. } => Some(stream.as_str()),
            Self::State { .. } => None,
        }
    }
}
