//! State types for tracking sync progress
//!
//! These types are serialized to JSON and persisted between runs, in the
//! layout Singer targets echo back:
//!
//! ```json
//! {"bookmarks": {"budget": {"partitions": {"financialYear=2023": {
//!     "context": {"financialYear": 2023},
//!     "replication_key": "lastModifiedDateTime",
//!     "replication_key_value": "2023-06-01T10:00:00Z"}}}}}
//! ```

use crate::stream::Partition;
use crate::types::{parse_timestamp, JsonObject};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Complete tap state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct State {
    /// Per-stream bookmarks
    #[serde(default)]
    pub bookmarks: BTreeMap<String, StreamState>,
}

impl State {
    /// Create a new empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Get state for a stream
    pub fn get_stream(&self, stream: &str) -> Option<&StreamState> {
        self.bookmarks.get(stream)
    }

    /// Get mutable state for a stream, creating if needed
    pub fn get_stream_mut(&mut self, stream: &str) -> &mut StreamState {
        self.bookmarks.entry(stream.to_string()).or_default()
    }

    /// Bookmark of one stream partition
    pub fn bookmark(&self, stream: &str, partition: &Partition) -> Option<DateTime<Utc>> {
        self.get_stream(stream)?
            .get_partition(&partition.id())?
            .bookmark()
    }

    /// Move a bookmark forward.
    ///
    /// Returns `false` and leaves the state untouched when `value` is not
    /// newer than the stored bookmark.
    pub fn advance_bookmark(
        &mut self,
        stream: &str,
        replication_key: &str,
        partition: &Partition,
        value: DateTime<Utc>,
    ) -> bool {
        let entry = self
            .get_stream_mut(stream)
            .partitions
            .entry(partition.id())
            .or_insert_with(|| PartitionState::for_partition(partition));

        if entry.bookmark().is_some_and(|current| current >= value) {
            return false;
        }
        entry.context = partition.context();
        entry.replication_key = Some(replication_key.to_string());
        entry.replication_key_value = Some(value.to_rfc3339_opts(SecondsFormat::AutoSi, true));
        true
    }
}

/// State for a single stream
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamState {
    /// Per-partition bookmarks, keyed by partition id
    #[serde(default)]
    pub partitions: BTreeMap<String, PartitionState>,
}

impl StreamState {
    /// Get partition state
    pub fn get_partition(&self, partition_id: &str) -> Option<&PartitionState> {
        self.partitions.get(partition_id)
    }
}

/// State for a single partition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartitionState {
    /// Partition values the bookmark belongs to
    #[serde(default)]
    pub context: JsonObject,

    /// Field the bookmark was taken from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replication_key: Option<String>,

    /// Highest replication value committed so far
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replication_key_value: Option<String>,
}

impl PartitionState {
    fn for_partition(partition: &Partition) -> Self {
        Self {
            context: partition.context(),
            ..Self::default()
        }
    }

    /// Parsed bookmark, if present and readable
    pub fn bookmark(&self) -> Option<DateTime<Utc>> {
        self.replication_key_value
            .as_deref()
            .and_then(parse_timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_state_default() {
        let state = State::new();
        assert!(state.bookmarks.is_empty());
        assert_eq!(serde_json::to_value(&state).unwrap(), json!({"bookmarks": {}}));
    }

    #[test]
    fn test_advance_bookmark_layout() {
        let mut state = State::new();
        let partition = Partition::new().with_value("financialYear", 2023);
        let ts = Utc.with_ymd_and_hms(2023, 6, 1, 10, 0, 0).unwrap();

        assert!(state.advance_bookmark("budget", "lastModifiedDateTime", &partition, ts));

        assert_eq!(
            serde_json::to_value(&state).unwrap(),
            json!({"bookmarks": {"budget": {"partitions": {"financialYear=2023": {
                "context": {"financialYear": 2023},
                "replication_key": "lastModifiedDateTime",
                "replication_key_value": "2023-06-01T10:00:00Z"
            }}}}})
        );
        assert_eq!(state.bookmark("budget", &partition), Some(ts));
    }

    #[test]
    fn test_bookmark_never_moves_backward() {
        let mut state = State::new();
        let partition = Partition::new();
        let newer = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let older = Utc.with_ymd_and_hms(2023, 1, 2, 0, 0, 0).unwrap();

        assert!(state.advance_bookmark("account", "lastModifiedDateTime", &partition, newer));
        assert!(!state.advance_bookmark("account", "lastModifiedDateTime", &partition, older));
        assert!(!state.advance_bookmark("account", "lastModifiedDateTime", &partition, newer));
        assert_eq!(state.bookmark("account", &partition), Some(newer));
    }

    #[test]
    fn test_unreadable_bookmark_is_replaced() {
        let mut state: State = serde_json::from_value(json!({
            "bookmarks": {"account": {"partitions": {"default": {
                "replication_key_value": "garbage"
            }}}}
        }))
        .unwrap();
        let partition = Partition::new();
        assert_eq!(state.bookmark("account", &partition), None);

        let ts = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        assert!(state.advance_bookmark("account", "lastModifiedDateTime", &partition, ts));
        assert_eq!(state.bookmark("account", &partition), Some(ts));
    }
}
