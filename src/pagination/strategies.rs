//! Pagination strategy implementations

use super::types::Paginator;
use serde_json::Value;

/// Default marker key the API puts on the last record of a full page
pub const DEFAULT_MARKER: &str = "metadata";

/// Page-number pagination driven by a trailing marker.
///
/// More pages exist when the body is a non-empty array whose **last**
/// element is an object carrying the marker key. Anything else (empty
/// array, marker missing, non-array body) ends the partition.
#[derive(Debug, Clone)]
pub struct MetadataMarkerPaginator {
    marker: String,
}

impl MetadataMarkerPaginator {
    /// Paginator looking for the `metadata` marker
    pub fn new() -> Self {
        Self::with_marker(DEFAULT_MARKER)
    }

    /// Paginator looking for a custom marker key
    pub fn with_marker(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }

    /// The marker key
    pub fn marker(&self) -> &str {
        &self.marker
    }
}

impl Default for MetadataMarkerPaginator {
    fn default() -> Self {
        Self::new()
    }
}

impl Paginator for MetadataMarkerPaginator {
    fn has_more(&self, body: &Value) -> bool {
        body.as_array()
            .and_then(|records| records.last())
            .and_then(Value::as_object)
            .is_some_and(|last| last.contains_key(&self.marker))
    }
}
