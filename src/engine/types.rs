//! Engine types
//!
//! Configuration and per-stream reports for the replication engine.

use crate::error::{Error, ErrorClass};
use std::fmt;

/// Configuration for sync operation
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Whether to checkpoint and emit state after each page
    pub state_per_page: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            state_per_page: true,
        }
    }
}

impl SyncConfig {
    /// Create a new sync config
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Checkpoint after each page
    #[must_use]
    pub fn with_state_per_page(mut self, enabled: bool) -> Self {
        self.state_per_page = enabled;
        self
    }
}

/// Outcome of one stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStatus {
    /// Every partition drained, no record skipped
    Success,
    /// Some partitions failed or some records were skipped
    PartialFailure,
    /// Every attempted partition failed
    Failure,
    /// Stopped by shutdown before all partitions ran
    Cancelled,
}

impl fmt::Display for StreamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Success => "success",
            Self::PartialFailure => "partial_failure",
            Self::Failure => "failure",
            Self::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

/// A partition that could not be drained
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionFailure {
    /// Partition id
    pub partition: String,
    /// Failure class
    pub class: ErrorClass,
    /// Error message
    pub message: String,
}

/// Partition id recorded when a whole stream stopped on a run-level error
pub const ALL_PARTITIONS: &str = "*";

/// Statistics and outcome of one stream
#[derive(Debug, Clone)]
pub struct StreamReport {
    /// Stream name
    pub stream: String,
    /// Records written to the sink
    pub records_emitted: u64,
    /// Records skipped because they violated the stream schema
    pub records_skipped: u64,
    /// Records the post-processor filtered out
    pub records_dropped: u64,
    /// Pages fetched across all partitions
    pub pages_fetched: u64,
    /// Partitions drained to the last page
    pub partitions_completed: usize,
    /// Partitions that failed
    pub partitions_failed: Vec<PartitionFailure>,
    /// Whether shutdown stopped the stream
    pub cancelled: bool,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl StreamReport {
    /// Create an empty report
    pub fn new(stream: impl Into<String>) -> Self {
        Self {
            stream: stream.into(),
            records_emitted: 0,
            records_skipped: 0,
            records_dropped: 0,
            pages_fetched: 0,
            partitions_completed: 0,
            partitions_failed: Vec::new(),
            cancelled: false,
            duration_ms: 0,
        }
    }

    /// Report for a stream that stopped on a run-level error
    pub fn aborted(stream: impl Into<String>, error: &Error) -> Self {
        let mut report = Self::new(stream);
        report.add_failure(ALL_PARTITIONS, error);
        report
    }

    /// Record a failed partition
    pub fn add_failure(&mut self, partition: impl Into<String>, error: &Error) {
        self.partitions_failed.push(PartitionFailure {
            partition: partition.into(),
            class: error.class(),
            message: error.to_string(),
        });
    }

    /// Whether any partition failed
    pub fn has_failures(&self) -> bool {
        !self.partitions_failed.is_empty()
    }

    /// Overall status
    pub fn status(&self) -> StreamStatus {
        if self.has_failures() && self.partitions_completed == 0 {
            StreamStatus::Failure
        } else if self.has_failures() || self.records_skipped > 0 {
            StreamStatus::PartialFailure
        } else if self.cancelled {
            StreamStatus::Cancelled
        } else {
            StreamStatus::Success
        }
    }
}
