//! Execution engine module
//!
//! Drives one stream through its partitions and pages.
//!
//! # Overview
//!
//! The engine module provides:
//! - `ReplicationEngine` - Partition loop, page loop, record processing and bookmarks
//! - `SyncConfig` - Configuration for sync operations
//! - `StreamReport` - Per-stream counts and outcome
//! - `ShutdownSignal` - Cooperative cancellation
//!
//! For every partition the engine loads the bookmark, then fetches pages
//! starting at page 1 until the paginator reports no more. Records of a
//! page are emitted in response order; the bookmark advances only after
//! the whole page reached the sink. A failing partition is recorded and
//! the next one starts, unless the API refused the request outright (4xx);
//! authentication and output failures end the stream.

mod shutdown;
mod types;

pub use shutdown::{ShutdownSignal, ShutdownTrigger};
pub use types::{PartitionFailure, StreamReport, StreamStatus, SyncConfig, ALL_PARTITIONS};

use crate::decode::ResponseExtractor;
use crate::error::{Error, Result};
use crate::http::HttpClient;
use crate::output::{Message, RecordSink};
use crate::pagination::{MetadataMarkerPaginator, PageCursor, Paginator};
use crate::process::{FlattenProcessor, RecordPostProcessor};
use crate::request::RequestBuilder;
use crate::state::StateManager;
use crate::stream::{Partition, StreamDefinition};
use crate::types::parse_timestamp;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// How a partition ended without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PartitionOutcome {
    Completed,
    Cancelled,
}

/// Replication engine for extracting streams
pub struct ReplicationEngine {
    /// HTTP transport
    client: Arc<HttpClient>,
    /// Request builder (owns the authenticator)
    requests: RequestBuilder,
    /// Record extraction
    extractor: ResponseExtractor,
    /// Continuation rule
    paginator: Arc<dyn Paginator>,
    /// Per-record transformation
    processor: Arc<dyn RecordPostProcessor>,
    /// Shared bookmarks
    state: StateManager,
    /// Sync configuration
    config: SyncConfig,
}

impl ReplicationEngine {
    /// Create a new engine with the stock paginator and post-processor
    pub fn new(client: Arc<HttpClient>, requests: RequestBuilder, state: StateManager) -> Self {
        Self {
            client,
            requests,
            extractor: ResponseExtractor::new(),
            paginator: Arc::new(MetadataMarkerPaginator::new()),
            processor: Arc::new(FlattenProcessor::new()),
            state,
            config: SyncConfig::default(),
        }
    }

    /// Set sync configuration
    #[must_use]
    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the paginator
    #[must_use]
    pub fn with_paginator(mut self, paginator: Arc<dyn Paginator>) -> Self {
        self.paginator = paginator;
        self
    }

    /// Replace the record post-processor
    #[must_use]
    pub fn with_processor(mut self, processor: Arc<dyn RecordPostProcessor>) -> Self {
        self.processor = processor;
        self
    }

    /// Replace the response extractor
    #[must_use]
    pub fn with_extractor(mut self, extractor: ResponseExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    /// Get the state manager
    pub fn state(&self) -> &StateManager {
        &self.state
    }

    /// Extract one stream.
    ///
    /// Partition failures are reported in the returned `StreamReport`.
    /// `Err` means the run cannot continue: the token could not be obtained
    /// or the sink rejected output. State is flushed in every case.
    pub async fn sync_stream(
        &self,
        stream: &StreamDefinition,
        sink: &dyn RecordSink,
        shutdown: &ShutdownSignal,
    ) -> Result<StreamReport> {
        let start = Instant::now();
        let mut report = StreamReport::new(stream.name());

        info!(stream = stream.name(), "Starting stream");

        let outcome = self
            .sync_partitions(stream, sink, shutdown, &mut report)
            .await;
        let flushed = self.flush_state(sink).await;

        report.duration_ms = start.elapsed().as_millis() as u64;
        outcome?;
        flushed?;

        info!(
            stream = stream.name(),
            status = %report.status(),
            records = report.records_emitted,
            skipped = report.records_skipped,
            pages = report.pages_fetched,
            duration_ms = report.duration_ms,
            "Stream finished"
        );
        Ok(report)
    }

    async fn sync_partitions(
        &self,
        stream: &StreamDefinition,
        sink: &dyn RecordSink,
        shutdown: &ShutdownSignal,
        report: &mut StreamReport,
    ) -> Result<()> {
        for partition in stream.effective_partitions() {
            if shutdown.is_cancelled() {
                report.cancelled = true;
                break;
            }

            match self
                .sync_partition(stream, &partition, sink, shutdown, report)
                .await
            {
                Ok(PartitionOutcome::Completed) => report.partitions_completed += 1,
                Ok(PartitionOutcome::Cancelled) => {
                    info!(stream = stream.name(), partition = %partition, "Shutdown requested, stopping stream");
                    report.cancelled = true;
                    break;
                }
                Err(e) if e.aborts_run() || matches!(e, Error::Sink { .. }) => return Err(e),
                Err(e) => {
                    error!(
                        stream = stream.name(),
                        partition = %partition,
                        error = %e,
                        "Partition failed"
                    );
                    report.add_failure(partition.id(), &e);
                    if e.fails_stream() {
                        warn!(stream = stream.name(), "Request refused, skipping remaining partitions");
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    async fn sync_partition(
        &self,
        stream: &StreamDefinition,
        partition: &Partition,
        sink: &dyn RecordSink,
        shutdown: &ShutdownSignal,
        report: &mut StreamReport,
    ) -> Result<PartitionOutcome> {
        let bookmark = self.state.bookmark(stream.name(), partition).await;
        let mut cursor = PageCursor::first();

        debug!(
            stream = stream.name(),
            partition = %partition,
            bookmark = ?bookmark,
            "Starting partition"
        );

        loop {
            if shutdown.is_cancelled() {
                return Ok(PartitionOutcome::Cancelled);
            }

            let body = self
                .fetch_page(stream, partition, cursor, bookmark.as_ref())
                .await?;
            report.pages_fetched += 1;

            let value: Value = serde_json::from_str(&body).map_err(|e| {
                Error::parse(format!("Page {cursor} is not valid JSON: {e}"))
            })?;
            let has_more = self.paginator.has_more(&value);
            let records = self.extractor.extract_value(value)?;

            let page_max = self.emit_page(stream, records, sink, report).await?;

            if let (Some(key), Some(max)) = (stream.replication_key(), page_max) {
                self.state
                    .advance_bookmark(stream.name(), key, partition, max)
                    .await;
            }
            if self.config.state_per_page {
                self.flush_state(sink).await?;
            }

            debug!(
                stream = stream.name(),
                partition = %partition,
                page = cursor.page(),
                has_more,
                "Page done"
            );

            if !has_more {
                return Ok(PartitionOutcome::Completed);
            }
            cursor = self.paginator.next_cursor(cursor);
        }
    }

    /// Fetch one page, refreshing the token once if the API rejects it
    async fn fetch_page(
        &self,
        stream: &StreamDefinition,
        partition: &Partition,
        cursor: PageCursor,
        bookmark: Option<&DateTime<Utc>>,
    ) -> Result<String> {
        let request = self
            .requests
            .build(stream, partition, cursor, bookmark)
            .await?;

        match self.client.fetch_text(&request).await {
            Err(e) if e.is_unauthorized() => {
                warn!(
                    stream = stream.name(),
                    partition = %partition,
                    page = cursor.page(),
                    "API rejected the bearer token, refreshing once"
                );
                let rejected = request.bearer_token.as_deref().unwrap_or_default();
                let token = self
                    .requests
                    .authenticator()
                    .refresh_rejected(rejected)
                    .await?;
                let retry = crate::http::HttpRequest {
                    bearer_token: Some(token),
                    ..request
                };
                self.client.fetch_text(&retry).await
            }
            other => other,
        }
    }

    /// Process and emit one page; returns the page's highest replication value
    async fn emit_page(
        &self,
        stream: &StreamDefinition,
        records: impl Iterator<Item = Value>,
        sink: &dyn RecordSink,
        report: &mut StreamReport,
    ) -> Result<Option<DateTime<Utc>>> {
        let extracted_at = Utc::now();
        let mut page_max: Option<DateTime<Utc>> = None;

        for raw in records {
            let record = match self.processor.process(raw, stream) {
                Ok(Some(record)) => record,
                Ok(None) => {
                    report.records_dropped += 1;
                    continue;
                }
                Err(e) => {
                    warn!(stream = stream.name(), error = %e, "Skipping record");
                    report.records_skipped += 1;
                    continue;
                }
            };

            if let Some(key) = stream.replication_key() {
                match record.get(key) {
                    Some(Value::String(raw)) => match parse_timestamp(raw) {
                        Some(ts) => page_max = page_max.max(Some(ts)),
                        None => warn!(
                            stream = stream.name(),
                            value = %raw,
                            "Unreadable replication value, bookmark not advanced by this record"
                        ),
                    },
                    Some(Value::Null) | None => {}
                    Some(other) => warn!(
                        stream = stream.name(),
                        value = %other,
                        "Replication value is not a string"
                    ),
                }
            }

            sink.write(&Message::record(stream.name(), record, extracted_at))
                .await?;
            report.records_emitted += 1;
        }

        Ok(page_max)
    }

    /// Emit the current state and persist it
    async fn flush_state(&self, sink: &dyn RecordSink) -> Result<()> {
        let value = self.state.to_value().await?;
        sink.write(&Message::state(value)).await?;
        sink.flush().await?;
        self.state.checkpoint().await
    }
}

impl std::fmt::Debug for ReplicationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplicationEngine")
            .field("client", &self.client)
            .field("requests", &self.requests)
            .field("extractor", &self.extractor)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
