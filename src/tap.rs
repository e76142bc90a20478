//! Tap orchestration
//!
//! Wires config, catalog, authentication, transport and state together and
//! exposes the three Singer operations: check, discover and read.

use crate::auth::{AuthenticatorRegistry, OAuthCredentials, TokenAuthenticator};
use crate::catalog::Catalog;
use crate::config::TapConfig;
use crate::engine::{ReplicationEngine, ShutdownSignal, StreamReport, StreamStatus, SyncConfig};
use crate::error::Result;
use crate::http::{HttpClient, HttpClientConfig};
use crate::output::{Message, RecordSink};
use crate::request::RequestBuilder;
use crate::state::StateManager;
use futures::stream::{self, StreamExt};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info};

/// Outcome of a read
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// One report per selected stream, in selection order
    pub streams: Vec<StreamReport>,
    /// Set when a run-level error stopped every stream
    pub aborted: Option<String>,
}

impl RunReport {
    /// Whether the run finished without failed partitions or an abort
    pub fn is_success(&self) -> bool {
        self.aborted.is_none() && self.streams.iter().all(|s| !s.has_failures())
    }

    /// Total records emitted across streams
    pub fn records_emitted(&self) -> u64 {
        self.streams.iter().map(|s| s.records_emitted).sum()
    }
}

/// The Visma.net ERP tap
#[derive(Debug)]
pub struct Tap {
    config: TapConfig,
    catalog: Catalog,
    registry: AuthenticatorRegistry,
    client: Arc<HttpClient>,
    state: StateManager,
}

impl Tap {
    /// Create a tap over the built-in catalog
    pub fn new(config: TapConfig, state: StateManager) -> Result<Self> {
        let catalog = Catalog::builtin(&config)?;
        let client = HttpClient::with_config(HttpClientConfig::from_settings(&config.http))?;
        let registry = AuthenticatorRegistry::with_client(client.inner().clone());

        Ok(Self {
            config,
            catalog,
            registry,
            client: Arc::new(client),
            state,
        })
    }

    /// Replace the stream catalog
    #[must_use]
    pub fn with_catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// The stream catalog
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// The state manager
    pub fn state(&self) -> &StateManager {
        &self.state
    }

    /// The authenticator shared by every stream of this config
    pub async fn authenticator(&self) -> Arc<TokenAuthenticator> {
        self.registry
            .get_or_create(&OAuthCredentials::from(&self.config))
            .await
    }

    /// Verify the credentials by obtaining a token
    pub async fn check(&self) -> Result<()> {
        self.authenticator().await.get_token().await?;
        info!("Connection check succeeded");
        Ok(())
    }

    /// Singer catalog of the available streams
    pub fn discover(&self) -> Value {
        self.catalog.to_json()
    }

    /// Extract the selected streams (all when `selection` is empty).
    ///
    /// Emits SCHEMA for every selected stream first, then runs up to
    /// `max_concurrent_streams` streams at once. An authentication or output
    /// failure in any stream stops the others before their next page.
    pub async fn read(
        &self,
        selection: &[String],
        sink: &dyn RecordSink,
        shutdown: &ShutdownSignal,
    ) -> Result<RunReport> {
        let streams = self.catalog.select(selection)?;
        for stream in &streams {
            sink.write(&Message::schema(stream)).await?;
        }

        let requests = RequestBuilder::new(
            self.config.api_url.clone(),
            self.authenticator().await,
            self.config.start_date,
        )
        .with_user_agent(self.config.user_agent.clone());
        let engine = ReplicationEngine::new(Arc::clone(&self.client), requests, self.state.clone())
            .with_config(SyncConfig::new().with_state_per_page(self.config.state_per_page));

        let (abort, signal) = shutdown.linked();
        let engine = &engine;
        let signal = &signal;
        let abort = &abort;

        let mut results: Vec<(usize, StreamReport, Option<String>)> =
            stream::iter(streams.into_iter().enumerate())
                .map(|(index, stream)| async move {
                    match engine.sync_stream(stream, sink, signal).await {
                        Ok(report) => (index, report, None),
                        Err(e) => {
                            error!(stream = stream.name(), error = %e, "Stream aborted the run");
                            abort.trigger();
                            (index, StreamReport::aborted(stream.name(), &e), Some(e.to_string()))
                        }
                    }
                })
                .buffer_unordered(self.config.max_concurrent_streams.max(1))
                .collect()
                .await;

        results.sort_by_key(|(index, _, _)| *index);

        let mut report = RunReport::default();
        for (_, stream_report, abort_reason) in results {
            if report.aborted.is_none() {
                report.aborted = abort_reason;
            }
            report.streams.push(stream_report);
        }
        sink.flush().await?;

        let cancelled = report
            .streams
            .iter()
            .filter(|s| s.status() == StreamStatus::Cancelled)
            .count();
        info!(
            streams = report.streams.len(),
            records = report.records_emitted(),
            cancelled,
            success = report.is_success(),
            "Read finished"
        );
        Ok(report)
    }
}
