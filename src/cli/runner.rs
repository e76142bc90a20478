//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::TapConfig;
use crate::engine::ShutdownSignal;
use crate::error::{Error, Result};
use crate::output::JsonLinesSink;
use crate::state::StateManager;
use crate::tap::Tap;
use serde_json::{json, Value};
use std::io::Write;
use tracing::{info, warn};

/// CLI runner
pub struct Runner {
    cli: Cli,
    shutdown: ShutdownSignal,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self {
            cli,
            shutdown: ShutdownSignal::never(),
        }
    }

    /// Stop reads when `shutdown` fires
    #[must_use]
    pub fn with_shutdown(mut self, shutdown: ShutdownSignal) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Check => self.check().await,
            Commands::Discover => self.discover(),
            Commands::Streams => self.streams(),
            Commands::Read { streams } => self.read(streams).await,
        }
    }

    /// Load config; inline JSON takes precedence over the file
    fn load_config(&self) -> Result<TapConfig> {
        if let Some(config_json) = &self.cli.config_json {
            TapConfig::from_json(config_json)
        } else if let Some(path) = &self.cli.config {
            TapConfig::from_file(path)
        } else {
            Err(Error::config(
                "No configuration given, use --config or --config-json",
            ))
        }
    }

    /// Load state; inline JSON takes precedence over the file
    fn load_state(&self) -> Result<StateManager> {
        if let Some(state_json) = &self.cli.state_json {
            StateManager::from_json(state_json)
        } else if let Some(path) = &self.cli.state {
            StateManager::from_file(path)
        } else {
            Ok(StateManager::in_memory())
        }
    }

    fn build_tap(&self) -> Result<Tap> {
        Tap::new(self.load_config()?, self.load_state()?)
    }

    /// Check connection
    async fn check(&self) -> Result<()> {
        self.build_tap()?.check().await
    }

    /// Print the catalog
    fn discover(&self) -> Result<()> {
        let catalog = self.build_tap()?.discover();
        self.output(&catalog)
    }

    /// List stream names
    fn streams(&self) -> Result<()> {
        let tap = self.build_tap()?;
        let names = tap.catalog().names();

        match self.cli.format {
            OutputFormat::Json => self.output(&json!(names)),
            OutputFormat::Pretty => {
                let mut stdout = std::io::stdout().lock();
                for name in names {
                    writeln!(stdout, "{name}")?;
                }
                Ok(())
            }
        }
    }

    /// Extract streams as Singer messages on stdout
    async fn read(&self, streams: &[String]) -> Result<()> {
        let tap = self.build_tap()?;
        let sink = JsonLinesSink::stdout();

        let report = tap.read(streams, &sink, &self.shutdown).await?;

        for stream in &report.streams {
            info!(
                stream = %stream.stream,
                status = %stream.status(),
                records = stream.records_emitted,
                skipped = stream.records_skipped,
                failed_partitions = stream.partitions_failed.len(),
                "Stream summary"
            );
        }

        if let Some(reason) = &report.aborted {
            return Err(Error::Other(format!("Run aborted: {reason}")));
        }
        if !report.is_success() {
            let failed: Vec<&str> = report
                .streams
                .iter()
                .filter(|s| s.has_failures())
                .map(|s| s.stream.as_str())
                .collect();
            warn!(streams = ?failed, "Read finished with failed partitions");
            return Err(Error::Other(format!(
                "Failed partitions in streams: {}",
                failed.join(", ")
            )));
        }
        Ok(())
    }

    fn output(&self, value: &Value) -> Result<()> {
        let rendered = match self.cli.format {
            OutputFormat::Json => serde_json::to_string(value)?,
            OutputFormat::Pretty => serde_json::to_string_pretty(value)?,
        };
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{rendered}")?;
        Ok(())
    }
}
