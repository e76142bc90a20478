//! State manager implementation
//!
//! Provides shared state with optional file persistence and atomic writes.

use super::types::State;
use crate::error::{Error, Result};
use crate::stream::Partition;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

/// State manager for persisting and loading state.
///
/// Clones share the same state; concurrent streams each hold a clone.
#[derive(Debug, Clone)]
pub struct StateManager {
    /// Path to the state file (empty in memory mode)
    path: PathBuf,
    /// Current state
    state: Arc<RwLock<State>>,
    /// Serializes file writes
    write_lock: Arc<Mutex<()>>,
}

impl StateManager {
    fn with_state(path: PathBuf, state: State) -> Self {
        Self {
            path,
            state: Arc::new(RwLock::new(state)),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Create a file-backed state manager starting from empty state
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self::with_state(path.as_ref().to_path_buf(), State::new())
    }

    /// Create an in-memory state manager (no file persistence)
    pub fn in_memory() -> Self {
        Self::with_state(PathBuf::new(), State::new())
    }

    /// Create a state manager from a file, loading existing state if present
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let state = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| Error::state(format!("Failed to read state file: {e}")))?;
            parse_state(&contents)?
        } else {
            State::new()
        };
        Ok(Self::with_state(path, state))
    }

    /// Create an in-memory state manager from inline JSON
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(Self::with_state(PathBuf::new(), parse_state(json)?))
    }

    /// Persist current state to the backing file; no-op in memory mode.
    ///
    /// Writes a temp file and renames it over the target, so a crash never
    /// leaves a truncated state file.
    pub async fn checkpoint(&self) -> Result<()> {
        if self.is_in_memory() {
            return Ok(());
        }

        let _guard = self.write_lock.lock().await;
        let contents = self.to_json_pretty().await?;

        let temp_path = self.path.with_extension("tmp");
        tokio::fs::write(&temp_path, &contents)
            .await
            .map_err(|e| Error::state(format!("Failed to write state file: {e}")))?;

        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| Error::state(format!("Failed to rename state file: {e}")))?;

        debug!(path = %self.path.display(), "State saved");
        Ok(())
    }

    /// Copy of the current state
    pub async fn snapshot(&self) -> State {
        self.state.read().await.clone()
    }

    /// Current state as a JSON value, as carried by STATE messages
    pub async fn to_value(&self) -> Result<serde_json::Value> {
        let state = self.state.read().await;
        serde_json::to_value(&*state)
            .map_err(|e| Error::state(format!("Failed to serialize state: {e}")))
    }

    /// Export state as pretty-printed JSON string
    pub async fn to_json_pretty(&self) -> Result<String> {
        let state = self.state.read().await;
        serde_json::to_string_pretty(&*state)
            .map_err(|e| Error::state(format!("Failed to serialize state: {e}")))
    }

    /// Bookmark of one stream partition
    pub async fn bookmark(&self, stream: &str, partition: &Partition) -> Option<DateTime<Utc>> {
        self.state.read().await.bookmark(stream, partition)
    }

    /// Move a bookmark forward; older or equal values are ignored.
    ///
    /// Returns whether the bookmark changed. Nothing is written to disk;
    /// call `checkpoint` to persist.
    pub async fn advance_bookmark(
        &self,
        stream: &str,
        replication_key: &str,
        partition: &Partition,
        value: DateTime<Utc>,
    ) -> bool {
        let advanced = self
            .state
            .write()
            .await
            .advance_bookmark(stream, replication_key, partition, value);
        if advanced {
            debug!(stream, partition = %partition, bookmark = %value, "Bookmark advanced");
        }
        advanced
    }

    /// Get the state file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if using in-memory mode
    pub fn is_in_memory(&self) -> bool {
        self.path.as_os_str().is_empty()
    }
}

fn parse_state(json: &str) -> Result<State> {
    if json.trim().is_empty() {
        return Ok(State::new());
    }
    serde_json::from_str(json).map_err(|e| Error::state(format!("Failed to parse state JSON: {e}")))
}
