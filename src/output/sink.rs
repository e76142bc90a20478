//! Message sinks

use super::message::Message;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::io::Write;
use tokio::sync::Mutex;

/// Destination for Singer messages.
///
/// Shared by concurrently running streams; a single `write` call must
/// never interleave with another.
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Write one message
    async fn write(&self, message: &Message) -> Result<()>;

    /// Flush buffered output
    async fn flush(&self) -> Result<()> {
        Ok(())
    }
}

// ============================================================================
// JSON Lines Sink
// ============================================================================

/// Writes each message as one line of JSON
#[derive(Debug)]
pub struct JsonLinesSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    /// Wrap a writer
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Unwrap the writer
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl JsonLinesSink<std::io::Stdout> {
    /// Sink writing to stdout
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

#[async_trait]
impl<W: Write + Send> RecordSink for JsonLinesSink<W> {
    async fn write(&self, message: &Message) -> Result<()> {
        let line = serde_json::to_string(message)
            .map_err(|e| Error::sink(format!("Failed to serialize message: {e}")))?;
        let mut writer = self.writer.lock().await;
        writeln!(writer, "{line}").map_err(|e| Error::sink(format!("Failed to write message: {e}")))
    }

    async fn flush(&self) -> Result<()> {
        self.writer
            .lock()
            .await
            .flush()
            .map_err(|e| Error::sink(format!("Failed to flush output: {e}")))
    }
}

// ============================================================================
// Memory Sink
// ============================================================================

/// Collects messages in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    messages: Mutex<Vec<Message>>,
}

impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages written so far
    pub async fn messages(&self) -> Vec<Message> {
        self.messages.lock().await.clone()
    }

    /// Records written for one stream, in emission order
    pub async fn records(&self, stream: &str) -> Vec<Value> {
        self.messages
            .lock()
            .await
            .iter()
            .filter_map(|message| match message {
                Message::Record {
                    stream: name,
                    record,
                    ..
                } if name == stream => Some(record.clone()),
                _ => None,
            })
            .collect()
    }

    /// State values written so far
    pub async fn states(&self) -> Vec<Value> {
        self.messages
            .lock()
            .await
            .iter()
            .filter_map(|message| match message {
                Message::State { value } => Some(value.clone()),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl RecordSink for MemorySink {
    async fn write(&self, message: &Message) -> Result<()> {
        self.messages.lock().await.push(message.clone());
        Ok(())
    }
}
