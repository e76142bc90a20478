//! Output module
//!
//! Singer messages and the sinks they are written to.
//!
//! # Overview
//!
//! - `Message` - SCHEMA, RECORD and STATE messages in Singer wire format
//! - `RecordSink` - async destination for messages
//! - `JsonLinesSink` - one JSON message per line to any writer (stdout in the binary)
//! - `MemorySink` - collects messages in memory

mod message;
mod sink;

pub use message::Message;
pub use sink::{JsonLinesSink, MemorySink, RecordSink};

#[cfg(test)]
mod tests;
