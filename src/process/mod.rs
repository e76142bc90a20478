//! Record post-processing
//!
//! Runs after extraction and before emission. The stock processor copies
//! nested primary-key values to flat top-level fields and checks the
//! result against the stream schema.

mod flatten;

pub use flatten::FlattenProcessor;

use crate::error::Result;
use crate::stream::StreamDefinition;
use serde_json::Value;

/// Transforms one raw record into an emittable record.
///
/// `Ok(None)` drops the record silently. An `Err` is a per-record failure:
/// the engine skips the record and keeps going.
pub trait RecordPostProcessor: Send + Sync {
    /// Process a single record
    fn process(&self, record: Value, stream: &StreamDefinition) -> Result<Option<Value>>;
}
