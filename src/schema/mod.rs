//! Schema descriptors
//!
//! Streams declare their fields as a typed tree. The tree renders to JSON
//! Schema for discovery and backs the light per-record type check done
//! before a record is emitted.

mod types;

pub use types::{FieldType, Property, Schema};
