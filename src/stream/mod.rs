//! Stream definitions
//!
//! A `StreamDefinition` is the static descriptor of one API entity: where
//! it lives, how its records are keyed, which field drives incremental
//! replication, and which partitions it must be queried for.

mod definition;
mod partition;

pub use definition::{FlattenRule, StreamDefinition, StreamDefinitionBuilder};
pub use partition::Partition;
