//! State management module
//!
//! Handles bookmark tracking and checkpointing. State is persisted between
//! runs so incremental streams resume where the last run stopped.
//!
//! # Overview
//!
//! The state module provides:
//! - `State` - Singer bookmark document, keyed by stream and partition
//! - `StateManager` - Shared, optionally file-backed state with monotonic bookmarks

mod manager;
mod types;

pub use manager::StateManager;
pub use types::{PartitionState, State, StreamState};

#[cfg(test)]
mod manager_tests;
