//! CLI module
//!
//! Command-line interface for running the tap.
//!
//! # Commands
//!
//! - `check` - Verify the credentials against the token endpoint
//! - `discover` - Print the Singer catalog
//! - `streams` - List stream names (lightweight)
//! - `read` - Extract streams as Singer messages on stdout

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::Runner;
