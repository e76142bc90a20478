// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # tap-visma-erp
//!
//! A Singer tap that extracts Visma.net ERP entities over the REST API.
//!
//! ## Features
//!
//! - **OAuth2 client credentials**: One cached token per credential set, refreshed once on rejection
//! - **Retry and rate limiting**: Exponential backoff for transient HTTP failures
//! - **Page-number pagination**: Continues while a page ends with a `metadata` marker
//! - **Incremental sync**: Per-partition `lastModifiedDateTime` bookmarks
//! - **Composite keys**: Nested key fields flattened to `parent__child`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tap_visma_erp::engine::ShutdownSignal;
//! use tap_visma_erp::output::JsonLinesSink;
//! use tap_visma_erp::state::StateManager;
//! use tap_visma_erp::{Result, Tap, TapConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = TapConfig::from_file("config.json")?;
//!     let tap = Tap::new(config, StateManager::from_file("state.json")?)?;
//!
//!     tap.check().await?;
//!     println!("{}", tap.discover());
//!
//!     let sink = JsonLinesSink::stdout();
//!     let report = tap.read(&[], &sink, &ShutdownSignal::never()).await?;
//!     assert!(report.is_success());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                           Tap                                   │
//! │  check() → token    discover() → catalog    read() → messages   │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//! ┌──────────┬───────────┬───────┴───────┬───────────┬─────────────┐
//! │   Auth   │   HTTP    │   Paginate    │  Process  │   Output    │
//! ├──────────┼───────────┼───────────────┼───────────┼─────────────┤
//! │ OAuth2   │ GET       │ Page number   │ Flatten   │ SCHEMA      │
//! │ Registry │ Retry     │ Metadata tail │ Key check │ RECORD      │
//! │          │ Rate Limit│               │ Schema    │ STATE       │
//! └──────────┴───────────┴───────────────┴───────────┴─────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types and classification
pub mod error;

/// Common types and type aliases
pub mod types;

/// Tap configuration
pub mod config;

/// OAuth2 client-credentials authentication
pub mod auth;

/// HTTP client with retry and rate limiting
pub mod http;

/// Pagination strategies
pub mod pagination;

/// Record schemas
pub mod schema;

/// Stream definitions and partitions
pub mod stream;

/// Request construction
pub mod request;

/// Record extraction from response bodies
pub mod decode;

/// Record post-processing
pub mod process;

/// State management and checkpointing
pub mod state;

/// Singer message output
pub mod output;

/// Main execution engine
pub mod engine;

/// Built-in stream catalog
pub mod catalog;

/// Tap orchestration
pub mod tap;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use catalog::Catalog;
pub use config::TapConfig;
pub use tap::{RunReport, Tap};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
