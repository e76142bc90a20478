//! Pagination module
//!
//! The Visma API returns neither a total count nor a next-page link. The
//! only continuation signal is a `metadata` object on the last record of a
//! full page, so the paginator inspects the payload rather than headers.

mod strategies;
mod types;

pub use strategies::MetadataMarkerPaginator;
pub use types::{PageCursor, Paginator};
