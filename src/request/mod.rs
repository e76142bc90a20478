//! Request building
//!
//! Turns (stream, partition, page cursor, bookmark) into a fully
//! parameterized, authenticated `HttpRequest`.

mod builder;

pub use builder::{merge_params, RequestBuilder, DEFAULT_PAGE_SIZE};
