//! Response decoding
//!
//! The API answers every list endpoint with a top-level JSON array. The
//! extractor parses the body and selects the records with a JSONPath.

mod extractor;

pub use extractor::{ResponseExtractor, DEFAULT_RECORDS_PATH};
