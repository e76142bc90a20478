//! HTTP client module
//!
//! Transport for API requests: retries with bounded backoff and optional
//! client-side rate limiting. Authentication is attached by the request
//! builder, not here, so a 401 reaches the caller untouched.

mod client;
mod rate_limit;

pub use client::{HttpClient, HttpClientConfig, HttpRequest};
pub use rate_limit::{RateLimiter, RateLimiterConfig};
