//! Authentication module
//!
//! OAuth2 client-credentials authentication against the Visma Connect
//! token endpoint.
//!
//! The `TokenAuthenticator` caches the bearer token and serializes refreshes
//! so concurrent callers share a single token request. The
//! `AuthenticatorRegistry` hands out one authenticator per distinct set of
//! credentials, so every stream of a run reuses the same token.

mod authenticator;
mod registry;
mod types;

pub use authenticator::TokenAuthenticator;
pub use registry::AuthenticatorRegistry;
pub use types::{CachedToken, OAuthCredentials};
