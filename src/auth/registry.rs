//! Authenticator registry
//!
//! One `TokenAuthenticator` per distinct credentials, created lazily and
//! shared by every stream of the process.

use super::authenticator::TokenAuthenticator;
use super::types::OAuthCredentials;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Registry of authenticators keyed by credentials
#[derive(Default)]
pub struct AuthenticatorRegistry {
    authenticators: Mutex<HashMap<OAuthCredentials, Arc<TokenAuthenticator>>>,
    http_client: Client,
}

impl AuthenticatorRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry whose authenticators use the given HTTP client
    pub fn with_client(http_client: Client) -> Self {
        Self {
            authenticators: Mutex::new(HashMap::new()),
            http_client,
        }
    }

    /// Get the authenticator for these credentials, creating it on first use
    pub async fn get_or_create(&self, credentials: &OAuthCredentials) -> Arc<TokenAuthenticator> {
        let mut authenticators = self.authenticators.lock().await;
        if let Some(existing) = authenticators.get(credentials) {
            return Arc::clone(existing);
        }

        debug!(?credentials, "Creating authenticator");
        let authenticator = Arc::new(TokenAuthenticator::with_client(
            credentials.clone(),
            self.http_client.clone(),
        ));
        authenticators.insert(credentials.clone(), Arc::clone(&authenticator));
        authenticator
    }
}

impl std::fmt::Debug for AuthenticatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticatorRegistry").finish_non_exhaustive()
    }
}
