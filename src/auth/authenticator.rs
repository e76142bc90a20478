//! Token authenticator implementation
//!
//! Obtains OAuth2 client-credentials tokens and keeps them cached until they
//! expire or the API rejects them.

use super::types::{CachedToken, OAuthCredentials};
use crate::error::{Error, Result};
use reqwest::Client;
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Caching OAuth2 client-credentials authenticator
pub struct TokenAuthenticator {
    /// Credentials used for every token request
    credentials: OAuthCredentials,
    /// Cached token; the write lock is held for the duration of a refresh
    cached_token: RwLock<Option<CachedToken>>,
    /// HTTP client for token requests
    http_client: Client,
    /// Number of token requests issued so far
    token_requests: AtomicU64,
}

impl TokenAuthenticator {
    /// Create a new authenticator for the given credentials
    pub fn new(credentials: OAuthCredentials) -> Self {
        Self::with_client(credentials, Client::new())
    }

    /// Create an authenticator with a custom HTTP client
    pub fn with_client(credentials: OAuthCredentials, http_client: Client) -> Self {
        Self {
            credentials,
            cached_token: RwLock::new(None),
            http_client,
            token_requests: AtomicU64::new(0),
        }
    }

    /// Get a valid bearer token, fetching one if none is cached or it expired
    pub async fn get_token(&self) -> Result<String> {
        {
            let cached = self.cached_token.read().await;
            if let Some(token) = cached.as_ref() {
                if !token.is_expired() {
                    return Ok(token.token.clone());
                }
            }
        }

        let mut cached = self.cached_token.write().await;

        // another task may have refreshed while we waited for the lock
        if let Some(token) = cached.as_ref() {
            if !token.is_expired() {
                return Ok(token.token.clone());
            }
        }

        let new_token = self.fetch_token().await?;
        let token_str = new_token.token.clone();
        *cached = Some(new_token);

        Ok(token_str)
    }

    /// Replace a token the API answered 401 to.
    ///
    /// Concurrent callers holding the same rejected token trigger one token
    /// request; the others get the token it produced.
    pub async fn refresh_rejected(&self, rejected: &str) -> Result<String> {
        let mut cached = self.cached_token.write().await;

        if let Some(token) = cached.as_ref() {
            if token.token != rejected && !token.is_expired() {
                debug!("Token already refreshed by another caller");
                return Ok(token.token.clone());
            }
        }

        warn!(
            tenant_id = %self.credentials.tenant_id,
            "Bearer token rejected, requesting a new one"
        );
        *cached = None;
        let new_token = self.fetch_token().await?;
        let token_str = new_token.token.clone();
        *cached = Some(new_token);

        Ok(token_str)
    }

    /// Request a token from the token endpoint
    async fn fetch_token(&self) -> Result<CachedToken> {
        self.token_requests.fetch_add(1, Ordering::Relaxed);
        debug!(token_url = %self.credentials.token_url, "Requesting OAuth token");

        let response = self
            .http_client
            .post(&self.credentials.token_url)
            .form(&self.credentials.form())
            .send()
            .await
            .map_err(|e| Error::auth(format!("Token request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::auth(format!(
                "Token request failed with status {status}: {body}"
            )));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::auth(format!("Invalid token response: {e}")))?;

        info!(
            tenant_id = %self.credentials.tenant_id,
            expires_in = ?token_response.expires_in,
            "Obtained OAuth token"
        );
        Ok(token_response.into_cached_token())
    }

    /// Clear the cached token
    pub async fn clear_cache(&self) {
        let mut cached = self.cached_token.write().await;
        *cached = None;
    }

    /// Number of requests sent to the token endpoint
    pub fn token_requests(&self) -> u64 {
        self.token_requests.load(Ordering::Relaxed)
    }

    /// Credentials this authenticator was built for
    pub fn credentials(&self) -> &OAuthCredentials {
        &self.credentials
    }
}

impl std::fmt::Debug for TokenAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenAuthenticator")
            .field("credentials", &self.credentials)
            .field("token_requests", &self.token_requests())
            .finish_non_exhaustive()
    }
}

/// OAuth2 token response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    #[allow(dead_code)]
    token_type: Option<String>,
}

impl TokenResponse {
    fn into_cached_token(self) -> CachedToken {
        match self.expires_in {
            Some(secs) => CachedToken::expires_in(self.access_token, secs),
            None => CachedToken::new(self.access_token, None),
        }
    }
}
