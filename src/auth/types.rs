//! Auth configuration types

use crate::config::TapConfig;
use chrono::{DateTime, Utc};
use std::hash::{Hash, Hasher};

/// Credentials for the client-credentials grant.
///
/// Also the registry key: two configs with the same credentials share one
/// authenticator.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct OAuthCredentials {
    /// Token endpoint URL
    pub token_url: String,
    /// Client ID
    pub client_id: String,
    /// Client secret
    pub client_secret: String,
    /// Visma tenant the token is issued for
    pub tenant_id: String,
    /// Requested scope
    pub scope: String,
}

impl OAuthCredentials {
    /// Create credentials from their parts
    pub fn new(
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        tenant_id: impl Into<String>,
        scope: impl Into<String>,
    ) -> Self {
        Self {
            token_url: token_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            tenant_id: tenant_id.into(),
            scope: scope.into(),
        }
    }

    /// Form body of the token request
    pub fn form(&self) -> [(&'static str, &str); 5] {
        [
            ("scope", self.scope.as_str()),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("tenant_id", self.tenant_id.as_str()),
            ("grant_type", "client_credentials"),
        ]
    }

    /// Stable fingerprint for log lines; never reveals the secret
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

impl From<&TapConfig> for OAuthCredentials {
    fn from(config: &TapConfig) -> Self {
        Self::new(
            &config.token_url,
            &config.client_id,
            &config.client_secret,
            &config.tenant_id,
            &config.scope,
        )
    }
}

impl std::fmt::Debug for OAuthCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthCredentials")
            .field("token_url", &self.token_url)
            .field("tenant_id", &self.tenant_id)
            .field("scope", &self.scope)
            .field("fingerprint", &format!("{:016x}", self.fingerprint()))
            .finish_non_exhaustive()
    }
}

/// Cached token with expiration
#[derive(Debug, Clone)]
pub struct CachedToken {
    /// The access token
    pub token: String,
    /// When the token expires
    pub expires_at: Option<DateTime<Utc>>,
}

impl CachedToken {
    /// Create a new cached token
    pub fn new(token: String, expires_at: Option<DateTime<Utc>>) -> Self {
        Self { token, expires_at }
    }

    /// Create a token that expires in N seconds from now
    pub fn expires_in(token: String, seconds: i64) -> Self {
        let expires_at = Utc::now() + chrono::Duration::seconds(seconds);
        Self {
            token,
            expires_at: Some(expires_at),
        }
    }

    /// Check if the token is expired (with 30 second buffer)
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => {
                let buffer = chrono::Duration::seconds(30);
                Utc::now() + buffer >= expires_at
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod type_tests {
    use super::*;

    #[test]
    fn test_cached_token_not_expired() {
        let token = CachedToken::expires_in("test".to_string(), 3600);
        assert!(!token.is_expired());
    }

    #[test]
    fn test_cached_token_expired() {
        let token = CachedToken::expires_in("test".to_string(), -100);
        assert!(token.is_expired());

        // inside the 30s safety buffer
        let token = CachedToken::expires_in("test".to_string(), 10);
        assert!(token.is_expired());
    }

    #[test]
    fn test_cached_token_no_expiration() {
        let token = CachedToken::new("test".to_string(), None);
        assert!(!token.is_expired());
    }

    #[test]
    fn test_credentials_form() {
        let creds = OAuthCredentials::new("https://t/token", "id", "secret", "tenant", "scope:read");
        let form = creds.form();
        assert!(form.contains(&("grant_type", "client_credentials")));
        assert!(form.contains(&("tenant_id", "tenant")));
        assert!(form.contains(&("scope", "scope:read")));
    }

    #[test]
    fn test_credentials_debug_hides_secret() {
        let creds = OAuthCredentials::new("https://t/token", "id", "top-secret", "tenant", "s");
        let printed = format!("{creds:?}");
        assert!(!printed.contains("top-secret"));
        assert!(printed.contains("fingerprint"));
    }
}
