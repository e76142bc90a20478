//! Tap configuration
//!
//! The configuration is a JSON document (file or inline) in the shape
//! Singer taps accept. Secrets are never printed through `Debug`.

use crate::error::{Error, Result};
use crate::types::{parse_timestamp, BackoffType};
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Deserializer};
use std::path::Path;
use std::time::Duration;

/// Default base URL of the Visma.net ERP REST API
pub const DEFAULT_API_URL: &str = "https://integration.visma.net/API";

/// Default OAuth token endpoint
pub const DEFAULT_TOKEN_URL: &str = "https://connect.visma.com/connect/token";

/// Default OAuth scope
pub const DEFAULT_SCOPE: &str = "vismanet_erp_service_api:read";

/// Default earliest record date to sync
pub const DEFAULT_START_DATE: &str = "2022-10-01";

// ============================================================================
// Tap Config
// ============================================================================

/// Complete tap configuration
#[derive(Clone, Deserialize)]
pub struct TapConfig {
    /// Tenant ID of the Visma organization
    #[serde(default)]
    pub tenant_id: String,

    /// OAuth client id
    #[serde(default)]
    pub client_id: String,

    /// OAuth client secret
    #[serde(default)]
    pub client_secret: String,

    /// The earliest record date to sync
    #[serde(default = "default_start_date", deserialize_with = "de_timestamp")]
    pub start_date: DateTime<Utc>,

    /// Optional User-Agent header for API requests
    #[serde(default)]
    pub user_agent: Option<String>,

    /// API root URL
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// OAuth token endpoint
    #[serde(default = "default_token_url")]
    pub token_url: String,

    /// OAuth scope
    #[serde(default = "default_scope")]
    pub scope: String,

    /// Financial years to extract for fiscal-year partitioned streams
    #[serde(default)]
    pub financial_years: Vec<i32>,

    /// Maximum number of streams extracted at the same time
    #[serde(default = "default_max_concurrent_streams")]
    pub max_concurrent_streams: usize,

    /// Checkpoint state after every page instead of only at stream end
    #[serde(default = "default_true")]
    pub state_per_page: bool,

    /// HTTP transport settings
    #[serde(default)]
    pub http: HttpSettings,
}

fn default_start_date() -> DateTime<Utc> {
    parse_timestamp(DEFAULT_START_DATE).unwrap_or_default()
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_token_url() -> String {
    DEFAULT_TOKEN_URL.to_string()
}

fn default_scope() -> String {
    DEFAULT_SCOPE.to_string()
}

fn default_max_concurrent_streams() -> usize {
    4
}

fn default_true() -> bool {
    true
}

fn de_timestamp<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid start_date '{raw}'")))
}

impl TapConfig {
    /// Parse and validate a config from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| Error::config(format!("Invalid config JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a config from a JSON value
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let config: Self = serde_json::from_value(value)
            .map_err(|e| Error::config(format!("Invalid config JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::config(format!("Failed to read config file: {e}")))?;
        Self::from_json(&content)
    }

    /// Check required fields and value ranges
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("tenant_id", &self.tenant_id),
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
        ] {
            if value.trim().is_empty() {
                return Err(Error::missing_field(field));
            }
        }

        url::Url::parse(&self.api_url)
            .map_err(|e| Error::invalid_value("api_url", e.to_string()))?;
        url::Url::parse(&self.token_url)
            .map_err(|e| Error::invalid_value("token_url", e.to_string()))?;

        if self.max_concurrent_streams == 0 {
            return Err(Error::invalid_value(
                "max_concurrent_streams",
                "must be at least 1",
            ));
        }
        if self.http.requests_per_second == Some(0) {
            return Err(Error::invalid_value(
                "http.requests_per_second",
                "must be at least 1",
            ));
        }

        Ok(())
    }

    /// Financial years used as partitions, oldest first.
    ///
    /// Falls back to every year from `start_date` up to the current year.
    pub fn financial_years(&self) -> Vec<i32> {
        if !self.financial_years.is_empty() {
            let mut years = self.financial_years.clone();
            years.sort_unstable();
            years.dedup();
            return years;
        }
        let first = self.start_date.year();
        let last = Utc::now().year().max(first);
        (first..=last).collect()
    }
}

impl std::fmt::Debug for TapConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TapConfig")
            .field("tenant_id", &"<redacted>")
            .field("client_id", &"<redacted>")
            .field("client_secret", &"<redacted>")
            .field("start_date", &self.start_date)
            .field("user_agent", &self.user_agent)
            .field("api_url", &self.api_url)
            .field("token_url", &self.token_url)
            .field("scope", &self.scope)
            .field("financial_years", &self.financial_years)
            .field("max_concurrent_streams", &self.max_concurrent_streams)
            .field("state_per_page", &self.state_per_page)
            .field("http", &self.http)
            .finish()
    }
}

// ============================================================================
// HTTP Settings
// ============================================================================

/// HTTP transport settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry, in milliseconds
    pub initial_backoff_ms: u64,
    /// Upper bound for a single retry delay, in seconds
    pub max_backoff_secs: u64,
    /// Backoff growth
    pub backoff: BackoffType,
    /// Optional client-side rate limit for API requests
    pub requests_per_second: Option<u32>,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_retries: 3,
            initial_backoff_ms: 500,
            max_backoff_secs: 60,
            backoff: BackoffType::Exponential,
            requests_per_second: None,
        }
    }
}

impl HttpSettings {
    /// Request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Delay before the first retry
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    /// Upper bound for a retry delay
    pub fn max_backoff(&self) -> Duration {
        Duration::from_secs(self.max_backoff_secs)
    }
}
