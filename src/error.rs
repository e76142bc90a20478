//! Error types for the Visma ERP tap
//!
//! Every public API returns `Result<T, Error>`. Errors are grouped into
//! classes that decide how far a failure propagates: a single record, a
//! page, a partition, or the whole run.

use thiserror::Error;

/// The main error type for the tap
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    /// Invalid configuration
    #[error("Configuration error: {message}")]
    Config {
        /// What is wrong
        message: String,
    },

    /// A required config field is absent or empty
    #[error("Missing required config field: {field}")]
    MissingConfigField {
        /// Config key
        field: String,
    },

    /// A config field has an unusable value
    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue {
        /// Config key
        field: String,
        /// What is wrong
        message: String,
    },

    // ============================================================================
    // Authentication Errors
    // ============================================================================
    /// The token endpoint refused or failed
    #[error("Authentication failed: {message}")]
    Authentication {
        /// Cause reported by the token endpoint or transport
        message: String,
    },

    // ============================================================================
    // Transport Errors
    // ============================================================================
    /// Request could not be sent
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body could not be read to the end
    #[error("Failed to read response body: {0}")]
    Body(reqwest::Error),

    /// Non-success status from the API
    #[error("HTTP {status}: {body}")]
    HttpStatus {
        /// Status code
        status: u16,
        /// Response body, possibly empty
        body: String,
    },

    /// 429 with no retries left
    #[error("Rate limited, retry after {retry_after_seconds}s")]
    RateLimited {
        /// Delay the server asked for
        retry_after_seconds: u64,
    },

    /// Request exceeded the configured timeout
    #[error("Request timeout after {timeout_ms}ms")]
    Timeout {
        /// Configured timeout
        timeout_ms: u64,
    },

    /// Malformed URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // Parse Errors
    // ============================================================================
    /// JSON (de)serialization failure
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Response body does not have the expected shape
    #[error("Failed to parse response: {message}")]
    Parse {
        /// What is wrong
        message: String,
    },

    /// Records path could not be compiled
    #[error("JSONPath error: {message}")]
    JsonPath {
        /// What is wrong
        message: String,
    },

    // ============================================================================
    // Record Errors
    // ============================================================================
    /// A record broke its stream's keys or schema
    #[error("Schema violation in stream '{stream}': {message}")]
    SchemaViolation {
        /// Stream name
        stream: String,
        /// Offending field and value
        message: String,
    },

    // ============================================================================
    // State / Run Errors
    // ============================================================================
    /// State could not be read, parsed or written
    #[error("State error: {message}")]
    State {
        /// What is wrong
        message: String,
    },

    /// Selected stream is not in the catalog
    #[error("Stream '{stream}' not found in catalog")]
    StreamNotFound {
        /// Requested name
        stream: String,
    },

    /// The output sink rejected a message
    #[error("Output error: {message}")]
    Sink {
        /// What is wrong
        message: String,
    },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    /// Local I/O failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    /// Anything else
    #[error("{0}")]
    Other(String),

    /// Error from binary glue code
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

/// Failure class, deciding the blast radius of an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Token could not be obtained; aborts every stream sharing the authenticator
    Authentication,
    /// Network, timeout, or HTTP status failure; retried, then fails the partition
    Transport,
    /// Body could not be decoded; fails the page (and its partition)
    Parse,
    /// A single record broke the stream's schema; the record is skipped
    SchemaViolation,
    /// Anything else (config, state, output)
    Other,
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    /// Create an invalid config value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an authentication error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    /// Create an HTTP status error
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }

    /// Create a parse error
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Create a JSONPath error
    pub fn json_path(message: impl Into<String>) -> Self {
        Self::JsonPath {
            message: message.into(),
        }
    }

    /// Create a schema violation error
    pub fn schema_violation(stream: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SchemaViolation {
            stream: stream.into(),
            message: message.into(),
        }
    }

    /// Create a state error
    pub fn state(message: impl Into<String>) -> Self {
        Self::State {
            message: message.into(),
        }
    }

    /// Create an output error
    pub fn sink(message: impl Into<String>) -> Self {
        Self::Sink {
            message: message.into(),
        }
    }

    /// Classify this error
    pub fn class(&self) -> ErrorClass {
        match self {
            Error::Authentication { .. } => ErrorClass::Authentication,
            Error::Http(_)
            | Error::Body(_)
            | Error::HttpStatus { .. }
            | Error::RateLimited { .. }
            | Error::Timeout { .. }
            | Error::InvalidUrl(_) => ErrorClass::Transport,
            Error::JsonParse(_) | Error::Parse { .. } | Error::JsonPath { .. } => ErrorClass::Parse,
            Error::SchemaViolation { .. } => ErrorClass::SchemaViolation,
            _ => ErrorClass::Other,
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(e) => e.is_timeout() || e.is_connect() || e.is_request() || e.is_body(),
            Error::Body(_) | Error::RateLimited { .. } | Error::Timeout { .. } => true,
            Error::HttpStatus { status, .. } => is_retryable_status(*status),
            _ => false,
        }
    }

    /// Check if the API rejected the bearer token
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::HttpStatus { status: 401, .. })
    }

    /// Check if the API refused the request itself (4xx other than 401/429);
    /// the remaining partitions of the stream would be refused too
    pub fn fails_stream(&self) -> bool {
        matches!(
            self,
            Error::HttpStatus { status, .. }
                if (400..500).contains(status) && *status != 401 && *status != 429
        )
    }

    /// Check if this error must stop every stream of the run
    pub fn aborts_run(&self) -> bool {
        self.class() == ErrorClass::Authentication
    }
}

/// Check if an HTTP status code is retryable
pub fn is_retryable_status(status: u16) -> bool {
    matches!(
        status,
        429 | 500 | 502 | 503 | 504 | 520 | 521 | 522 | 523 | 524
    )
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::config("test message");
        assert_eq!(err.to_string(), "Configuration error: test message");

        let err = Error::missing_field("client_id");
        assert_eq!(err.to_string(), "Missing required config field: client_id");

        let err = Error::http_status(404, "Not found");
        assert_eq!(err.to_string(), "HTTP 404: Not found");

        let err = Error::schema_violation("account", "missing key");
        assert_eq!(
            err.to_string(),
            "Schema violation in stream 'account': missing key"
        );
    }

    #[test]
    fn test_is_retryable() {
        assert!(Error::Timeout { timeout_ms: 1000 }.is_retryable());
        assert!(Error::http_status(429, "").is_retryable());
        assert!(Error::http_status(500, "").is_retryable());
        assert!(Error::http_status(503, "").is_retryable());

        assert!(!Error::http_status(400, "").is_retryable());
        assert!(!Error::http_status(401, "").is_retryable());
        assert!(!Error::http_status(404, "").is_retryable());
        assert!(!Error::config("test").is_retryable());
        assert!(!Error::parse("bad body").is_retryable());
    }

    #[test]
    fn test_error_class() {
        assert_eq!(Error::auth("denied").class(), ErrorClass::Authentication);
        assert_eq!(Error::http_status(502, "").class(), ErrorClass::Transport);
        assert_eq!(
            Error::Timeout { timeout_ms: 50 }.class(),
            ErrorClass::Transport
        );
        assert_eq!(Error::parse("x").class(), ErrorClass::Parse);
        assert_eq!(
            Error::schema_violation("s", "m").class(),
            ErrorClass::SchemaViolation
        );
        assert_eq!(Error::state("x").class(), ErrorClass::Other);
    }

    #[test]
    fn test_only_auth_aborts_run() {
        assert!(Error::auth("token endpoint down").aborts_run());
        assert!(!Error::http_status(401, "").aborts_run());
        assert!(!Error::http_status(500, "").aborts_run());
        assert!(!Error::parse("x").aborts_run());
    }

    #[test]
    fn test_is_unauthorized() {
        assert!(Error::http_status(401, "").is_unauthorized());
        assert!(!Error::http_status(403, "").is_unauthorized());
        assert!(!Error::auth("x").is_unauthorized());
    }

    #[test]
    fn test_fails_stream() {
        assert!(Error::http_status(400, "").fails_stream());
        assert!(Error::http_status(404, "").fails_stream());
        assert!(!Error::http_status(401, "").fails_stream());
        assert!(!Error::http_status(429, "").fails_stream());
        assert!(!Error::http_status(503, "").fails_stream());
        assert!(!Error::parse("x").fails_stream());
    }
}
