//! Error types for the retrieval engine.

use thiserror::Error;

/// Errors that can occur while fetching from a knowledge endpoint.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RetrievalError {
    /// The request did not complete within the configured timeout.
    #[error("Request timed out")]
    Timeout,

    /// Connection could not be established.
    #[error("Connection failed: {0}")]
    Connect(String),

    /// Host name could not be resolved.
    #[error("DNS resolution failed: {0}")]
    Dns(String),

    /// Any other transport-level failure.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The endpoint answered with a non-success status.
    #[error("Endpoint returned status {0}")]
    Status(u16),

    /// The caller cancelled the retrieval.
    #[error("Retrieval cancelled")]
    Cancelled,

    /// The endpoint is not a valid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// HTTP client configuration error.
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    /// Retrieval configuration error.
    #[error("Configuration error: {0}")]
    InvalidConfig(String),

    /// No endpoints were supplied.
    #[error("No endpoints to retrieve from")]
    NoEndpoints,

    /// Every endpoint exhausted its retries.
    #[error("All {endpoints} endpoints failed, last error: {last_error}")]
    AllEndpointsFailed {
        /// Number of endpoints tried.
        endpoints: usize,
        /// Error reported by the last endpoint.
        last_error: Box<RetrievalError>,
    },
}

impl RetrievalError {
    /// Check if this error is retryable.
    ///
    /// Network failures and 5xx/429 statuses are transient; everything else,
    /// including cancellation, is terminal.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout | Self::Connect(_) | Self::Dns(_) | Self::Request(_) => true,
            Self::Status(status) => is_retryable_status(*status),
            _ => false,
        }
    }

    /// Whether this error is a cancellation.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// 5xx and 429 are retryable statuses.
#[must_use]
pub const fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500..=599)
}

/// 2xx statuses count as success.
#[must_use]
pub const fn is_success_status(status: u16) -> bool {
    matches!(status, 200..=299)
}

impl From<reqwest::Error> for RetrievalError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::Timeout;
        }
        if err.is_builder() {
            return Self::HttpClient(err.to_string());
        }
        if let Some(status) = err.status() {
            return Self::Status(status.as_u16());
        }
        if err.is_connect() {
            let detail = error_chain(&err);
            let lowered = detail.to_lowercase();
            if lowered.contains("dns") || lowered.contains("lookup") || lowered.contains("resolve") {
                return Self::Dns(detail);
            }
            return Self::Connect(detail);
        }
        Self::Request(error_chain(&err))
    }
}

fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut parts = vec![err.to_string()];
    let mut source = err.source();
    while let Some(inner) = source {
        parts.push(inner.to_string());
        source = inner.source();
    }
    parts.join(": ")
}
