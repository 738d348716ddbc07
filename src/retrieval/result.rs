//! Outcome of one retrieval call.

use std::borrow::Cow;
use std::time::Duration;

use crate::retrieval::error::RetrievalError;

/// Result of a retrieval, returned once to the caller and never cached.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RetrievalResult {
    /// Whether a payload was obtained.
    pub success: bool,
    /// Raw payload bytes.
    pub payload: Vec<u8>,
    /// Last HTTP status seen, if any response arrived.
    pub status: Option<u16>,
    /// Wall time spent, including retry delays.
    pub elapsed: Duration,
    /// Failed attempts before the result was produced.
    pub retry_count: u32,
    /// Error for unsuccessful results.
    pub error: Option<RetrievalError>,
    /// Endpoint that produced the result.
    pub endpoint: Option<String>,
    /// Whether the payload is the caller's fallback.
    pub from_fallback: bool,
}

impl RetrievalResult {
    pub(crate) fn failure(error: RetrievalError, retry_count: u32, elapsed: Duration) -> Self {
        Self {
            success: false,
            retry_count,
            elapsed,
            error: Some(error),
            ..Self::default()
        }
    }

    /// Payload decoded as UTF-8, lossily.
    #[must_use]
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }

    /// Whether the retrieval stopped because the caller cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.error.as_ref().is_some_and(RetrievalError::is_cancelled)
    }

    /// Convert into the payload or the error.
    ///
    /// # Errors
    /// Returns the recorded error when the retrieval failed.
    pub fn into_payload(self) -> Result<Vec<u8>, RetrievalError> {
        if self.success {
            Ok(self.payload)
        } else {
            Err(self.error.unwrap_or(RetrievalError::NoEndpoints))
        }
    }
}
