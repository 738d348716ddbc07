//! Configuration for the retrieval engine.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::retrieval::error::RetrievalError;

/// Retry, timeout and fallback settings for knowledge retrieval.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Retries after the first attempt; each endpoint gets `max_retries + 1` attempts.
    pub max_retries: u32,
    /// Fixed delay between attempts.
    #[serde(with = "duration_ms")]
    pub retry_delay: Duration,
    /// Per-attempt timeout.
    #[serde(with = "duration_ms")]
    pub timeout: Duration,
    /// User agent sent with every request.
    pub user_agent: String,
    /// Substitute the caller's fallback payload when every endpoint fails.
    pub enable_fallback: bool,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
            timeout: Duration::from_secs(30),
            user_agent: default_user_agent(),
            enable_fallback: true,
        }
    }
}

impl RetrievalConfig {
    /// Create a new config with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the retry budget.
    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the delay between attempts.
    #[must_use]
    pub const fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Set the per-attempt timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Enable or disable the fallback payload.
    #[must_use]
    pub const fn with_fallback(mut self, enabled: bool) -> Self {
        self.enable_fallback = enabled;
        self
    }

    /// Total attempts per endpoint.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if the timeout is zero or the user agent is blank.
    pub fn validate(&self) -> Result<(), RetrievalError> {
        if self.timeout.is_zero() {
            return Err(RetrievalError::InvalidConfig(
                "timeout must be > 0".to_string(),
            ));
        }
        if self.user_agent.trim().is_empty() {
            return Err(RetrievalError::InvalidConfig(
                "user_agent must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_user_agent() -> String {
    format!("community-agent/{}", env!("CARGO_PKG_VERSION"))
}

/// Durations as whole milliseconds.
mod duration_ms {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        u64::try_from(duration.as_millis())
            .unwrap_or(u64::MAX)
            .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RetrievalConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.attempts(), 4);
        assert!(config.enable_fallback);
        assert!(config.user_agent.starts_with("community-agent/"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = RetrievalConfig::new()
            .with_max_retries(1)
            .with_retry_delay(Duration::from_millis(5))
            .with_timeout(Duration::from_secs(2))
            .with_user_agent("probe/1.0")
            .with_fallback(false);

        assert_eq!(config.attempts(), 2);
        assert_eq!(config.retry_delay, Duration::from_millis(5));
        assert_eq!(config.user_agent, "probe/1.0");
        assert!(!config.enable_fallback);
    }

    #[test]
    fn test_rejects_blank_user_agent() {
        let config = RetrievalConfig::default().with_user_agent("  ");
        assert!(matches!(
            config.validate(),
            Err(RetrievalError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_durations_serialize_as_millis() {
        let json = serde_json::to_value(RetrievalConfig::default()).unwrap_or_default();
        assert_eq!(json["retry_delay"], 1000);
        assert_eq!(json["timeout"], 30_000);

        let parsed: RetrievalConfig =
            serde_json::from_str(r#"{"retry_delay": 250}"#).unwrap_or_default();
        assert_eq!(parsed.retry_delay, Duration::from_millis(250));
        assert_eq!(parsed.max_retries, 3);
    }
}
