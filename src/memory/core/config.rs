//! Configuration for the memory subsystem.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::memory::core::errors::{MemoryError, MemoryResult};

/// Capacity, TTL and sweep settings for both memory tiers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Maximum items kept per working-memory session.
    pub working_memory_max_items: usize,
    /// Idle time after which a working-memory session is dropped.
    #[serde(with = "duration_serde")]
    pub working_memory_ttl: Duration,
    /// Fixed slot count per short-term session.
    pub short_term_memory_slots: usize,
    /// Idle time after which a short-term session is dropped.
    #[serde(with = "duration_serde")]
    pub short_term_memory_ttl: Duration,
    /// Interval between background expiry sweeps.
    #[serde(with = "duration_serde")]
    pub cleanup_interval: Duration,
    /// Minimum importance for memories injected into answers.
    pub importance_threshold: f64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            working_memory_max_items: 50,
            working_memory_ttl: Duration::from_secs(30 * 60),
            short_term_memory_slots: 10,
            short_term_memory_ttl: Duration::from_secs(2 * 60 * 60),
            cleanup_interval: Duration::from_secs(5 * 60),
            importance_threshold: 0.3,
        }
    }
}

impl MemoryConfig {
    /// Set the working-memory capacity.
    #[must_use]
    pub const fn with_working_capacity(mut self, max_items: usize) -> Self {
        self.working_memory_max_items = max_items;
        self
    }

    /// Set the short-term slot count.
    #[must_use]
    pub const fn with_short_term_slots(mut self, slots: usize) -> Self {
        self.short_term_memory_slots = slots;
        self
    }

    /// Set both session TTLs.
    #[must_use]
    pub const fn with_ttls(mut self, working: Duration, short_term: Duration) -> Self {
        self.working_memory_ttl = working;
        self.short_term_memory_ttl = short_term;
        self
    }

    /// Set the sweep interval.
    #[must_use]
    pub const fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }

    /// Total capacity across both tiers for one session.
    #[must_use]
    pub const fn total_capacity(&self) -> usize {
        self.working_memory_max_items + self.short_term_memory_slots
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any values are out of range.
    pub fn validate(&self) -> MemoryResult<()> {
        if self.working_memory_max_items == 0 {
            return Err(MemoryError::InvalidConfig(
                "working_memory_max_items must be > 0".to_string(),
            ));
        }

        if self.short_term_memory_slots == 0 {
            return Err(MemoryError::InvalidConfig(
                "short_term_memory_slots must be > 0".to_string(),
            ));
        }

        if self.working_memory_ttl.is_zero() || self.short_term_memory_ttl.is_zero() {
            return Err(MemoryError::InvalidConfig(
                "memory TTLs must be > 0".to_string(),
            ));
        }

        if self.cleanup_interval.is_zero() {
            return Err(MemoryError::InvalidConfig(
                "cleanup_interval must be > 0".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.importance_threshold) {
            return Err(MemoryError::InvalidConfig(
                "importance_threshold must be in 0.0..=1.0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Durations as whole seconds.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = MemoryConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.total_capacity(), 60);
    }

    #[test]
    fn test_rejects_zero_capacity() {
        let config = MemoryConfig::default().with_working_capacity(0);
        assert!(matches!(config.validate(), Err(MemoryError::InvalidConfig(_))));

        let config = MemoryConfig::default().with_short_term_slots(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_threshold_out_of_range() {
        let config = MemoryConfig {
            importance_threshold: 1.5,
            ..MemoryConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_durations_serialize_as_seconds() {
        let json = serde_json::to_value(MemoryConfig::default()).unwrap_or_default();
        assert_eq!(json["working_memory_ttl"], 1800);
        assert_eq!(json["cleanup_interval"], 300);

        let parsed: Result<MemoryConfig, _> =
            serde_json::from_str(r#"{"short_term_memory_slots": 4, "cleanup_interval": 2}"#);
        let parsed = parsed.unwrap_or_default();
        assert_eq!(parsed.short_term_memory_slots, 4);
        assert_eq!(parsed.cleanup_interval, Duration::from_secs(2));
        assert_eq!(parsed.working_memory_max_items, 50);
    }
}
