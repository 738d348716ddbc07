//! Metadata attached to stored memory items.
//!
//! The only key the store interprets is `priority`; every other key is carried
//! through untouched in an opaque bag.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Metadata key holding the priority hint.
pub const PRIORITY_KEY: &str = "priority";

/// Priority hint supplied by the caller when storing a memory.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Boosts importance by 0.3.
    High,
    /// Boosts importance by 0.1.
    Medium,
    /// Lowers importance by 0.1.
    Low,
}

impl Priority {
    /// Importance adjustment applied for this hint.
    #[must_use]
    pub const fn importance_bias(self) -> f64 {
        match self {
            Self::High => 0.3,
            Self::Medium => 0.1,
            Self::Low => -0.1,
        }
    }

    /// Stable identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" | "urgent" => Ok(Self::High),
            "medium" | "normal" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            other => Err(format!("unknown priority: {other}")),
        }
    }
}

/// Metadata for a memory item.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryMetadata {
    /// Optional priority hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    /// Pass-through values the store never inspects.
    #[serde(default, flatten)]
    pub extra: HashMap<String, Value>,
}

impl MemoryMetadata {
    /// Metadata with only a priority hint.
    #[must_use]
    pub fn with_priority(priority: Priority) -> Self {
        Self {
            priority: Some(priority),
            extra: HashMap::new(),
        }
    }

    /// Split a raw JSON map into the typed hint and the opaque remainder.
    ///
    /// An unparseable `priority` value is kept in the opaque bag instead of
    /// being dropped.
    #[must_use]
    pub fn from_map(mut raw: HashMap<String, Value>) -> Self {
        let priority = match raw.get(PRIORITY_KEY) {
            Some(Value::String(value)) => value.parse::<Priority>().ok(),
            _ => None,
        };
        if priority.is_some() {
            raw.remove(PRIORITY_KEY);
        }
        Self {
            priority,
            extra: raw,
        }
    }

    /// Importance adjustment contributed by the metadata.
    #[must_use]
    pub fn importance_bias(&self) -> f64 {
        self.priority.map_or(0.0, Priority::importance_bias)
    }

    /// Merge another metadata set into this one, newer values winning.
    pub fn merge(&mut self, other: Self) {
        if other.priority.is_some() {
            self.priority = other.priority;
        }
        self.extra.extend(other.extra);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_priority_bias() {
        assert!((Priority::High.importance_bias() - 0.3).abs() < f64::EPSILON);
        assert!((Priority::Medium.importance_bias() - 0.1).abs() < f64::EPSILON);
        assert!((Priority::Low.importance_bias() + 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn test_from_map_extracts_priority() {
        let mut raw = HashMap::new();
        raw.insert("priority".to_string(), json!("HIGH"));
        raw.insert("channel".to_string(), json!("forum"));

        let metadata = MemoryMetadata::from_map(raw);
        assert_eq!(metadata.priority, Some(Priority::High));
        assert_eq!(metadata.extra.get("channel"), Some(&json!("forum")));
        assert!(!metadata.extra.contains_key("priority"));
    }

    #[test]
    fn test_from_map_keeps_unknown_priority_opaque() {
        let mut raw = HashMap::new();
        raw.insert("priority".to_string(), json!(7));

        let metadata = MemoryMetadata::from_map(raw);
        assert_eq!(metadata.priority, None);
        assert_eq!(metadata.extra.get("priority"), Some(&json!(7)));
        assert!(metadata.importance_bias().abs() < f64::EPSILON);
    }

    #[test]
    fn test_merge_prefers_newer_values() {
        let mut base = MemoryMetadata::with_priority(Priority::Low);
        let mut newer = MemoryMetadata::default();
        newer.extra.insert("k".to_string(), json!(1));
        base.merge(newer);
        assert_eq!(base.priority, Some(Priority::Low));
        assert_eq!(base.extra.len(), 1);
    }
}
