//! Memory item model with validation helpers.

use std::collections::BTreeSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::memory::core::errors::{MemoryError, MemoryResult};
use crate::memory::core::ids::MemoryId;
use crate::memory::core::kinds::MemoryType;
use crate::memory::core::metadata::MemoryMetadata;

/// A stored conversational fact.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MemoryItem {
    /// Unique memory identifier.
    pub id: MemoryId,
    /// Tier the item lives in.
    pub memory_type: MemoryType,
    /// Memory content.
    pub content: String,
    /// Free-text context (e.g. `question`, `answer`).
    pub context: String,
    /// Importance score in `0.0..=1.0`.
    pub importance: f64,
    /// Number of times the item was stored again or retrieved.
    pub access_count: u32,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
    /// Instant after which the item is logically dead.
    pub expires_at: Option<DateTime<Utc>>,
    /// Normalized tag set.
    pub tags: BTreeSet<String>,
    /// Typed hint plus opaque pass-through values.
    pub metadata: MemoryMetadata,
}

impl MemoryItem {
    /// Create a new memory item.
    ///
    /// Importance is clamped into `0.0..=1.0`; tags are trimmed and lowercased.
    ///
    /// # Errors
    /// Returns an error if content is empty after trimming.
    pub fn new(
        memory_type: MemoryType,
        content: impl Into<String>,
        context: impl Into<String>,
        importance: f64,
        now: DateTime<Utc>,
    ) -> MemoryResult<Self> {
        let content = content.into();
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(MemoryError::InvalidMemoryItem(
                "content is empty".to_string(),
            ));
        }

        Ok(Self {
            id: MemoryId::new(),
            memory_type,
            content: trimmed.to_string(),
            context: context.into().trim().to_string(),
            importance: clamp_unit(importance),
            access_count: 0,
            created_at: now,
            updated_at: now,
            expires_at: None,
            tags: BTreeSet::new(),
            metadata: MemoryMetadata::default(),
        })
    }

    /// Attach tags, normalizing each one.
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags = normalize_tags(tags);
        self
    }

    /// Attach metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: MemoryMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Expire the item `ttl` after `now`.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration, now: DateTime<Utc>) -> Self {
        self.expires_at = expiry_after(now, ttl);
        self
    }

    /// Whether the item is logically dead at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }

    /// Record an access.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.access_count = self.access_count.saturating_add(1);
        self.updated_at = now;
    }

    /// Slot priority: `importance * 100 + access_count`, truncated.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn slot_priority(&self) -> i64 {
        (self.importance * 100.0) as i64 + i64::from(self.access_count)
    }

    /// Whether content or context contains any keyword (case-insensitive).
    ///
    /// Keywords must already be lowercased.
    #[must_use]
    pub fn matches_any_keyword(&self, keywords: &[String]) -> bool {
        let content = self.content.to_lowercase();
        let context = self.context.to_lowercase();
        keywords
            .iter()
            .any(|keyword| content.contains(keyword.as_str()) || context.contains(keyword.as_str()))
    }

    /// Whether the item carries at least one of the (normalized) tags.
    #[must_use]
    pub fn has_any_tag(&self, tags: &BTreeSet<String>) -> bool {
        !self.tags.is_disjoint(tags)
    }
}

/// Trim, lowercase and dedupe tags, dropping blanks.
#[must_use]
pub fn normalize_tags<I, S>(tags: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tags.into_iter()
        .map(|tag| tag.as_ref().trim().to_lowercase())
        .filter(|tag| !tag.is_empty())
        .collect()
}

/// Clamp a score into `0.0..=1.0`, mapping NaN to zero.
#[must_use]
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// `now + ttl`, or `None` if the TTL does not fit a chrono duration.
#[must_use]
pub fn expiry_after(now: DateTime<Utc>, ttl: Duration) -> Option<DateTime<Utc>> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| now.checked_add_signed(ttl))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_blank_content() {
        let item = MemoryItem::new(MemoryType::Working, "   ", "", 0.5, Utc::now());
        assert!(matches!(item, Err(MemoryError::InvalidMemoryItem(_))));
    }

    #[test]
    fn test_new_clamps_importance() {
        let now = Utc::now();
        let high = MemoryItem::new(MemoryType::Working, "a", "", 3.0, now);
        let low = MemoryItem::new(MemoryType::Working, "a", "", -1.0, now);
        assert_eq!(high.map(|i| i.importance).ok(), Some(1.0));
        assert_eq!(low.map(|i| i.importance).ok(), Some(0.0));
    }

    #[test]
    fn test_slot_priority_combines_importance_and_access() {
        let now = Utc::now();
        let Ok(mut item) = MemoryItem::new(MemoryType::ShortTerm, "fact", "", 0.42, now) else {
            return;
        };
        assert_eq!(item.slot_priority(), 42);
        item.touch(now);
        item.touch(now);
        assert_eq!(item.slot_priority(), 44);
    }

    #[test]
    fn test_expiry_is_inclusive_of_deadline() {
        let now = Utc::now();
        let Ok(item) = MemoryItem::new(MemoryType::Working, "fact", "", 0.5, now) else {
            return;
        };
        let item = item.with_ttl(Duration::from_secs(10), now);
        assert!(!item.is_expired(now));
        assert!(item.is_expired(now + chrono::Duration::seconds(10)));
    }

    #[test]
    fn test_keyword_and_tag_matching() {
        let now = Utc::now();
        let Ok(item) = MemoryItem::new(MemoryType::Working, "Gateway returns 404", "Routing", 0.5, now)
        else {
            return;
        };
        let item = item.with_tags([" Gateway ", "", "API"]);
        assert_eq!(item.tags.len(), 2);
        assert!(item.matches_any_keyword(&["routing".to_string()]));
        assert!(!item.matches_any_keyword(&["billing".to_string()]));
        assert!(item.has_any_tag(&normalize_tags(["api"])));
        assert!(!item.has_any_tag(&normalize_tags(["billing"])));
    }
}
