//! Retrieval queries and session statistics.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::memory::core::ids::{SessionId, UserId};
use crate::memory::core::item::{MemoryItem, normalize_tags};
use crate::memory::core::kinds::MemoryType;

/// Result limit applied when a query asks for zero items.
pub const DEFAULT_LIMIT: usize = 10;

/// Number of context fields joined into the summary.
const SUMMARY_CONTEXTS: usize = 3;

/// A memory retrieval request. All supplied filters are conjunctive.
#[derive(Clone, Debug)]
pub struct MemoryQuery {
    /// Session to search.
    pub session_id: SessionId,
    /// Requesting user (informational).
    pub user_id: Option<UserId>,
    /// Restrict to one tier; `None` searches working memory then short-term.
    pub memory_type: Option<MemoryType>,
    /// Any keyword must appear in content or context (case-insensitive).
    pub keywords: Vec<String>,
    /// At least one tag must be shared with the item.
    pub tags: Vec<String>,
    /// Minimum creation time.
    pub since: Option<DateTime<Utc>>,
    /// Minimum importance.
    pub min_importance: Option<f64>,
    /// Maximum results; `0` means [`DEFAULT_LIMIT`].
    pub limit: usize,
}

impl MemoryQuery {
    /// Query everything in a session.
    #[must_use]
    pub const fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            user_id: None,
            memory_type: None,
            keywords: Vec::new(),
            tags: Vec::new(),
            since: None,
            min_importance: None,
            limit: DEFAULT_LIMIT,
        }
    }

    /// Restrict to one tier.
    #[must_use]
    pub const fn with_type(mut self, memory_type: MemoryType) -> Self {
        self.memory_type = Some(memory_type);
        self
    }

    /// Require any of these keywords.
    #[must_use]
    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    /// Require any of these tags.
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Require creation at or after `since`.
    #[must_use]
    pub const fn created_since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    /// Require a minimum importance.
    #[must_use]
    pub const fn with_min_importance(mut self, min_importance: f64) -> Self {
        self.min_importance = Some(min_importance);
        self
    }

    /// Cap the number of results.
    #[must_use]
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Effective result limit.
    #[must_use]
    pub const fn effective_limit(&self) -> usize {
        if self.limit == 0 {
            DEFAULT_LIMIT
        } else {
            self.limit
        }
    }

    /// Whether the query searches `memory_type`.
    #[must_use]
    pub fn includes(&self, memory_type: MemoryType) -> bool {
        self.memory_type.is_none_or(|wanted| wanted == memory_type)
    }

    pub(crate) fn filter(&self) -> QueryFilter {
        QueryFilter {
            keywords: self
                .keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
            tags: normalize_tags(&self.tags),
            since: self.since,
            min_importance: self.min_importance,
        }
    }
}

/// Normalized form of a query's filters.
pub(crate) struct QueryFilter {
    keywords: Vec<String>,
    tags: BTreeSet<String>,
    since: Option<DateTime<Utc>>,
    min_importance: Option<f64>,
}

impl QueryFilter {
    pub(crate) fn matches(&self, item: &MemoryItem, now: DateTime<Utc>) -> bool {
        if item.is_expired(now) {
            return false;
        }
        if !self.keywords.is_empty() && !item.matches_any_keyword(&self.keywords) {
            return false;
        }
        if !self.tags.is_empty() && !item.has_any_tag(&self.tags) {
            return false;
        }
        if self.since.is_some_and(|since| item.created_at < since) {
            return false;
        }
        if self
            .min_importance
            .is_some_and(|min| item.importance < min)
        {
            return false;
        }
        true
    }
}

/// Items returned by a retrieval plus a short context summary.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RetrievedMemories {
    /// Matches sorted by importance, highest first.
    pub items: Vec<MemoryItem>,
    /// Up to three non-empty contexts joined with `"; "`.
    pub context_summary: String,
}

impl RetrievedMemories {
    /// Build the result, deriving the summary from the items.
    #[must_use]
    pub fn new(items: Vec<MemoryItem>) -> Self {
        let context_summary = items
            .iter()
            .map(|item| item.context.as_str())
            .filter(|context| !context.is_empty())
            .take(SUMMARY_CONTEXTS)
            .collect::<Vec<_>>()
            .join("; ");
        Self {
            items,
            context_summary,
        }
    }

    /// Whether nothing matched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Usage statistics for one session.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryStats {
    /// Session the statistics describe.
    pub session_id: String,
    /// User recorded on the session, if any.
    pub user_id: Option<String>,
    /// Items in working memory.
    pub working_items: usize,
    /// Occupied short-term slots.
    pub short_term_items: usize,
    /// Sum of access counters across both tiers.
    pub total_access_count: u64,
    /// Most recent store or retrieve on either tier.
    pub last_access: Option<DateTime<Utc>>,
    /// `(working items + occupied slots) / (working capacity + slot count)`.
    pub usage_ratio: f64,
}
