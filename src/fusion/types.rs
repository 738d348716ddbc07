//! Knowledge items and fusion results.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A piece of retrieved knowledge. `relevance` is assigned during fusion.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeItem {
    /// Source tag (`local_index`, `documentation`, ...).
    pub source: String,
    /// Title.
    #[serde(default)]
    pub title: String,
    /// Body text.
    #[serde(default)]
    pub content: String,
    /// Link to the original.
    #[serde(default)]
    pub url: Option<String>,
    /// Lexical relevance against the question, in `[0, 1]`.
    #[serde(default)]
    pub relevance: f64,
    /// Tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Pass-through metadata.
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl KnowledgeItem {
    /// Create an unscored item.
    #[must_use]
    pub fn new(source: impl Into<String>, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            title: title.into(),
            content: content.into(),
            ..Self::default()
        }
    }

    /// Set the URL.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Attach tags.
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Add one metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Title and content joined by a space.
    #[must_use]
    pub fn text(&self) -> String {
        format!("{} {}", self.title, self.content)
    }
}

/// Ranked, truncated knowledge plus an aggregate score.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FusionResult {
    /// Items sorted by relevance, highest first.
    pub items: Vec<KnowledgeItem>,
    /// Average relevance plus source-diversity bonus, in `[0, 1]`.
    pub fusion_score: f64,
    /// Memory excerpts folded into the answer context, when any were supplied.
    pub context: Option<String>,
}

impl FusionResult {
    /// Whether no knowledge survived ranking.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Mean relevance of the retained items, `0` when empty.
    #[must_use]
    pub fn mean_relevance(&self) -> f64 {
        mean(self.items.iter().map(|item| item.relevance))
    }

    /// Number of distinct source tags among the retained items.
    #[must_use]
    pub fn distinct_sources(&self) -> usize {
        self.items
            .iter()
            .map(|item| item.source.as_str())
            .collect::<BTreeSet<_>>()
            .len()
    }

    /// URLs of the retained items, in rank order.
    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.items.iter().filter_map(|item| item.url.as_deref())
    }
}

pub(crate) fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0_u32), |(sum, count), value| (sum + value, count + 1));
    if count == 0 { 0.0 } else { sum / f64::from(count) }
}
