//! Incoming question payload.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::memory::core::metadata::Priority;

/// Minimum token length considered meaningful for matching.
pub const MIN_TOKEN_LEN: usize = 3;

/// A community-support question.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// Short title.
    #[serde(default)]
    pub title: String,
    /// Full body.
    #[serde(default)]
    pub content: String,
    /// Author handle.
    #[serde(default)]
    pub author: Option<String>,
    /// Free-form category (`bug`, `how-to`, ...).
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    /// Priority hint (`high`, `medium`, `low`).
    #[serde(default)]
    pub priority: Option<String>,
    /// Tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Pass-through metadata.
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl Question {
    /// Create a question from a title and body.
    #[must_use]
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            ..Self::default()
        }
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

    /// Set the priority hint.
    #[must_use]
    pub fn with_priority(mut self, priority: impl Into<String>) -> Self {
        self.priority = Some(priority.into());
        self
    }

    /// Whether both title and body are blank.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.title.trim().is_empty() && self.content.trim().is_empty()
    }

    /// Title and body joined by a space.
    #[must_use]
    pub fn text(&self) -> String {
        match (self.title.trim(), self.content.trim()) {
            ("", body) => body.to_string(),
            (title, "") => title.to_string(),
            (title, body) => format!("{title} {body}"),
        }
    }

    /// Parsed priority hint; unknown values are ignored.
    #[must_use]
    pub fn parsed_priority(&self) -> Option<Priority> {
        self.priority.as_deref().and_then(|raw| raw.parse().ok())
    }

    /// Lowercased tags.
    #[must_use]
    pub fn normalized_tags(&self) -> BTreeSet<String> {
        self.tags
            .iter()
            .map(|tag| tag.trim().to_lowercase())
            .filter(|tag| !tag.is_empty())
            .collect()
    }

    /// Distinct meaningful words of the question, in order of appearance.
    #[must_use]
    pub fn keywords(&self, max: usize) -> Vec<String> {
        let mut seen = BTreeSet::new();
        self.text()
            .split(|c: char| !c.is_alphanumeric())
            .map(str::to_lowercase)
            .filter(|word| word.chars().count() >= MIN_TOKEN_LEN)
            .filter(|word| seen.insert(word.clone()))
            .take(max)
            .collect()
    }
}

/// Lowercased whitespace tokens.
#[must_use]
pub fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_lowercase).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_joins_title_and_body() {
        assert_eq!(Question::new("Gateway 404", "route not found").text(), "Gateway 404 route not found");
        assert_eq!(Question::new("", "only body").text(), "only body");
        assert!(Question::new(" ", "").is_blank());
    }

    #[test]
    fn test_keywords_are_distinct_and_bounded() {
        let question = Question::new("Deploy fails", "deploy fails on CI: timeout at step 3");
        assert_eq!(question.keywords(3), vec!["deploy", "fails", "timeout"]);
    }

    #[test]
    fn test_priority_hint_parsing() {
        assert_eq!(Question::default().with_priority("urgent").parsed_priority(), Some(Priority::High));
        assert_eq!(Question::default().with_priority("someday").parsed_priority(), None);
    }

    #[test]
    fn test_deserializes_type_field() {
        let question: Question =
            serde_json::from_str(r#"{"title":"t","content":"c","type":"bug","tags":["x"]}"#)
                .unwrap_or_default();
        assert_eq!(question.kind.as_deref(), Some("bug"));
        assert_eq!(question.tags, vec!["x".to_string()]);
    }
}
