//! In-process lexical index over a fixed document set.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::fusion::scoring::relevance;
use crate::fusion::types::KnowledgeItem;
use crate::knowledge::source::{KnowledgeError, KnowledgeResult, KnowledgeSource};
use crate::pipeline::question::Question;

/// Source tag of [`LocalIndexSource`] items.
pub const LOCAL_INDEX_SOURCE: &str = "local_index";

/// A document in the local index.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedDocument {
    /// Title.
    pub title: String,
    /// Body.
    pub content: String,
    /// Link.
    #[serde(default)]
    pub url: Option<String>,
    /// Tags.
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Returns documents with a positive lexical match against the question.
#[derive(Clone, Debug)]
pub struct LocalIndexSource {
    name: String,
    documents: Vec<IndexedDocument>,
    max_results: usize,
}

impl LocalIndexSource {
    /// Index `documents`.
    #[must_use]
    pub fn new(documents: Vec<IndexedDocument>) -> Self {
        Self {
            name: LOCAL_INDEX_SOURCE.to_string(),
            documents,
            max_results: 10,
        }
    }

    /// Parse a JSON array of documents.
    ///
    /// # Errors
    /// Returns [`KnowledgeError::Index`] if the JSON is malformed.
    pub fn from_json(json: &str) -> KnowledgeResult<Self> {
        let documents: Vec<IndexedDocument> =
            serde_json::from_str(json).map_err(|e| KnowledgeError::Index(e.to_string()))?;
        Ok(Self::new(documents))
    }

    /// Load a JSON array of documents from disk.
    ///
    /// # Errors
    /// Returns [`KnowledgeError::Index`] if the file cannot be read or parsed.
    pub fn from_json_file(path: impl AsRef<Path>) -> KnowledgeResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| KnowledgeError::Index(format!("{}: {e}", path.display())))?;
        Self::from_json(&raw)
    }

    /// Cap the number of returned items.
    #[must_use]
    pub const fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    /// Number of indexed documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether the index is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn search(&self, question: &Question) -> Vec<KnowledgeItem> {
        let mut hits: Vec<KnowledgeItem> = self
            .documents
            .iter()
            .map(|doc| {
                let mut item = KnowledgeItem::new(self.name.as_str(), doc.title.as_str(), doc.content.as_str())
                    .with_tags(doc.tags.iter().cloned());
                item.url.clone_from(&doc.url);
                item.relevance = relevance(question, &item);
                item
            })
            .filter(|item| item.relevance > 0.0)
            .collect();

        hits.sort_by(|a, b| b.relevance.total_cmp(&a.relevance));
        hits.truncate(self.max_results);
        hits
    }
}

#[async_trait]
impl KnowledgeSource for LocalIndexSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, question: &Question, cancel: &CancellationToken) -> KnowledgeResult<Vec<KnowledgeItem>> {
        if cancel.is_cancelled() {
            return Err(KnowledgeError::Cancelled);
        }
        Ok(self.search(question))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDEX: &str = r#"[
        {"title": "Gateway routing", "content": "A 404 from the gateway means the route is not registered.", "url": "https://docs.example/gateway", "tags": ["gateway"]},
        {"title": "Billing", "content": "Invoices are sent monthly.", "tags": ["billing"]}
    ]"#;

    #[tokio::test]
    async fn test_returns_only_matching_documents() {
        let source = LocalIndexSource::from_json(INDEX).unwrap_or_else(|err| unreachable!("{err}"));
        assert_eq!(source.len(), 2);

        let question = Question::new("Gateway 404", "route not found").with_tags(["gateway"]);
        let items = source
            .fetch(&question, &CancellationToken::new())
            .await
            .unwrap_or_default();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].source, LOCAL_INDEX_SOURCE);
        assert_eq!(items[0].url.as_deref(), Some("https://docs.example/gateway"));
        assert!(items[0].relevance > 0.0);
    }

    #[tokio::test]
    async fn test_cancelled_lookup() {
        let source = LocalIndexSource::new(Vec::new());
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert_eq!(
            source.fetch(&Question::new("a", "b"), &cancel).await,
            Err(KnowledgeError::Cancelled)
        );
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            LocalIndexSource::from_json("{not json"),
            Err(KnowledgeError::Index(_))
        ));
    }

    #[test]
    fn test_max_results() {
        let docs = (0..5)
            .map(|n| IndexedDocument {
                title: format!("cache note {n}"),
                content: "cache".to_string(),
                ..IndexedDocument::default()
            })
            .collect();
        let source = LocalIndexSource::new(docs).with_max_results(2);
        assert_eq!(source.search(&Question::new("", "cache")).len(), 2);
    }
}
