//! Question-processing flow: memory, knowledge, fusion, answer, persistence.

use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::fusion::engine::{FusionEngine, confidence};
use crate::fusion::types::{FusionResult, KnowledgeItem};
use crate::knowledge::source::KnowledgeSource;
use crate::memory::core::ids::{SessionId, UserId};
use crate::memory::core::item::MemoryItem;
use crate::memory::core::kinds::MemoryType;
use crate::memory::core::metadata::MemoryMetadata;
use crate::memory::engine::core::{parse_session, parse_user};
use crate::memory::store::{MemoryQuery, MemoryStore, NewMemory};
use crate::pipeline::answer::{AnswerDraft, AnswerGenerator, TemplateAnswerGenerator, recommendations};
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::question::Question;

/// Pipeline settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Memory items retrieved per question.
    pub memory_limit: usize,
    /// Question keywords used for the memory lookup.
    pub max_keywords: usize,
    /// URL templates for the documentation source (`{query}` placeholder).
    pub documentation_endpoints: Vec<String>,
    /// Text used when every documentation endpoint fails.
    pub fallback_payload: Option<String>,
    /// JSON file of documents for the local index source.
    pub local_index_path: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            memory_limit: 5,
            max_keywords: 8,
            documentation_endpoints: Vec::new(),
            fallback_payload: None,
            local_index_path: None,
        }
    }
}

impl PipelineConfig {
    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if a limit is zero or an endpoint is blank.
    pub fn validate(&self) -> PipelineResult<()> {
        if self.memory_limit == 0 || self.max_keywords == 0 {
            return Err(PipelineError::InvalidConfig(
                "memory_limit and max_keywords must be > 0".to_string(),
            ));
        }
        if self.documentation_endpoints.iter().any(|e| e.trim().is_empty()) {
            return Err(PipelineError::InvalidConfig(
                "documentation endpoints must not be blank".to_string(),
            ));
        }
        Ok(())
    }
}

/// A knowledge item reference included in the answer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    /// Source tag.
    pub source: String,
    /// Title.
    pub title: String,
    /// Link.
    pub url: Option<String>,
    /// Relevance assigned during fusion.
    pub relevance: f64,
}

impl From<&KnowledgeItem> for SourceRef {
    fn from(item: &KnowledgeItem) -> Self {
        Self {
            source: item.source.clone(),
            title: item.title.clone(),
            url: item.url.clone(),
            relevance: item.relevance,
        }
    }
}

/// Result of processing one question.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessedAnswer {
    /// Full answer.
    pub content: String,
    /// Short summary, also stored in short-term memory.
    pub summary: String,
    /// Knowledge used, in rank order.
    pub sources: Vec<SourceRef>,
    /// `0.7 * fusion_score + 0.3 * mean relevance`.
    pub confidence: f64,
    /// Aggregate fusion score.
    pub fusion_score: f64,
    /// Follow-up suggestions.
    pub recommendations: Vec<String>,
    /// Whether conversation memory contributed.
    pub memory_used: bool,
}

/// Orchestrates question processing over injected components.
pub struct Pipeline {
    store: Arc<MemoryStore>,
    sources: Vec<Arc<dyn KnowledgeSource>>,
    fusion: FusionEngine,
    generator: Option<Arc<dyn AnswerGenerator>>,
    template: TemplateAnswerGenerator,
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a pipeline with no knowledge sources and the template generator.
    #[must_use]
    pub fn new(store: Arc<MemoryStore>, fusion: FusionEngine, config: PipelineConfig) -> Self {
        Self {
            store,
            sources: Vec::new(),
            fusion,
            generator: None,
            template: TemplateAnswerGenerator::default(),
            config,
        }
    }

    /// Add a knowledge source.
    #[must_use]
    pub fn with_source(mut self, source: Arc<dyn KnowledgeSource>) -> Self {
        self.sources.push(source);
        self
    }

    /// Use an external answer generator; the template generator remains the fallback.
    #[must_use]
    pub fn with_generator(mut self, generator: Arc<dyn AnswerGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Names of the configured knowledge sources.
    #[must_use]
    pub fn source_names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.name().to_string()).collect()
    }

    /// Answer `question` for a session.
    ///
    /// Source and generator failures degrade the answer; only invalid input
    /// and cancellation are returned as errors.
    ///
    /// # Errors
    /// Returns [`PipelineError::InvalidQuestion`], a memory validation error,
    /// or [`PipelineError::Cancelled`].
    pub async fn process_question(
        &self,
        session_id: &str,
        user_id: Option<&str>,
        question: &Question,
        cancel: &CancellationToken,
    ) -> PipelineResult<ProcessedAnswer> {
        let started = Instant::now();
        if question.is_blank() {
            return Err(PipelineError::InvalidQuestion(
                "title or content is required".to_string(),
            ));
        }
        let session_id = parse_session(session_id)?;
        let user_id = parse_user(user_id)?;
        ensure_active(cancel)?;

        let memories = self.recall(&session_id, question).await;
        let knowledge = self.gather(question, cancel).await?;
        let fusion = self.fusion.fuse(question, knowledge, &memories);
        let confidence = confidence(&fusion);
        let draft = self.answer(question, &fusion, cancel).await?;

        let memory_used = fusion.context.is_some();
        let answer = ProcessedAnswer {
            recommendations: recommendations(&fusion, confidence, memory_used),
            sources: fusion.items.iter().map(SourceRef::from).collect(),
            content: draft.content,
            summary: draft.summary,
            confidence,
            fusion_score: fusion.fusion_score,
            memory_used,
        };

        self.persist(&session_id, user_id.as_ref(), question, &answer).await;

        info!(
            session_id = %session_id,
            sources = answer.sources.len(),
            memories = memories.len(),
            confidence = answer.confidence,
            fusion_score = answer.fusion_score,
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Question processed"
        );
        Ok(answer)
    }

    async fn recall(&self, session_id: &SessionId, question: &Question) -> Vec<MemoryItem> {
        let query = MemoryQuery::new(session_id.clone())
            .with_keywords(question.keywords(self.config.max_keywords))
            .with_min_importance(self.store.config().importance_threshold)
            .with_limit(self.config.memory_limit);
        let retrieved = self.store.retrieve(&query).await;
        debug!(session_id = %session_id, recalled = retrieved.items.len(), "Recalled memory");
        retrieved.items
    }

    async fn gather(&self, question: &Question, cancel: &CancellationToken) -> PipelineResult<Vec<KnowledgeItem>> {
        let lookups = self
            .sources
            .iter()
            .map(|source| async move { (source.name(), source.fetch(question, cancel).await) });

        let mut items = Vec::new();
        for (name, outcome) in join_all(lookups).await {
            match outcome {
                Ok(found) => {
                    debug!(source = name, items = found.len(), "Knowledge source answered");
                    items.extend(found);
                }
                Err(err) if err.is_cancelled() => return Err(PipelineError::Cancelled),
                Err(err) => warn!(source = name, error = %err, "Knowledge source failed, skipping"),
            }
        }
        ensure_active(cancel)?;
        Ok(items)
    }

    async fn answer(
        &self,
        question: &Question,
        fusion: &FusionResult,
        cancel: &CancellationToken,
    ) -> PipelineResult<AnswerDraft> {
        let Some(generator) = &self.generator else {
            return Ok(self.template.render(question, fusion));
        };
        match generator.generate(question, fusion, cancel).await {
            Ok(draft) => Ok(draft),
            Err(PipelineError::Cancelled) => Err(PipelineError::Cancelled),
            Err(err) => {
                warn!(error = %err, "Answer generator failed, using template answer");
                Ok(self.template.render(question, fusion))
            }
        }
    }

    async fn persist(
        &self,
        session_id: &SessionId,
        user_id: Option<&UserId>,
        question: &Question,
        answer: &ProcessedAnswer,
    ) {
        let mut metadata = MemoryMetadata::from_map(question.metadata.clone());
        if let Some(priority) = question.parsed_priority() {
            metadata.priority = Some(priority);
        }
        if let Some(author) = &question.author {
            metadata.extra.insert("author".to_string(), Value::from(author.as_str()));
        }

        let mut asked = NewMemory::new(session_id.clone(), MemoryType::Working, question.text())
            .with_context("question")
            .with_tags(question.tags.iter().cloned())
            .with_metadata(metadata);
        asked.user_id = user_id.cloned();

        let mut answered = NewMemory::new(session_id.clone(), MemoryType::ShortTerm, answer.summary.clone())
            .with_context("answer")
            .with_tags(question.tags.iter().cloned());
        answered.user_id = user_id.cloned();

        for memory in [asked, answered] {
            let memory_type = memory.memory_type;
            if let Err(err) = self.store.store(memory).await {
                warn!(session_id = %session_id, memory_type = %memory_type, error = %err, "Failed to persist exchange");
            }
        }
    }
}

fn ensure_active(cancel: &CancellationToken) -> PipelineResult<()> {
    if cancel.is_cancelled() {
        Err(PipelineError::Cancelled)
    } else {
        Ok(())
    }
}
