//! Ranking, truncation and memory blending.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::fusion::scoring::relevance;
use crate::fusion::types::{FusionResult, KnowledgeItem};
use crate::memory::core::item::{MemoryItem, clamp_unit};
use crate::pipeline::question::Question;

/// Fusion settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    /// Knowledge items kept after ranking.
    pub max_sources: usize,
    /// Memory items folded into the context.
    pub memory_excerpts: usize,
    /// Bonus per distinct source beyond the first.
    pub diversity_bonus: f64,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            max_sources: 5,
            memory_excerpts: 3,
            diversity_bonus: 0.1,
        }
    }
}

impl FusionConfig {
    /// Set the number of retained sources.
    #[must_use]
    pub const fn with_max_sources(mut self, max_sources: usize) -> Self {
        self.max_sources = max_sources;
        self
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns a message describing the first invalid value.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_sources == 0 {
            return Err("max_sources must be > 0".to_string());
        }
        if !(0.0..=1.0).contains(&self.diversity_bonus) {
            return Err("diversity_bonus must be in 0.0..=1.0".to_string());
        }
        Ok(())
    }
}

/// Merges retrieved knowledge with memory context into one scored result.
#[derive(Clone, Debug, Default)]
pub struct FusionEngine {
    config: FusionConfig,
}

impl FusionEngine {
    /// Create an engine.
    #[must_use]
    pub const fn new(config: FusionConfig) -> Self {
        Self { config }
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &FusionConfig {
        &self.config
    }

    /// Score, rank and truncate `items`, then fold in `memories`.
    #[must_use]
    pub fn fuse(&self, question: &Question, items: Vec<KnowledgeItem>, memories: &[MemoryItem]) -> FusionResult {
        let candidates = items.len();
        let mut items: Vec<KnowledgeItem> = items
            .into_iter()
            .map(|mut item| {
                item.relevance = relevance(question, &item);
                item
            })
            .collect();

        // Stable: ties keep their input order.
        items.sort_by(|a, b| b.relevance.total_cmp(&a.relevance));
        items.truncate(self.config.max_sources);

        let mut result = FusionResult {
            items,
            fusion_score: 0.0,
            context: memory_context(memories, self.config.memory_excerpts),
        };
        result.fusion_score = self.fusion_score(&result);

        debug!(
            candidates,
            kept = result.items.len(),
            fusion_score = result.fusion_score,
            memories = memories.len(),
            "Fused knowledge"
        );
        result
    }

    fn fusion_score(&self, result: &FusionResult) -> f64 {
        if result.is_empty() {
            return 0.0;
        }
        let extra_sources = u32::try_from(result.distinct_sources().saturating_sub(1)).unwrap_or(u32::MAX);
        clamp_unit(result.mean_relevance() + self.config.diversity_bonus * f64::from(extra_sources))
    }
}

/// `0.7 * fusion_score + 0.3 * mean relevance`, clamped; `0` without knowledge.
#[must_use]
pub fn confidence(result: &FusionResult) -> f64 {
    if result.is_empty() {
        return 0.0;
    }
    clamp_unit(0.7 * result.fusion_score + 0.3 * result.mean_relevance())
}

fn memory_context(memories: &[MemoryItem], limit: usize) -> Option<String> {
    if memories.is_empty() || limit == 0 {
        return None;
    }
    let mut ranked: Vec<&MemoryItem> = memories.iter().collect();
    ranked.sort_by(|a, b| b.importance.total_cmp(&a.importance));

    let lines: Vec<String> = ranked
        .into_iter()
        .take(limit)
        .map(|memory| format!("- [{:.2}] {}", memory.importance, memory.content))
        .collect();
    Some(format!("Relevant memory:\n{}", lines.join("\n")))
}
