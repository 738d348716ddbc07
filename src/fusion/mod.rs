//! Fusion and ranking of retrieved knowledge.
//!
//! Scores each knowledge item lexically against the question, keeps the most
//! relevant ones, computes an aggregate fusion score with a source-diversity
//! bonus, and folds memory excerpts into the answer context.

pub mod engine;
pub mod scoring;
pub mod types;

pub use engine::{FusionConfig, FusionEngine, confidence};
pub use scoring::{TAG_MATCH_BONUS, relevance};
pub use types::{FusionResult, KnowledgeItem};
