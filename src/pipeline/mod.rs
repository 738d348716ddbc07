//! Question-processing pipeline.
//!
//! Sequences memory recall, concurrent knowledge lookups, fusion, answer
//! generation and persistence of the exchange back into memory.

pub mod answer;
pub mod error;
pub mod orchestrator;
pub mod question;

pub use answer::{AnswerDraft, AnswerGenerator, INSUFFICIENT_INFORMATION, TemplateAnswerGenerator, recommendations};
pub use error::{PipelineError, PipelineResult};
pub use orchestrator::{Pipeline, PipelineConfig, ProcessedAnswer, SourceRef};
pub use question::Question;
