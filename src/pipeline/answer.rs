//! Answer generation and recommendations.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::fusion::types::{FusionResult, KnowledgeItem};
use crate::pipeline::error::PipelineResult;
use crate::pipeline::question::Question;

/// Answer returned when nothing relevant was found.
pub const INSUFFICIENT_INFORMATION: &str = "I don't have enough information to answer this question yet. \
Could you share more details, such as error messages, the steps you tried, or relevant tags?";

/// Confidence under which more details are requested.
pub const LOW_CONFIDENCE: f64 = 0.5;

/// Source URLs suggested for further reading.
const MAX_READING_LINKS: usize = 3;

const MAX_SUMMARY_CHARS: usize = 200;

/// Text produced by an [`AnswerGenerator`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerDraft {
    /// Full answer.
    pub content: String,
    /// One-paragraph summary.
    pub summary: String,
}

/// Turns fused knowledge into an answer.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    /// Generate an answer for `question` from `fusion`.
    async fn generate(
        &self,
        question: &Question,
        fusion: &FusionResult,
        cancel: &CancellationToken,
    ) -> PipelineResult<AnswerDraft>;
}

/// Deterministic generator quoting the top-ranked knowledge.
#[derive(Clone, Debug)]
pub struct TemplateAnswerGenerator {
    max_items: usize,
    excerpt_chars: usize,
}

impl Default for TemplateAnswerGenerator {
    fn default() -> Self {
        Self {
            max_items: 3,
            excerpt_chars: 280,
        }
    }
}

impl TemplateAnswerGenerator {
    /// Build the answer synchronously.
    #[must_use]
    pub fn render(&self, question: &Question, fusion: &FusionResult) -> AnswerDraft {
        if fusion.is_empty() {
            return match &fusion.context {
                Some(context) => AnswerDraft {
                    content: format!(
                        "I couldn't find documentation matching this question, but earlier in this conversation:\n{context}"
                    ),
                    summary: "No matching documentation; answered from conversation memory.".to_string(),
                },
                None => AnswerDraft {
                    content: INSUFFICIENT_INFORMATION.to_string(),
                    summary: "Insufficient information to answer.".to_string(),
                },
            };
        }

        let subject = if question.title.trim().is_empty() {
            "your question".to_string()
        } else {
            format!("\"{}\"", question.title.trim())
        };

        let mut content = format!("Here is what I found about {subject}:\n");
        for (rank, item) in fusion.items.iter().take(self.max_items).enumerate() {
            content.push_str(&format!("\n{}. {}", rank + 1, self.describe(item)));
        }
        if let Some(context) = &fusion.context {
            content.push_str("\n\n");
            content.push_str(context);
        }

        let summary = fusion
            .items
            .first()
            .map(|item| truncate(&self.describe(item), MAX_SUMMARY_CHARS))
            .unwrap_or_default();

        AnswerDraft { content, summary }
    }

    fn describe(&self, item: &KnowledgeItem) -> String {
        let excerpt = truncate(item.content.trim(), self.excerpt_chars);
        let mut line = match item.title.trim() {
            "" => excerpt,
            title => format!("{title}: {excerpt}"),
        };
        if let Some(url) = &item.url {
            line.push_str(&format!(" ({url})"));
        }
        line
    }
}

#[async_trait]
impl AnswerGenerator for TemplateAnswerGenerator {
    async fn generate(
        &self,
        question: &Question,
        fusion: &FusionResult,
        _cancel: &CancellationToken,
    ) -> PipelineResult<AnswerDraft> {
        Ok(self.render(question, fusion))
    }
}

/// Follow-up suggestions derived from the outcome.
#[must_use]
pub fn recommendations(fusion: &FusionResult, confidence: f64, memory_used: bool) -> Vec<String> {
    let mut out = Vec::new();
    if confidence < LOW_CONFIDENCE {
        out.push("Add more details to the question (error messages, versions, logs) for a more precise answer.".to_string());
    }
    if fusion.is_empty() {
        out.push("Add tags or the steps you already tried so related knowledge can be found.".to_string());
    }
    if memory_used {
        out.push("This answer builds on earlier messages in the conversation; follow up here if it is still unresolved.".to_string());
    }
    out.extend(
        fusion
            .urls()
            .take(MAX_READING_LINKS)
            .map(|url| format!("Further reading: {url}")),
    );
    out
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => format!("{}...", text[..index].trim_end()),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fused(items: Vec<KnowledgeItem>, context: Option<&str>) -> FusionResult {
        FusionResult {
            items,
            fusion_score: 0.8,
            context: context.map(str::to_string),
        }
    }

    #[test]
    fn test_empty_fusion_gives_insufficient_information() {
        let draft = TemplateAnswerGenerator::default().render(&Question::new("a", "b"), &FusionResult::default());
        assert_eq!(draft.content, INSUFFICIENT_INFORMATION);
    }

    #[test]
    fn test_memory_only_answer() {
        let draft = TemplateAnswerGenerator::default()
            .render(&Question::new("a", "b"), &fused(Vec::new(), Some("Relevant memory:\n- [0.80] x")));
        assert!(draft.content.ends_with("- [0.80] x"));
    }

    #[test]
    fn test_answer_quotes_ranked_items() {
        let items = vec![
            KnowledgeItem::new("docs", "Routing", "Register the route first.").with_url("https://docs.example/r"),
            KnowledgeItem::new("docs", "", "Check the gateway logs."),
        ];
        let draft = TemplateAnswerGenerator::default().render(&Question::new("Gateway 404", ""), &fused(items, None));

        assert!(draft.content.starts_with("Here is what I found about \"Gateway 404\":"));
        assert!(draft.content.contains("1. Routing: Register the route first. (https://docs.example/r)"));
        assert!(draft.content.contains("2. Check the gateway logs."));
        assert_eq!(draft.summary, "Routing: Register the route first. (https://docs.example/r)");
    }

    #[test]
    fn test_recommendations() {
        let empty = recommendations(&FusionResult::default(), 0.0, true);
        assert_eq!(empty.len(), 3);

        let items = (0..5)
            .map(|n| KnowledgeItem::new("docs", "t", "c").with_url(format!("https://docs.example/{n}")))
            .collect();
        let confident = recommendations(&fused(items, None), 0.9, false);
        assert_eq!(
            confident,
            vec![
                "Further reading: https://docs.example/0",
                "Further reading: https://docs.example/1",
                "Further reading: https://docs.example/2",
            ]
        );
    }

    #[test]
    fn test_truncate_marks_cut() {
        assert_eq!(truncate("abcdef", 3), "abc...");
        assert_eq!(truncate("abc", 3), "abc");
    }
}
