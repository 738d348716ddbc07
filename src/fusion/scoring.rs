//! Lexical relevance between a question and a knowledge item.

use crate::fusion::types::KnowledgeItem;
use crate::memory::core::item::clamp_unit;
use crate::pipeline::question::{MIN_TOKEN_LEN, Question, tokenize};

/// Bonus per tag shared between question and item.
pub const TAG_MATCH_BONUS: f64 = 0.2;

/// Relevance of `item` to `question`, in `[0, 1]`.
///
/// Question tokens longer than two characters that share a substring
/// relation (either direction) with an item token are counted and divided by
/// the total number of question tokens. Each shared tag adds
/// [`TAG_MATCH_BONUS`].
#[must_use]
pub fn relevance(question: &Question, item: &KnowledgeItem) -> f64 {
    let question_tokens = tokenize(&question.text());
    let item_tokens: Vec<String> = tokenize(&item.text())
        .into_iter()
        .filter(|token| is_meaningful(token))
        .collect();

    let lexical = if question_tokens.is_empty() {
        0.0
    } else {
        let matched = question_tokens
            .iter()
            .filter(|token| is_meaningful(token))
            .filter(|token| {
                item_tokens
                    .iter()
                    .any(|other| other.contains(token.as_str()) || token.contains(other.as_str()))
            })
            .count();
        ratio(matched, question_tokens.len())
    };

    clamp_unit(lexical + tag_bonus(question, item))
}

fn tag_bonus(question: &Question, item: &KnowledgeItem) -> f64 {
    let question_tags = question.normalized_tags();
    let shared = item
        .tags
        .iter()
        .map(|tag| tag.trim().to_lowercase())
        .filter(|tag| question_tags.contains(tag))
        .count();
    TAG_MATCH_BONUS * f64::from(u32::try_from(shared).unwrap_or(u32::MAX))
}

fn is_meaningful(token: &str) -> bool {
    token.chars().count() >= MIN_TOKEN_LEN
}

fn ratio(part: usize, whole: usize) -> f64 {
    let part = u32::try_from(part).unwrap_or(u32::MAX);
    let whole = u32::try_from(whole).unwrap_or(u32::MAX);
    f64::from(part) / f64::from(whole)
}
