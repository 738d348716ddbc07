//! Importance scoring for newly stored memories.

use crate::memory::core::item::clamp_unit;
use crate::memory::core::metadata::MemoryMetadata;

/// Importance every memory starts from.
pub const BASE_IMPORTANCE: f64 = 0.4;

/// Content length (in chars) that earns the full length bonus.
const FULL_LENGTH_CHARS: f64 = 500.0;
/// Maximum bonus for long content.
const MAX_LENGTH_BONUS: f64 = 0.2;
/// Bonus per tag.
const TAG_BONUS: f64 = 0.05;
/// Maximum bonus for tags.
const MAX_TAG_BONUS: f64 = 0.2;

/// Compute an importance score from content length, tag count and the
/// optional priority hint, clamped to `0.0..=1.0`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn compute_importance(content: &str, tag_count: usize, metadata: &MemoryMetadata) -> f64 {
    let chars = content.trim().chars().count() as f64;
    let length_bonus = (chars / FULL_LENGTH_CHARS).min(1.0) * MAX_LENGTH_BONUS;
    let tag_bonus = (tag_count as f64 * TAG_BONUS).min(MAX_TAG_BONUS);

    clamp_unit(BASE_IMPORTANCE + length_bonus + tag_bonus + metadata.importance_bias())
}
