//! Importance booster.
//!
//! Raises the importance of units that lexically overlap the concepts the
//! loss analyzer reported missing. This is the only operation that
//! mutates the working graph, and it runs between iterations on the
//! original (uncompressed) graph.

use hashbrown::HashSet;
use tracing::debug;

use crate::model::SemanticGraph;

/// Factor applied when more than [`STRONG_OVERLAP`] of a unit's terms match.
pub const STRONG_BOOST: f64 = 1.5;
/// Factor applied for any smaller, non-empty overlap.
pub const WEAK_BOOST: f64 = 1.2;
/// Overlap ratio above which the strong factor applies.
pub const STRONG_OVERLAP: f64 = 0.3;

const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "all", "any", "can", "had", "her", "was",
    "one", "our", "out", "has", "have", "his", "how", "its", "may", "who", "did", "get", "him",
    "let", "she", "too", "use", "that", "this", "with", "from", "they", "them", "then", "than",
    "there", "their", "these", "those", "what", "when", "where", "which", "while", "will",
    "would", "should", "could", "been", "being", "were", "into", "onto", "over", "under",
    "about", "after", "before", "also", "just", "only", "some", "such", "very", "more", "most",
    "other", "each", "both", "your", "yours", "ours", "does", "doing", "done", "here", "why",
];

pub fn is_stop_word(term: &str) -> bool {
    STOP_WORDS.contains(&term)
}

/// Lowercased whitespace terms, minus stop-words and terms of length <= 2.
pub fn content_terms(text: &str) -> HashSet<String> {
    text.split_whitespace()
        .map(str::to_lowercase)
        .filter(|t| t.chars().count() > 2 && !is_stop_word(t))
        .collect()
}

/// Boost units overlapping `missing_concepts`. Returns how many units had
/// their importance strictly increased.
///
/// Importance never exceeds 1.0; a unit already at 1.0 matches but is not
/// counted.
pub fn boost(graph: &mut SemanticGraph, missing_concepts: &[String]) -> usize {
    if missing_concepts.is_empty() {
        return 0;
    }

    let concept_terms: HashSet<String> = missing_concepts
        .iter()
        .flat_map(|c| content_terms(c))
        .collect();
    if concept_terms.is_empty() {
        return 0;
    }

    let mut boosted = 0;
    for unit in graph.units_mut() {
        let unit_terms = content_terms(&unit.content);
        let shared = unit_terms.intersection(&concept_terms).count();
        if shared == 0 {
            continue;
        }

        let overlap = shared as f64 / unit_terms.len().max(1) as f64;
        let factor = if overlap > STRONG_OVERLAP { STRONG_BOOST } else { WEAK_BOOST };
        let before = unit.importance;
        unit.importance = (unit.importance * factor).min(1.0);

        if unit.importance > before {
            boosted += 1;
            debug!(unit = %unit.id, before, after = unit.importance, overlap, "boosted unit");
        }
    }
    boosted
}
