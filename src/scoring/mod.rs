//! Entropy & importance scoring.
//!
//! Both scores are pure functions of a unit's content (plus the source
//! text for importance). Degenerate input scores 0; nothing here fails.
//!
//! ```text
//! entropy    = H(lowercased chars) × len(content) / 8        (≈ bytes)
//! importance = min(1, base(kind) × (0.5 + 0.5 × specificity) × [1.2 if digits])
//! ```

use hashbrown::{HashMap, HashSet};

use crate::model::{SemanticGraph, SemanticUnit, UnitKind};

/// Multiplier for content that mentions a number.
pub const NUMERIC_BOOST: f64 = 1.2;

/// Structural base weight for each kind.
///
/// Ordering: intent > outcome > constraint > entity > attribute > detail.
pub fn base_weight(kind: UnitKind) -> f64 {
    match kind {
        UnitKind::Intent => 1.0,
        UnitKind::Outcome => 0.9,
        UnitKind::Constraint => 0.85,
        UnitKind::Entity => 0.75,
        UnitKind::Attribute => 0.65,
        UnitKind::Detail => 0.5,
    }
}

/// Character-distribution entropy of `content`, scaled to a byte-cost proxy.
pub fn entropy(content: &str) -> f64 {
    let len = content.chars().count();
    if len == 0 {
        return 0.0;
    }

    let mut counts: HashMap<char, usize> = HashMap::new();
    let mut total = 0usize;
    for c in content.chars().flat_map(char::to_lowercase) {
        *counts.entry(c).or_default() += 1;
        total += 1;
    }

    let total = total as f64;
    let bits: f64 = counts
        .values()
        .map(|&n| {
            let p = n as f64 / total;
            -p * p.log2()
        })
        .sum();

    // A single repeated character yields -0.0; normalize it.
    (bits * len as f64 / 8.0).max(0.0)
}

/// Lowercased whitespace-separated word set.
pub fn word_set(text: &str) -> HashSet<String> {
    text.split_whitespace().map(str::to_lowercase).collect()
}

/// Fraction of the unit's distinct words that also occur in the source.
pub fn specificity(content: &str, source_words: &HashSet<String>) -> f64 {
    let words = word_set(content);
    if words.is_empty() {
        return 0.0;
    }
    let shared = words.iter().filter(|w| source_words.contains(*w)).count();
    shared as f64 / words.len() as f64
}

/// Importance of a unit relative to its source text, in [0, 1].
pub fn importance(unit: &SemanticUnit, source_text: &str) -> f64 {
    importance_with_words(unit, &word_set(source_text))
}

/// Same as [`importance`] with the source word set precomputed.
pub fn importance_with_words(unit: &SemanticUnit, source_words: &HashSet<String>) -> f64 {
    let mut score = base_weight(unit.kind) * (0.5 + 0.5 * specificity(&unit.content, source_words));
    if unit.content.chars().any(|c| c.is_ascii_digit()) {
        score *= NUMERIC_BOOST;
    }
    score.min(1.0)
}

/// Score every unit in `graph` against its own source text.
///
/// Sets entropy and importance. Ingestion calls this exactly once; after
/// that only the booster touches importance.
pub fn score_graph(graph: &mut SemanticGraph) {
    let source_words = word_set(graph.source_text());
    for unit in graph.units_mut() {
        unit.entropy = entropy(&unit.content);
        unit.importance = importance_with_words(unit, &source_words);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_entropy_empty_is_zero() {
        assert_eq!(entropy(""), 0.0);
    }

    #[test]
    fn test_entropy_uniform_repeat_is_zero() {
        assert_eq!(entropy("aaaa"), 0.0);
        assert_eq!(entropy("AaAa"), 0.0);
    }

    #[test]
    fn test_entropy_two_symbols() {
        // H = 1 bit, len 4 → 4 × 1 / 8
        assert!(close(entropy("abab"), 0.5));
    }

    #[test]
    fn test_entropy_case_folded() {
        assert!(close(entropy("AbAb"), entropy("abab")));
    }

    #[test]
    fn test_entropy_grows_with_length() {
        assert!(entropy("enterprise segment revenue") > entropy("enterprise"));
    }

    #[test]
    fn test_importance_full_specificity() {
        let unit = SemanticUnit::new("e", UnitKind::Entity, "Acme Corp");
        assert!(close(importance(&unit, "acme corp reported results"), 0.75));
    }

    #[test]
    fn test_importance_no_overlap_halves_base() {
        let unit = SemanticUnit::new("d", UnitKind::Detail, "unrelated words");
        assert!(close(importance(&unit, "something else entirely"), 0.25));
    }

    #[test]
    fn test_importance_numeric_boost() {
        let unit = SemanticUnit::new("a", UnitKind::Attribute, "23% decline");
        // specificity 1.0 → 0.65 × 1.2
        assert!(close(importance(&unit, "a 23% decline overall"), 0.78));
    }

    #[test]
    fn test_numeric_boost_only_for_ascii_digits() {
        let unit = SemanticUnit::new("a", UnitKind::Attribute, "½ share Ⅻ");
        assert!(close(importance(&unit, "½ share Ⅻ"), 0.65));
    }

    #[test]
    fn test_importance_clamped() {
        let unit = SemanticUnit::new("i", UnitKind::Intent, "ship v2");
        assert!(close(importance(&unit, "ship v2 now"), 1.0));
    }

    #[test]
    fn test_importance_empty_content() {
        let unit = SemanticUnit::new("x", UnitKind::Outcome, "");
        assert!(close(importance(&unit, "anything"), 0.45));
    }

    #[test]
    fn test_base_weight_ordering() {
        let order = [
            UnitKind::Intent,
            UnitKind::Outcome,
            UnitKind::Constraint,
            UnitKind::Entity,
            UnitKind::Attribute,
            UnitKind::Detail,
        ];
        for pair in order.windows(2) {
            assert!(base_weight(pair[0]) > base_weight(pair[1]));
        }
    }

    #[test]
    fn test_score_graph_sets_both_scores() {
        let mut g = SemanticGraph::for_source("Review the 2024 budget", 4);
        g.add_unit(SemanticUnit::new("i", UnitKind::Intent, "review"));
        g.add_unit(SemanticUnit::new("a", UnitKind::Attribute, "2024 budget"));
        score_graph(&mut g);
        for unit in g.units() {
            assert!(unit.entropy > 0.0);
            assert!(unit.importance > 0.0 && unit.importance <= 1.0);
        }
    }
}
