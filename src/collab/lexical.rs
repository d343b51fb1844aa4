//! Lexical reference collaborators.
//!
//! Deterministic, offline stand-ins for the model-backed collaborators.
//! They are crude (bag-of-words, cue words) but honour every contract, so
//! the controller can run end to end in tests and without network access.

use async_trait::async_trait;
use hashbrown::{HashMap, HashSet};

use crate::boost::is_stop_word;
use crate::model::{SemanticGraph, UnitKind};
use crate::Result;
use super::ingest::relation_label;
use super::prompt::ReconstructionRequest;
use super::{
    ExtractedRelation, ExtractedStructure, ExtractedUnit, FidelityJudge, LossAnalyzer,
    Reconstructor, StructureExtractor,
};

// ============================================================================
// Text helpers
// ============================================================================

/// Split on `.`, `!`, `?` followed by whitespace (or end of text) and on
/// newlines. Decimal points such as `3.5` do not split.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\n' {
            push_sentence(&mut sentences, &mut current);
            continue;
        }
        current.push(c);
        if matches!(c, '.' | '!' | '?') && chars.peek().is_none_or(|n| n.is_whitespace()) {
            push_sentence(&mut sentences, &mut current);
        }
    }
    push_sentence(&mut sentences, &mut current);
    sentences
}

fn push_sentence(out: &mut Vec<String>, current: &mut String) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
    current.clear();
}

/// Normalized content words: lowercased, edge punctuation trimmed (except
/// `%`), stop-words and words of two characters or fewer removed.
pub fn words(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric() && c != '%')
                .to_lowercase()
        })
        .filter(|w| w.chars().count() > 2 && !is_stop_word(w))
        .collect()
}

// ============================================================================
// SentenceExtractor
// ============================================================================

const CONSTRAINT_CUES: &[&str] = &[
    "must", "need", "needs", "required", "require", "requires", "deadline", "cannot", "limit",
    "only", "before", "until", "no later",
];
const OUTCOME_CUES: &[&str] = &[
    "goal", "expect", "expected", "outcome", "result", "results", "so that", "aim", "want",
    "hope", "deliver",
];

fn has_cue(lower: &str, cues: &[&str]) -> bool {
    cues.iter().any(|cue| {
        if cue.contains(' ') {
            lower.contains(cue)
        } else {
            lower.split(|c: char| !c.is_alphanumeric()).any(|w| w == *cue)
        }
    })
}

/// Classify a non-leading sentence by cue words.
pub fn classify_sentence(sentence: &str) -> UnitKind {
    let lower = sentence.to_lowercase();
    if has_cue(&lower, CONSTRAINT_CUES) {
        UnitKind::Constraint
    } else if has_cue(&lower, OUTCOME_CUES) {
        UnitKind::Outcome
    } else if sentence.chars().any(|c| c.is_ascii_digit()) {
        UnitKind::Attribute
    } else {
        UnitKind::Detail
    }
}

/// One unit per sentence plus one per capitalized name.
///
/// The first sentence is the intent and the root; every other unit hangs
/// off it with the conventional relation label for its kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct SentenceExtractor;

impl SentenceExtractor {
    pub fn extract_sync(&self, text: &str) -> ExtractedStructure {
        let sentences = split_sentences(text);
        let mut structure = ExtractedStructure::default();
        let Some((first, rest)) = sentences.split_first() else {
            return structure;
        };

        structure.units.push(ExtractedUnit::new("intent", first.clone()).with_id("s0"));
        for (n, sentence) in rest.iter().enumerate() {
            let id = format!("s{}", n + 1);
            let kind = classify_sentence(sentence);
            structure.units.push(ExtractedUnit::new(kind.as_str(), sentence.clone()).with_id(id.clone()));
            structure.relations.push(ExtractedRelation::new("s0", id, relation_label(kind)));
        }

        for (n, name) in capitalized_names(&sentences).into_iter().enumerate() {
            let id = format!("e{n}");
            structure.units.push(ExtractedUnit::new("entity", name).with_id(id.clone()));
            structure.relations.push(ExtractedRelation::new("s0", id, relation_label(UnitKind::Entity)));
        }
        structure
    }
}

/// Capitalized words that do not open a sentence, deduplicated in order.
fn capitalized_names(sentences: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut names = Vec::new();
    for sentence in sentences {
        for word in sentence.split_whitespace().skip(1) {
            let word = word.trim_matches(|c: char| !c.is_alphanumeric());
            let starts_upper = word.chars().next().is_some_and(char::is_uppercase);
            if starts_upper && word.chars().count() > 1 && seen.insert(word.to_string()) {
                names.push(word.to_string());
            }
        }
    }
    names
}

#[async_trait]
impl StructureExtractor for SentenceExtractor {
    async fn extract(&self, text: &str) -> Result<ExtractedStructure> {
        Ok(self.extract_sync(text))
    }
}

// ============================================================================
// TemplateReconstructor
// ============================================================================

/// Joins every retained unit's content into sentences, kind by kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateReconstructor;

#[async_trait]
impl Reconstructor for TemplateReconstructor {
    async fn reconstruct(&self, graph: &SemanticGraph) -> Result<String> {
        let request = ReconstructionRequest::from_graph(graph);
        let sentences: Vec<String> = request
            .items()
            .map(|item| {
                if item.ends_with(['.', '!', '?']) {
                    item.to_string()
                } else {
                    format!("{item}.")
                }
            })
            .collect();
        Ok(sentences.join(" "))
    }
}

// ============================================================================
// LexicalJudge
// ============================================================================

/// Cosine similarity of content-word frequency vectors.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexicalJudge;

impl LexicalJudge {
    pub fn similarity(original: &str, candidate: &str) -> f64 {
        let a = frequencies(original);
        let b = frequencies(candidate);
        if a.is_empty() && b.is_empty() {
            return if original.trim() == candidate.trim() { 1.0 } else { 0.0 };
        }
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }

        let dot: f64 = a
            .iter()
            .filter_map(|(w, &x)| b.get(w).map(|&y| x * y))
            .sum();
        let norm = |m: &HashMap<String, f64>| m.values().map(|v| v * v).sum::<f64>().sqrt();
        (dot / (norm(&a) * norm(&b))).clamp(0.0, 1.0)
    }
}

fn frequencies(text: &str) -> HashMap<String, f64> {
    let mut freq = HashMap::new();
    for w in words(text) {
        *freq.entry(w).or_insert(0.0) += 1.0;
    }
    freq
}

#[async_trait]
impl FidelityJudge for LexicalJudge {
    async fn score(&self, original: &str, candidate: &str) -> Result<f64> {
        Ok(Self::similarity(original, candidate))
    }
}

// ============================================================================
// LexicalLossAnalyzer
// ============================================================================

/// Reports source sentences whose content words are mostly absent from the
/// candidate.
#[derive(Debug, Clone)]
pub struct LexicalLossAnalyzer {
    /// A sentence is missing when less than this share of its words survive.
    pub min_coverage: f64,
    pub max_concepts: usize,
}

impl Default for LexicalLossAnalyzer {
    fn default() -> Self {
        Self { min_coverage: 0.5, max_concepts: 10 }
    }
}

impl LexicalLossAnalyzer {
    pub fn missing(&self, original: &str, candidate: &str) -> Vec<String> {
        let present: HashSet<String> = words(candidate).into_iter().collect();
        split_sentences(original)
            .into_iter()
            .filter(|sentence| {
                let terms = words(sentence);
                if terms.is_empty() {
                    return false;
                }
                let kept = terms.iter().filter(|t| present.contains(*t)).count();
                (kept as f64 / terms.len() as f64) < self.min_coverage
            })
            .take(self.max_concepts)
            .collect()
    }
}

#[async_trait]
impl LossAnalyzer for LexicalLossAnalyzer {
    async fn diagnose_loss(&self, original: &str, candidate: &str) -> Result<Vec<String>> {
        Ok(self.missing(original, candidate))
    }
}
