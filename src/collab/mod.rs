//! # External Collaborator Contracts
//!
//! The compression core never talks to a language model itself. Everything
//! non-deterministic sits behind the traits in this module:
//!
//! | Trait | Call | Failure policy in the controller |
//! |-------|------|----------------------------------|
//! | `StructureExtractor` | `extract(text)` | malformed → minimal graph, continue |
//! | `Reconstructor` | `reconstruct(graph)` | fatal for the iteration, propagated |
//! | `FidelityJudge` | `score(original, candidate)` | fatal for the iteration, propagated |
//! | `LossAnalyzer` | `diagnose_loss(original, candidate)` | degrade to no concepts, continue |
//!
//! ## Implementations
//!
//! | Implementation | Module | Description |
//! |----------------|--------|-------------|
//! | `SentenceExtractor`, `TemplateReconstructor`, `LexicalJudge`, `LexicalLossAnalyzer` | `lexical` | Deterministic, offline reference collaborators |
//! | `LlmCollaborators` | `llm` | All four contracts over any `ChatModel`, spaced by a shared `RateGate` |
//!
//! No collaborator call is retried by the core. Retry and backoff belong
//! to the implementation.

pub mod gate;
pub mod ingest;
pub mod lexical;
pub mod llm;
pub mod prompt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::model::SemanticGraph;
use crate::Result;

pub use gate::RateGate;
pub use ingest::{ingest, minimal_graph, relation_label, FALLBACK_INTENT};
pub use lexical::{LexicalJudge, LexicalLossAnalyzer, SentenceExtractor, TemplateReconstructor};
pub use llm::{ChatMessage, ChatModel, ChatRequest, ChatRole, LlmCollaborators};
pub use prompt::{ReconstructionRequest, TOKENS_PER_UNIT};

// ============================================================================
// Extraction DTOs
// ============================================================================

/// One unit as reported by an extractor, before normalization.
///
/// A `"type"` field is read as the kind when `"kind"` is absent and as the
/// subtype otherwise.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "RawExtractedUnit")]
pub struct ExtractedUnit {
    /// Extractor-assigned id. Generated at ingestion when absent.
    pub id: Option<String>,
    pub content: String,
    /// Free-form kind label, mapped onto `UnitKind` at ingestion.
    pub kind: String,
    /// Finer label (`"person"`, `"timeframe"`), kept as metadata only.
    pub subtype: Option<String>,
    /// The extractor's own importance guess, kept as metadata only.
    pub importance_hint: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct RawExtractedUnit {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    content: String,
    #[serde(default)]
    kind: Option<String>,
    #[serde(default, rename = "type")]
    type_label: Option<String>,
    #[serde(default)]
    subtype: Option<String>,
    #[serde(default, alias = "importanceHint", alias = "importance")]
    importance_hint: Option<serde_json::Value>,
}

impl From<RawExtractedUnit> for ExtractedUnit {
    fn from(raw: RawExtractedUnit) -> Self {
        let (kind, subtype) = match (raw.kind, raw.type_label) {
            (Some(kind), type_label) => (kind, raw.subtype.or(type_label)),
            (None, type_label) => (type_label.unwrap_or_default(), raw.subtype),
        };
        Self {
            id: raw.id,
            content: raw.content,
            kind,
            subtype,
            importance_hint: raw.importance_hint,
        }
    }
}

impl ExtractedUnit {
    pub fn new(kind: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            kind: kind.into(),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// One relation as reported by an extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedRelation {
    pub source: String,
    pub target: String,
    #[serde(default = "default_relation")]
    pub relation: String,
    #[serde(default)]
    pub weight: Option<f64>,
}

fn default_relation() -> String {
    "related_to".to_string()
}

impl ExtractedRelation {
    pub fn new(source: impl Into<String>, target: impl Into<String>, relation: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            relation: relation.into(),
            weight: None,
        }
    }
}

/// Raw extractor output.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExtractedStructure {
    #[serde(default, alias = "nodes")]
    pub units: Vec<ExtractedUnit>,
    #[serde(default, alias = "edges")]
    pub relations: Vec<ExtractedRelation>,
}

// ============================================================================
// Collaborator traits
// ============================================================================

/// Natural language → loosely typed structure.
///
/// Return `Error::MalformedOutput` for output that could not be parsed;
/// the controller degrades that case to a minimal graph. Any other error
/// aborts the run.
#[async_trait]
pub trait StructureExtractor: Send + Sync {
    async fn extract(&self, text: &str) -> Result<ExtractedStructure>;
}

/// Compressed graph → candidate text.
///
/// Implementations must reference every retained unit, keep numeric values
/// exact, add nothing that is not in the graph, and aim for roughly
/// [`TOKENS_PER_UNIT`] tokens per unit. [`ReconstructionRequest`] carries
/// that contract.
#[async_trait]
pub trait Reconstructor: Send + Sync {
    async fn reconstruct(&self, graph: &SemanticGraph) -> Result<String>;
}

/// Semantic similarity of two texts, in [0, 1].
#[async_trait]
pub trait FidelityJudge: Send + Sync {
    async fn score(&self, original: &str, candidate: &str) -> Result<f64>;
}

/// Phrases present in `original` but missing from `candidate`.
#[async_trait]
pub trait LossAnalyzer: Send + Sync {
    async fn diagnose_loss(&self, original: &str, candidate: &str) -> Result<Vec<String>>;
}

// ============================================================================
// Token counting
// ============================================================================

/// Token counting seam for telemetry. Exact tokenization is the caller's
/// choice; the core only needs a consistent count.
pub trait TokenCounter: Send + Sync {
    fn count(&self, text: &str) -> usize;
}

/// Counts whitespace-separated words.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordTokenCounter;

impl TokenCounter for WordTokenCounter {
    fn count(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structure_accepts_aliases() {
        let json = r#"{
            "nodes": [
                {"id": "a", "content": "Acme", "type": "organization", "importanceHint": "high"},
                {"content": "ship by Friday", "kind": "requirement", "importance": 0.8}
            ],
            "edges": [{"source": "a", "target": "b"}]
        }"#;
        let s: ExtractedStructure = serde_json::from_str(json).unwrap();
        assert_eq!(s.units.len(), 2);
        assert_eq!(s.units[0].kind, "organization");
        assert_eq!(s.units[0].importance_hint, Some(serde_json::json!("high")));
        assert_eq!(s.units[1].id, None);
        assert_eq!(s.relations[0].relation, "related_to");
    }

    #[test]
    fn test_type_is_subtype_when_kind_present() {
        let json = r#"{"kind": "entity", "type": "person", "content": "Dana"}"#;
        let u: ExtractedUnit = serde_json::from_str(json).unwrap();
        assert_eq!(u.kind, "entity");
        assert_eq!(u.subtype.as_deref(), Some("person"));

        let json = r#"{"kind": "entity", "type": "person", "subtype": "customer", "content": "Dana"}"#;
        let u: ExtractedUnit = serde_json::from_str(json).unwrap();
        assert_eq!(u.subtype.as_deref(), Some("customer"));
    }

    #[test]
    fn test_word_token_counter() {
        assert_eq!(WordTokenCounter.count("  three small  words "), 3);
        assert_eq!(WordTokenCounter.count(""), 0);
    }
}
