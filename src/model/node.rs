//! Semantic unit (node) in the graph.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use super::{Metadata, Value};

/// Opaque unit identifier, stable within one graph and across its prunings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(pub String);

impl UnitId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UnitId {
    fn from(s: &str) -> Self { Self(s.to_owned()) }
}

impl From<String> for UnitId {
    fn from(s: String) -> Self { Self(s) }
}

// ============================================================================
// UnitKind
// ============================================================================

/// The closed set of semantic unit kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    /// What action is being requested.
    Intent,
    /// Who or what is involved.
    Entity,
    /// Properties, quantities, timeframes.
    Attribute,
    /// Context and explanations.
    Detail,
    /// Requirements and limitations.
    Constraint,
    /// Expected results and goals.
    Outcome,
}

impl UnitKind {
    pub const ALL: [UnitKind; 6] = [
        UnitKind::Intent,
        UnitKind::Entity,
        UnitKind::Attribute,
        UnitKind::Detail,
        UnitKind::Constraint,
        UnitKind::Outcome,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UnitKind::Intent => "intent",
            UnitKind::Entity => "entity",
            UnitKind::Attribute => "attribute",
            UnitKind::Detail => "detail",
            UnitKind::Constraint => "constraint",
            UnitKind::Outcome => "outcome",
        }
    }

    /// Map a free-form label from an extractor onto the closed kind set.
    ///
    /// Case and surrounding whitespace are ignored; plural forms of the
    /// canonical names are accepted. Anything unrecognized is a `Detail`.
    pub fn from_label(label: &str) -> UnitKind {
        let label = label.trim().to_lowercase();
        match label.as_str() {
            "intent" | "intents" | "action" | "request" | "task" | "command" | "query" => {
                UnitKind::Intent
            }
            "entity" | "entities" | "person" | "people" | "organization" | "organisation"
            | "org" | "company" | "system" | "document" | "product" | "team" | "location"
            | "place" => UnitKind::Entity,
            "attribute" | "attributes" | "metric" | "quantity" | "number" | "timeframe"
            | "date" | "time" | "status" | "priority" | "property" | "value" => {
                UnitKind::Attribute
            }
            "constraint" | "constraints" | "requirement" | "limitation" | "restriction"
            | "deadline" | "rule" => UnitKind::Constraint,
            "outcome" | "outcomes" | "goal" | "result" | "objective" | "expectation"
            | "deliverable" => UnitKind::Outcome,
            // "event", "context", "explanation" and everything else
            _ => UnitKind::Detail,
        }
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UnitKind {
    type Err = std::convert::Infallible;

    /// Never fails: unknown labels fall back to `Detail`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(UnitKind::from_label(s))
    }
}

// ============================================================================
// SemanticUnit
// ============================================================================

/// One extracted fact, entity, constraint, or intent.
///
/// `importance` evolves across refinement iterations; `entropy` is fixed
/// once the unit has been scored at ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticUnit {
    pub id: UnitId,
    pub content: String,
    pub kind: UnitKind,
    /// Value density in [0, 1].
    pub importance: f64,
    /// Retention cost in approximate bytes, >= 0.
    pub entropy: f64,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
}

impl SemanticUnit {
    pub fn new(id: impl Into<UnitId>, kind: UnitKind, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            kind,
            importance: 0.0,
            entropy: 0.0,
            metadata: Metadata::new(),
        }
    }

    pub fn with_importance(mut self, importance: f64) -> Self {
        self.importance = importance;
        self
    }

    pub fn with_entropy(mut self, entropy: f64) -> Self {
        self.entropy = entropy;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn is(&self, kind: UnitKind) -> bool {
        self.kind == kind
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }
}
