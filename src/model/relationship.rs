//! Relation (edge) between two semantic units.

use serde::{Deserialize, Serialize};
use super::UnitId;

fn default_weight() -> f64 {
    1.0
}

/// A directed, labelled relation between two units.
///
/// Endpoints are checked when the relation is added to a graph. Pruning
/// never re-validates; it drops relations whose endpoints were not kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub source: UnitId,
    pub target: UnitId,
    /// Free-form label, e.g. `"has_attribute"`, `"constrains"`.
    pub relation: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

impl Relation {
    pub fn new(source: impl Into<UnitId>, target: impl Into<UnitId>, relation: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            relation: relation.into(),
            weight: default_weight(),
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// The "other" end of the relation from the given unit.
    pub fn other_unit(&self, from: &UnitId) -> Option<&UnitId> {
        if *from == self.source { Some(&self.target) }
        else if *from == self.target { Some(&self.source) }
        else { None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weight() {
        let rel: Relation = serde_json::from_str(r#"{"source":"a","target":"b","relation":"leads_to"}"#).unwrap();
        assert_eq!(rel.weight, 1.0);
        assert_eq!(Relation::new("a", "b", "x").weight, 1.0);
    }

    #[test]
    fn test_other_unit() {
        let rel = Relation::new("a", "b", "has_entity");
        assert_eq!(rel.other_unit(&"a".into()), Some(&UnitId::new("b")));
        assert_eq!(rel.other_unit(&"b".into()), Some(&UnitId::new("a")));
        assert_eq!(rel.other_unit(&"c".into()), None);
    }
}
