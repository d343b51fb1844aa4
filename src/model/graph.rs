//! SemanticGraph: units, relations, root and provenance for one message.

use std::cmp::Ordering;

use hashbrown::{HashMap, HashSet};
use serde::{Deserialize, Serialize};

use super::{Relation, SemanticUnit, UnitId, UnitKind};

/// Metric used by [`SemanticGraph::sorted_units`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// Highest importance first.
    Importance,
    /// Highest entropy first.
    Entropy,
    /// Grouped by kind in declaration order.
    Kind,
}

/// A directed graph of semantic units.
///
/// Units live in an insertion-ordered arena addressed through an
/// id → slot index. Insertion order is the "input order" that breaks
/// importance ties during compression.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "GraphRecord", into = "GraphRecord")]
pub struct SemanticGraph {
    units: Vec<SemanticUnit>,
    index: HashMap<UnitId, usize>,
    relations: Vec<Relation>,
    root: Option<UnitId>,
    source_text: String,
    source_tokens: usize,
}

impl PartialEq for SemanticGraph {
    fn eq(&self, other: &Self) -> bool {
        self.units == other.units
            && self.relations == other.relations
            && self.root == other.root
            && self.source_text == other.source_text
            && self.source_tokens == other.source_tokens
    }
}

impl SemanticGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty graph carrying the provenance of `text`.
    pub fn for_source(text: impl Into<String>, tokens: usize) -> Self {
        Self {
            source_text: text.into(),
            source_tokens: tokens,
            ..Self::default()
        }
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Insert a unit. If the id already exists the unit is replaced in its
    /// original slot and the previous value is returned.
    pub fn add_unit(&mut self, unit: SemanticUnit) -> Option<SemanticUnit> {
        if let Some(&slot) = self.index.get(&unit.id) {
            return Some(std::mem::replace(&mut self.units[slot], unit));
        }
        self.index.insert(unit.id.clone(), self.units.len());
        self.units.push(unit);
        None
    }

    /// Add a relation. Returns false (and adds nothing) if either endpoint
    /// is not a unit of this graph.
    pub fn add_relation(&mut self, relation: Relation) -> bool {
        if !self.contains(&relation.source) || !self.contains(&relation.target) {
            return false;
        }
        self.relations.push(relation);
        true
    }

    /// Set the root unit. Returns false if the unit does not exist.
    pub fn set_root(&mut self, id: UnitId) -> bool {
        if !self.contains(&id) {
            return false;
        }
        self.root = Some(id);
        true
    }

    pub fn unit_mut(&mut self, id: &UnitId) -> Option<&mut SemanticUnit> {
        let slot = *self.index.get(id)?;
        self.units.get_mut(slot)
    }

    /// Mutable access to every unit. Ids must not be changed through this.
    pub fn units_mut(&mut self) -> impl Iterator<Item = &mut SemanticUnit> {
        self.units.iter_mut()
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    pub fn unit(&self, id: &UnitId) -> Option<&SemanticUnit> {
        self.index.get(id).and_then(|&slot| self.units.get(slot))
    }

    pub fn contains(&self, id: &UnitId) -> bool {
        self.index.contains_key(id)
    }

    /// Units in insertion order.
    pub fn units(&self) -> impl Iterator<Item = &SemanticUnit> {
        self.units.iter()
    }

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    pub fn root(&self) -> Option<&SemanticUnit> {
        self.root.as_ref().and_then(|id| self.unit(id))
    }

    pub fn root_id(&self) -> Option<&UnitId> {
        self.root.as_ref()
    }

    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    pub fn source_tokens(&self) -> usize {
        self.source_tokens
    }

    /// Units connected to `id` by a relation in either direction.
    pub fn neighbors(&self, id: &UnitId) -> Vec<&SemanticUnit> {
        self.relations
            .iter()
            .filter_map(|rel| rel.other_unit(id))
            .filter_map(|other| self.unit(other))
            .collect()
    }

    pub fn units_by_kind(&self, kind: UnitKind) -> Vec<&SemanticUnit> {
        self.units.iter().filter(|u| u.kind == kind).collect()
    }

    /// Units sorted by a metric. The sort is stable: equal keys keep
    /// insertion order.
    pub fn sorted_units(&self, by: SortKey) -> Vec<&SemanticUnit> {
        let mut units: Vec<&SemanticUnit> = self.units.iter().collect();
        match by {
            SortKey::Importance => units.sort_by(|a, b| by_importance_desc(a, b)),
            SortKey::Entropy => units.sort_by(|a, b| b.entropy.total_cmp(&a.entropy)),
            SortKey::Kind => units.sort_by(|a, b| a.kind.cmp(&b.kind)),
        }
        units
    }

    // ========================================================================
    // Aggregates
    // ========================================================================

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    pub fn relation_count(&self) -> usize {
        self.relations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn total_entropy(&self) -> f64 {
        self.units.iter().map(|u| u.entropy).sum()
    }

    pub fn total_importance(&self) -> f64 {
        self.units.iter().map(|u| u.importance).sum()
    }

    // ========================================================================
    // Subgraphs
    // ========================================================================

    /// A new graph holding copies of the units in `keep` (in this graph's
    /// order) and every relation whose endpoints are both kept.
    ///
    /// Ids in `keep` that are not in this graph are ignored. The root
    /// carries over only if it was kept.
    pub fn induced_subgraph(&self, keep: &HashSet<UnitId>) -> SemanticGraph {
        let mut sub = SemanticGraph::for_source(self.source_text.clone(), self.source_tokens);
        for unit in self.units.iter().filter(|u| keep.contains(&u.id)) {
            sub.add_unit(unit.clone());
        }
        for rel in &self.relations {
            if keep.contains(&rel.source) && keep.contains(&rel.target) {
                sub.add_relation(rel.clone());
            }
        }
        if let Some(root) = &self.root {
            if sub.contains(root) {
                sub.root = Some(root.clone());
            }
        }
        sub
    }
}

// ============================================================================
// Serialized form
// ============================================================================

/// Wire shape of a graph. The slot index is rebuilt on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct GraphRecord {
    units: Vec<SemanticUnit>,
    #[serde(default)]
    relations: Vec<Relation>,
    #[serde(default)]
    root: Option<UnitId>,
    #[serde(default)]
    source_text: String,
    #[serde(default)]
    source_tokens: usize,
}

impl From<GraphRecord> for SemanticGraph {
    fn from(record: GraphRecord) -> Self {
        let mut graph = SemanticGraph::for_source(record.source_text, record.source_tokens);
        for unit in record.units {
            graph.add_unit(unit);
        }
        for rel in record.relations {
            graph.add_relation(rel);
        }
        if let Some(root) = record.root {
            graph.set_root(root);
        }
        graph
    }
}

impl From<SemanticGraph> for GraphRecord {
    fn from(graph: SemanticGraph) -> Self {
        GraphRecord {
            units: graph.units,
            relations: graph.relations,
            root: graph.root,
            source_text: graph.source_text,
            source_tokens: graph.source_tokens,
        }
    }
}

/// Compare two units by importance, highest first.
///
/// `total_cmp` order: positive NaN would sort first, so callers validate
/// importances before sorting.
pub(crate) fn by_importance_desc(a: &SemanticUnit, b: &SemanticUnit) -> Ordering {
    b.importance.total_cmp(&a.importance)
}
