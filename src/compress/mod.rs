//! # Budget Compressor
//!
//! Selects the subset of units that maximizes retained importance while
//! keeping retained entropy under `total_entropy × target_ratio`.
//!
//! ```text
//! mustKeep (preserved kinds) ──────────────────────────────┐
//! prunable ─ sort by importance desc (stable) ─ greedy fit ─┼─> induced subgraph
//!                       └─ escape valve (importance > 0.9) ─┘
//! ```
//!
//! A single deterministic pass with no external calls. The input graph is
//! only read; every call returns a new graph.

use hashbrown::HashSet;
use serde::{Deserialize, Serialize};
use smallvec::{smallvec, SmallVec};
use tracing::debug;

use crate::model::graph::by_importance_desc;
use crate::model::{SemanticGraph, SemanticUnit, UnitId, UnitKind};
use crate::{Error, Result};

// ============================================================================
// Configuration
// ============================================================================

/// Budget bypass for very important units.
///
/// A unit skipped for budget is still kept when its importance is strictly
/// above `min_importance` and fewer than `max_selected` units have been
/// selected so far. The thresholds are a safety margin, not a contract.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EscapeValve {
    pub min_importance: f64,
    pub max_selected: usize,
}

impl Default for EscapeValve {
    fn default() -> Self {
        Self { min_importance: 0.9, max_selected: 10 }
    }
}

/// Compressor settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionConfig {
    /// Kinds that are never pruned, regardless of the target ratio.
    pub preserve_kinds: SmallVec<[UnitKind; 2]>,
    /// `None` disables the budget bypass.
    pub escape_valve: Option<EscapeValve>,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            preserve_kinds: smallvec![UnitKind::Intent],
            escape_valve: Some(EscapeValve::default()),
        }
    }
}

impl CompressionConfig {
    pub fn with_preserve_kinds(mut self, kinds: impl IntoIterator<Item = UnitKind>) -> Self {
        self.preserve_kinds = kinds.into_iter().collect();
        self
    }

    pub fn with_escape_valve(mut self, valve: Option<EscapeValve>) -> Self {
        self.escape_valve = valve;
        self
    }

    pub fn preserves(&self, kind: UnitKind) -> bool {
        self.preserve_kinds.contains(&kind)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(valve) = &self.escape_valve {
            if !(0.0..=1.0).contains(&valve.min_importance) {
                return Err(Error::Validation(format!(
                    "escape valve min_importance must be in [0, 1], got {}",
                    valve.min_importance
                )));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Compressor
// ============================================================================

/// Importance-ranked, entropy-budgeted graph pruner.
#[derive(Debug, Clone, Default)]
pub struct Compressor {
    config: CompressionConfig,
}

impl Compressor {
    pub fn new(config: CompressionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompressionConfig {
        &self.config
    }

    /// Compress `graph` so that retained entropy stays within
    /// `target_ratio` of the total (plus any escape-valve overshoot).
    ///
    /// Fails with `Error::Validation` if the ratio is outside [0, 1], a unit
    /// carries a non-finite or negative entropy or an importance outside
    /// [0, 1], or the graph carries no entropy at all.
    pub fn compress(&self, graph: &SemanticGraph, target_ratio: f64) -> Result<SemanticGraph> {
        if !(0.0..=1.0).contains(&target_ratio) {
            return Err(Error::Validation(format!(
                "target ratio must be in [0, 1], got {target_ratio}"
            )));
        }
        for unit in graph.units() {
            check_scores(unit)?;
        }
        let total = graph.total_entropy();
        if !(total > 0.0) {
            return Err(Error::Validation(format!(
                "cannot compress a graph with total entropy {total} ({} units)",
                graph.unit_count()
            )));
        }

        let target_entropy = total * target_ratio;
        let selected = self.select(graph, target_entropy);
        let compressed = graph.induced_subgraph(&selected);

        debug!(
            target_ratio,
            target_entropy,
            kept = compressed.unit_count(),
            total_units = graph.unit_count(),
            retained_entropy = compressed.total_entropy(),
            "compressed graph"
        );
        Ok(compressed)
    }

    /// Greedy selection. Returns the ids to keep.
    fn select(&self, graph: &SemanticGraph, target_entropy: f64) -> HashSet<UnitId> {
        let (must_keep, mut prunable): (Vec<&SemanticUnit>, Vec<&SemanticUnit>) =
            graph.units().partition(|u| self.config.preserves(u.kind));

        // Stable: equal importance keeps graph insertion order.
        prunable.sort_by(|a, b| by_importance_desc(a, b));

        let mut selected: HashSet<UnitId> = must_keep.iter().map(|u| u.id.clone()).collect();
        let mut accumulated: f64 = must_keep.iter().map(|u| u.entropy).sum();

        for unit in prunable {
            if accumulated + unit.entropy <= target_entropy {
                accumulated += unit.entropy;
                selected.insert(unit.id.clone());
                continue;
            }
            if let Some(valve) = &self.config.escape_valve {
                if unit.importance > valve.min_importance && selected.len() < valve.max_selected {
                    debug!(unit = %unit.id, importance = unit.importance, "escape valve admitted unit over budget");
                    accumulated += unit.entropy;
                    selected.insert(unit.id.clone());
                }
            }
        }
        selected
    }
}

fn check_scores(unit: &SemanticUnit) -> Result<()> {
    if !unit.entropy.is_finite() || unit.entropy < 0.0 {
        return Err(Error::Validation(format!(
            "unit {} has entropy {}, expected a finite value >= 0",
            unit.id, unit.entropy
        )));
    }
    if !(0.0..=1.0).contains(&unit.importance) {
        return Err(Error::Validation(format!(
            "unit {} has importance {}, expected [0, 1]",
            unit.id, unit.importance
        )));
    }
    Ok(())
}

/// Free-function form using the default configuration.
pub fn compress(graph: &SemanticGraph, target_ratio: f64) -> Result<SemanticGraph> {
    Compressor::default().compress(graph, target_ratio)
}

// ============================================================================
// Statistics
// ============================================================================

/// Retention of a compressed graph relative to its original.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CompressionStats {
    pub original_units: usize,
    pub compressed_units: usize,
    pub units_removed: usize,
    pub unit_retention: f64,
    pub original_entropy: f64,
    pub compressed_entropy: f64,
    pub entropy_retention: f64,
    pub original_importance: f64,
    pub compressed_importance: f64,
    pub importance_retention: f64,
}

fn ratio(part: f64, whole: f64) -> f64 {
    if whole > 0.0 { part / whole } else { 0.0 }
}

impl CompressionStats {
    pub fn between(original: &SemanticGraph, compressed: &SemanticGraph) -> Self {
        let (ou, cu) = (original.unit_count(), compressed.unit_count());
        let (oe, ce) = (original.total_entropy(), compressed.total_entropy());
        let (oi, ci) = (original.total_importance(), compressed.total_importance());
        Self {
            original_units: ou,
            compressed_units: cu,
            units_removed: ou.saturating_sub(cu),
            unit_retention: ratio(cu as f64, ou as f64),
            original_entropy: oe,
            compressed_entropy: ce,
            entropy_retention: ratio(ce, oe),
            original_importance: oi,
            compressed_importance: ci,
            importance_retention: ratio(ci, oi),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Relation;

    fn unit(id: &str, kind: UnitKind, importance: f64, entropy: f64) -> SemanticUnit {
        SemanticUnit::new(id, kind, id).with_importance(importance).with_entropy(entropy)
    }

    /// 10 units, 100 bits total; the intent costs 10.
    fn ten_unit_graph() -> SemanticGraph {
        let mut g = SemanticGraph::for_source("source", 1);
        g.add_unit(unit("intent", UnitKind::Intent, 1.0, 10.0));
        let rest = [
            ("d1", 0.50, 10.0),
            ("d2", 0.85, 15.0),
            ("d3", 0.70, 10.0),
            ("d4", 0.80, 10.0),
            ("d5", 0.40, 5.0),
            ("d6", 0.60, 10.0),
            ("d7", 0.30, 10.0),
            ("d8", 0.20, 10.0),
            ("d9", 0.10, 10.0),
        ];
        for (id, imp, ent) in rest {
            g.add_unit(unit(id, UnitKind::Detail, imp, ent));
            g.add_relation(Relation::new("intent", id, "has_detail"));
        }
        g.set_root("intent".into());
        g
    }

    fn ids(g: &SemanticGraph) -> Vec<&str> {
        g.units().map(|u| u.id.as_str()).collect()
    }

    #[test]
    fn test_forty_percent_budget() {
        let g = ten_unit_graph();
        assert!((g.total_entropy() - 100.0).abs() < 1e-9);

        let c = compress(&g, 0.4).unwrap();
        // Sorted: d2(15) d4(10) d3(10) d6(10) d1 d5(5) ...
        // 10 + 15 = 25, +10 = 35, d3 would be 45 → skip, ..., d5 → 40.
        assert_eq!(ids(&c), vec!["intent", "d2", "d4", "d5"]);
        assert!(c.total_entropy() <= 40.0 + 1e-9);
    }

    #[test]
    fn test_zero_ratio_keeps_preserved_kinds() {
        let g = ten_unit_graph();
        let c = compress(&g, 0.0).unwrap();
        assert_eq!(ids(&c), vec!["intent"]);
        assert_eq!(c.relation_count(), 0);
        assert_eq!(c.root_id(), Some(&UnitId::new("intent")));
    }

    #[test]
    fn test_full_ratio_keeps_everything() {
        let g = ten_unit_graph();
        let c = compress(&g, 1.0).unwrap();
        assert_eq!(c.unit_count(), g.unit_count());
        assert_eq!(c.relation_count(), g.relation_count());
    }

    #[test]
    fn test_input_not_mutated() {
        let g = ten_unit_graph();
        let before = g.clone();
        let _ = compress(&g, 0.3).unwrap();
        assert_eq!(g, before);
    }

    #[test]
    fn test_ties_break_by_insertion_order() {
        let mut g = SemanticGraph::new();
        g.add_unit(unit("i", UnitKind::Intent, 1.0, 1.0));
        g.add_unit(unit("first", UnitKind::Detail, 0.5, 4.0));
        g.add_unit(unit("second", UnitKind::Detail, 0.5, 4.0));
        g.add_unit(unit("third", UnitKind::Detail, 0.5, 4.0));
        // total 13, budget 0.5 × 13 = 6.5 → intent + one tie winner
        let c = compress(&g, 0.5).unwrap();
        assert_eq!(ids(&c), vec!["i", "first"]);
    }

    #[test]
    fn test_escape_valve_admits_critical_units() {
        let mut g = SemanticGraph::new();
        g.add_unit(unit("i", UnitKind::Intent, 1.0, 10.0));
        g.add_unit(unit("big", UnitKind::Outcome, 0.95, 50.0));
        g.add_unit(unit("small", UnitKind::Detail, 0.3, 40.0));

        let with_valve = compress(&g, 0.2).unwrap();
        assert_eq!(ids(&with_valve), vec!["i", "big"]);

        let no_valve = Compressor::new(CompressionConfig::default().with_escape_valve(None));
        assert_eq!(ids(&no_valve.compress(&g, 0.2).unwrap()), vec!["i"]);
    }

    #[test]
    fn test_escape_valve_respects_selection_cap() {
        let mut g = SemanticGraph::new();
        g.add_unit(unit("i", UnitKind::Intent, 1.0, 1.0));
        for n in 0..5 {
            g.add_unit(unit(&format!("c{n}"), UnitKind::Constraint, 0.95, 10.0));
        }
        let valve = EscapeValve { min_importance: 0.9, max_selected: 3 };
        let compressor = Compressor::new(CompressionConfig::default().with_escape_valve(Some(valve)));
        let c = compressor.compress(&g, 0.0).unwrap();
        assert_eq!(ids(&c), vec!["i", "c0", "c1"]);
    }

    #[test]
    fn test_custom_preserve_kinds() {
        let g = ten_unit_graph();
        let compressor = Compressor::new(
            CompressionConfig::default().with_preserve_kinds([UnitKind::Intent, UnitKind::Detail]),
        );
        let c = compressor.compress(&g, 0.0).unwrap();
        assert_eq!(c.unit_count(), g.unit_count());
    }

    #[test]
    fn test_rejects_bad_ratio() {
        let g = ten_unit_graph();
        assert!(matches!(compress(&g, -0.1), Err(Error::Validation(_))));
        assert!(matches!(compress(&g, 1.5), Err(Error::Validation(_))));
        assert!(matches!(compress(&g, f64::NAN), Err(Error::Validation(_))));
    }

    #[test]
    fn test_rejects_zero_entropy_graph() {
        assert!(matches!(compress(&SemanticGraph::new(), 0.5), Err(Error::Validation(_))));
        let mut g = SemanticGraph::new();
        g.add_unit(unit("i", UnitKind::Intent, 1.0, 0.0));
        assert!(matches!(compress(&g, 0.5), Err(Error::Validation(_))));
    }

    #[test]
    fn test_rejects_out_of_range_unit_scores() {
        let bad = [
            unit("x", UnitKind::Detail, 0.5, -5.0),
            unit("x", UnitKind::Detail, 0.5, f64::NAN),
            unit("x", UnitKind::Detail, 0.5, f64::INFINITY),
            unit("x", UnitKind::Detail, 1.7, 2.0),
            unit("x", UnitKind::Detail, -0.1, 2.0),
            unit("x", UnitKind::Detail, f64::NAN, 2.0),
        ];
        for x in bad {
            let mut g = SemanticGraph::new();
            g.add_unit(unit("i", UnitKind::Intent, 1.0, 10.0));
            g.add_unit(unit("a", UnitKind::Detail, 0.9, 2.0));
            g.add_unit(x.clone());
            assert!(matches!(compress(&g, 0.5), Err(Error::Validation(_))), "{x:?}");
        }
    }

    #[test]
    fn test_nan_importance_never_outranks_valid_units() {
        let mut g = SemanticGraph::new();
        g.add_unit(unit("n", UnitKind::Detail, f64::NAN, 5.0));
        g.add_unit(unit("a", UnitKind::Detail, 0.9, 5.0));
        let err = compress(&g, 0.5).unwrap_err();
        assert!(err.to_string().contains("unit n"), "{err}");
    }

    #[test]
    fn test_stats() {
        let g = ten_unit_graph();
        let c = compress(&g, 0.4).unwrap();
        let stats = CompressionStats::between(&g, &c);
        assert_eq!(stats.original_units, 10);
        assert_eq!(stats.compressed_units, 4);
        assert_eq!(stats.units_removed, 6);
        assert!((stats.unit_retention - 0.4).abs() < 1e-9);
        assert!((stats.entropy_retention - 0.4).abs() < 1e-9);
        assert!(stats.importance_retention > 0.0 && stats.importance_retention < 1.0);
    }

    #[test]
    fn test_config_serde_defaults() {
        let cfg: CompressionConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, CompressionConfig::default());
        let cfg: CompressionConfig = serde_json::from_str(r#"{"escape_valve": null}"#).unwrap();
        assert_eq!(cfg.escape_valve, None);
    }
}
