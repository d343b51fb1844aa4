//! End-to-end tests for scoring, compression and boosting.
//!
//! Graphs come either from the lexical extractor (realistic scores) or are
//! built by hand with exact entropies.

use pretty_assertions::assert_eq;
use semgraph::collab::{ingest, SentenceExtractor};
use semgraph::{
    boost, CompressionConfig, CompressionStats, Compressor, Error, EscapeValve, Relation,
    SemanticGraph, SemanticUnit, UnitKind,
};

const MESSAGE: &str = "Please prepare the board summary for Northwind. \
    Revenue grew 12% to 3.4M dollars in Q2. \
    The summary must be ready before Thursday. \
    Churn stayed flat across the enterprise segment. \
    Support tickets dropped after the March release. \
    Our goal is a clear funding decision.";

fn extracted() -> SemanticGraph {
    let structure = SentenceExtractor.extract_sync(MESSAGE);
    ingest(MESSAGE, MESSAGE.split_whitespace().count(), Ok(structure)).unwrap()
}

fn no_valve() -> Compressor {
    Compressor::new(CompressionConfig::default().with_escape_valve(None))
}

fn unit(id: &str, kind: UnitKind, content: &str, importance: f64, entropy: f64) -> SemanticUnit {
    SemanticUnit::new(id, kind, content).with_importance(importance).with_entropy(entropy)
}

// ============================================================================
// 1. Budget and preservation on an extracted graph
// ============================================================================

#[test]
fn test_budget_respected_without_valve() {
    let graph = extracted();
    let must_keep: f64 = graph.units_by_kind(UnitKind::Intent).iter().map(|u| u.entropy).sum();

    for ratio in [0.0, 0.1, 0.25, 0.4, 0.6, 0.8] {
        let compressed = no_valve().compress(&graph, ratio).unwrap();
        let budget = graph.total_entropy() * ratio;
        assert!(
            compressed.total_entropy() <= budget.max(must_keep) + 1e-9,
            "ratio {ratio}: kept {} > budget {budget}",
            compressed.total_entropy()
        );
    }
}

#[test]
fn test_intent_and_root_always_kept() {
    let graph = extracted();
    let root = graph.root_id().cloned().unwrap();
    for ratio in [0.0, 0.3, 0.7, 1.0] {
        let compressed = semgraph::compress::compress(&graph, ratio).unwrap();
        assert!(compressed.contains(&root));
        assert_eq!(compressed.root_id(), Some(&root));
        assert_eq!(
            compressed.units_by_kind(UnitKind::Intent).len(),
            graph.units_by_kind(UnitKind::Intent).len()
        );
    }
}

#[test]
fn test_relations_only_between_kept_units() {
    let graph = extracted();
    let compressed = no_valve().compress(&graph, 0.3).unwrap();
    assert!(compressed.unit_count() < graph.unit_count());
    for rel in compressed.relations() {
        assert!(compressed.contains(&rel.source) && compressed.contains(&rel.target));
    }
}

#[test]
fn test_input_graph_untouched() {
    let graph = extracted();
    let before = graph.clone();
    let _ = no_valve().compress(&graph, 0.2).unwrap();
    let _ = semgraph::compress::compress(&graph, 0.9).unwrap();
    assert_eq!(graph, before);
}

#[test]
fn test_provenance_carried_over() {
    let graph = extracted();
    let compressed = no_valve().compress(&graph, 0.5).unwrap();
    assert_eq!(compressed.source_text(), MESSAGE);
    assert_eq!(compressed.source_tokens(), graph.source_tokens());
}

// ============================================================================
// 2. Exact hand-built graphs
// ============================================================================

fn ledger() -> SemanticGraph {
    let mut g = SemanticGraph::for_source("ledger", 12);
    g.add_unit(unit("i", UnitKind::Intent, "summarize the ledger", 1.0, 10.0));
    g.add_unit(unit("a", UnitKind::Attribute, "quarterly revenue figures", 0.5, 10.0));
    g.add_unit(unit("b", UnitKind::Detail, "office furniture order", 0.6, 10.0));
    g.set_root("i".into());
    g.add_relation(Relation::new("i", "a", "has_attribute"));
    g.add_relation(Relation::new("i", "b", "has_detail"));
    g
}

#[test]
fn test_full_ratio_keeps_everything() {
    let graph = ledger();
    let compressed = no_valve().compress(&graph, 1.0).unwrap();
    assert_eq!(compressed, graph);
}

#[test]
fn test_zero_ratio_keeps_preserved_only() {
    let compressed = no_valve().compress(&ledger(), 0.0).unwrap();
    let ids: Vec<&str> = compressed.units().map(|u| u.id.as_str()).collect();
    assert_eq!(ids, vec!["i"]);
    assert_eq!(compressed.relation_count(), 0);
}

#[test]
fn test_boost_changes_next_selection() {
    let mut graph = ledger();
    let before = no_valve().compress(&graph, 0.67).unwrap();
    assert!(before.contains(&"b".into()));
    assert!(!before.contains(&"a".into()));

    let boosted = boost(&mut graph, &["the revenue figures".to_string()]);
    assert_eq!(boosted, 1);
    assert!((graph.unit(&"a".into()).unwrap().importance - 0.75).abs() < 1e-12);

    let after = no_valve().compress(&graph, 0.67).unwrap();
    assert!(after.contains(&"a".into()));
    assert!(!after.contains(&"b".into()));
}

#[test]
fn test_escape_valve_admits_critical_unit() {
    let mut g = ledger();
    g.add_unit(unit("c", UnitKind::Constraint, "deadline is Friday", 0.95, 40.0));

    let with_valve = Compressor::new(
        CompressionConfig::default().with_escape_valve(Some(EscapeValve::default())),
    );
    assert!(with_valve.compress(&g, 0.3).unwrap().contains(&"c".into()));
    assert!(!no_valve().compress(&g, 0.3).unwrap().contains(&"c".into()));
}

#[test]
fn test_preserve_kinds_configurable() {
    let config = CompressionConfig::default()
        .with_preserve_kinds([UnitKind::Intent, UnitKind::Detail])
        .with_escape_valve(None);
    let compressed = Compressor::new(config).compress(&ledger(), 0.0).unwrap();
    assert!(compressed.contains(&"b".into()));
    assert!(!compressed.contains(&"a".into()));
}

#[test]
fn test_stats_between() {
    let graph = ledger();
    let compressed = no_valve().compress(&graph, 0.67).unwrap();
    let stats = CompressionStats::between(&graph, &compressed);
    assert_eq!(stats.original_units, 3);
    assert_eq!(stats.compressed_units, 2);
    assert_eq!(stats.units_removed, 1);
    assert!((stats.entropy_retention - 20.0 / 30.0).abs() < 1e-12);
    assert!((stats.importance_retention - 1.6 / 2.1).abs() < 1e-12);
}

// ============================================================================
// 3. Boundary validation
// ============================================================================

#[test]
fn test_invalid_ratios_rejected() {
    let graph = ledger();
    for ratio in [-0.1, 1.01, f64::NAN, f64::INFINITY] {
        assert!(matches!(no_valve().compress(&graph, ratio), Err(Error::Validation(_))), "{ratio}");
    }
}

#[test]
fn test_zero_entropy_graph_rejected() {
    let mut g = SemanticGraph::new();
    g.add_unit(unit("i", UnitKind::Intent, "", 1.0, 0.0));
    assert!(matches!(no_valve().compress(&g, 0.5), Err(Error::Validation(_))));
    assert!(matches!(no_valve().compress(&SemanticGraph::new(), 0.5), Err(Error::Validation(_))));
}
