//! Ingestion: extractor output → scored `SemanticGraph`.
//!
//! Kind labels are normalized once here. Nothing downstream ever sees a
//! free-form label.

use tracing::{debug, warn};

use crate::model::{keys, Relation, SemanticGraph, SemanticUnit, UnitId, UnitKind, Value};
use crate::scoring;
use crate::{Error, Result};
use super::ExtractedStructure;

/// Content of the placeholder intent in a minimal graph.
pub const FALLBACK_INTENT: &str = "QUERY";

/// Conventional label for a root → unit relation of the given kind.
pub fn relation_label(kind: UnitKind) -> &'static str {
    match kind {
        UnitKind::Intent => "related_to",
        UnitKind::Entity => "has_entity",
        UnitKind::Attribute => "has_attribute",
        UnitKind::Detail => "has_detail",
        UnitKind::Constraint => "constrained_by",
        UnitKind::Outcome => "leads_to",
    }
}

/// The smallest valid graph: one placeholder intent, scored and rooted.
pub fn minimal_graph(text: &str, tokens: usize) -> SemanticGraph {
    let mut graph = SemanticGraph::for_source(text, tokens);
    let id = UnitId::new("u0");
    graph.add_unit(
        SemanticUnit::new(id.clone(), UnitKind::Intent, FALLBACK_INTENT)
            .with_metadata(keys::ORIGIN, "fallback"),
    );
    graph.set_root(id);
    scoring::score_graph(&mut graph);
    graph
}

/// Build a graph from an extraction result.
///
/// `Error::MalformedOutput`, and a structure without any units, degrade to
/// [`minimal_graph`]. Any other error is returned unchanged.
pub fn ingest(text: &str, tokens: usize, extracted: Result<ExtractedStructure>) -> Result<SemanticGraph> {
    match extracted {
        Ok(structure) if structure.units.is_empty() => {
            warn!("extractor returned no units; using minimal graph");
            Ok(minimal_graph(text, tokens))
        }
        Ok(structure) => Ok(build_graph(text, tokens, structure)),
        Err(Error::MalformedOutput(msg)) => {
            warn!(error = %msg, "extractor output malformed; using minimal graph");
            Ok(minimal_graph(text, tokens))
        }
        Err(e) => Err(e),
    }
}

fn build_graph(text: &str, tokens: usize, structure: ExtractedStructure) -> SemanticGraph {
    let mut graph = SemanticGraph::for_source(text, tokens);

    for (n, extracted) in structure.units.into_iter().enumerate() {
        let id = UnitId::new(extracted.id.unwrap_or_else(|| format!("u{n}")));
        if graph.contains(&id) {
            warn!(unit = %id, "duplicate unit id from extractor; keeping the first");
            continue;
        }

        let kind = UnitKind::from_label(&extracted.kind);
        let mut unit = SemanticUnit::new(id, kind, extracted.content.trim())
            .with_metadata(keys::ORIGIN, "extractor")
            .with_metadata(keys::RAW_KIND, extracted.kind);
        if let Some(subtype) = extracted.subtype {
            unit = unit.with_metadata(keys::SUBTYPE, subtype);
        }
        if let Some(hint) = extracted.importance_hint {
            unit = unit.with_metadata(keys::IMPORTANCE_HINT, Value::from(hint));
        }
        graph.add_unit(unit);
    }

    let root = graph.units_by_kind(UnitKind::Intent).first().map(|u| u.id.clone());
    match root {
        Some(id) => {
            graph.set_root(id);
        }
        None => debug!("extracted structure has no intent unit; graph left unrooted"),
    }

    for rel in structure.relations {
        let relation = Relation::new(rel.source, rel.target, rel.relation)
            .with_weight(rel.weight.unwrap_or(1.0));
        let (source, target) = (relation.source.clone(), relation.target.clone());
        if !graph.add_relation(relation) {
            warn!(%source, %target, "dropping relation with unknown endpoint");
        }
    }

    scoring::score_graph(&mut graph);
    graph
}
