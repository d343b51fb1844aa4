//! Prompt construction for model-backed collaborators.
//!
//! The reconstruction contract lives in [`ReconstructionRequest`] so that
//! any reconstructor (model-backed or not) can honour the same rules.

use serde::Serialize;

use crate::model::{SemanticGraph, UnitKind};

/// Verbosity target for reconstruction, in tokens per retained unit.
pub const TOKENS_PER_UNIT: usize = 28;

/// Rules every reconstruction must follow.
pub const RECONSTRUCTION_RULES: &[&str] = &[
    "Reference every listed item; omit none of them.",
    "Copy numbers, dates and amounts exactly as written.",
    "Add nothing that is not listed: no invented facts, names or figures.",
    "No introductions, summaries or filler phrases.",
    "Keep the tone and structure of a direct message.",
];

/// Order in which kinds are presented to a reconstructor.
pub const KIND_ORDER: [UnitKind; 6] = [
    UnitKind::Intent,
    UnitKind::Entity,
    UnitKind::Attribute,
    UnitKind::Detail,
    UnitKind::Constraint,
    UnitKind::Outcome,
];

/// Everything a reconstructor needs, derived from a compressed graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconstructionRequest {
    /// Non-empty kind sections in [`KIND_ORDER`]; the root intent comes first
    /// within its section. Units with empty content have nothing to list.
    pub sections: Vec<(UnitKind, Vec<String>)>,
    /// Every retained unit, listed or not.
    pub unit_count: usize,
    /// Approximate length to aim for.
    pub target_tokens: usize,
}

impl ReconstructionRequest {
    pub fn from_graph(graph: &SemanticGraph) -> Self {
        let root_id = graph.root_id();
        let mut sections = Vec::new();

        for kind in KIND_ORDER {
            let mut units = graph.units_by_kind(kind);
            // Root first; stable otherwise.
            units.sort_by_key(|u| Some(&u.id) != root_id);
            let contents: Vec<String> = units
                .into_iter()
                .filter(|u| !u.content.is_empty())
                .map(|u| u.content.clone())
                .collect();
            if !contents.is_empty() {
                sections.push((kind, contents));
            }
        }

        let unit_count = graph.unit_count();
        Self {
            sections,
            unit_count,
            target_tokens: unit_count * TOKENS_PER_UNIT,
        }
    }

    /// All contents in presentation order.
    pub fn items(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().flat_map(|(_, items)| items.iter().map(String::as_str))
    }

    /// System prompt for a chat model.
    pub fn render(&self) -> String {
        let mut out = String::from(
            "You are a semantic decoder. Rebuild the original message from the items below.\n\n",
        );
        for kind in KIND_ORDER {
            let items = self
                .sections
                .iter()
                .find(|(k, _)| *k == kind)
                .map(|(_, items)| items.join("; "))
                .unwrap_or_else(|| "None".to_string());
            out.push_str(&format!("- {}: {}\n", section_title(kind), items));
        }
        out.push_str("\nRules:\n");
        for (n, rule) in RECONSTRUCTION_RULES.iter().enumerate() {
            out.push_str(&format!("{}. {}\n", n + 1, rule));
        }
        out.push_str(&format!(
            "\nAim for about {} tokens ({} units). Output only the message.",
            self.target_tokens, self.unit_count
        ));
        out
    }
}

fn section_title(kind: UnitKind) -> &'static str {
    match kind {
        UnitKind::Intent => "Intent",
        UnitKind::Entity => "Entities",
        UnitKind::Attribute => "Attributes",
        UnitKind::Detail => "Details",
        UnitKind::Constraint => "Constraints",
        UnitKind::Outcome => "Outcomes",
    }
}

pub const EXTRACTION_PROMPT: &str = r#"You extract a semantic graph from a message.

Return JSON with this shape:
{
  "intent": "the requested action, e.g. ANALYZE, GENERATE, EVALUATE, REPORT",
  "entities":    [{"content": "...", "type": "person|organization|system|document", "importance": "critical|high|medium|low"}],
  "attributes":  [{"content": "...", "type": "quantity|timeframe|status|priority", "importance": "..."}],
  "details":     [{"content": "...", "type": "context|explanation", "importance": "..."}],
  "constraints": [{"content": "...", "importance": "..."}],
  "outcomes":    [{"content": "...", "importance": "..."}]
}

Capture every fact, number, name and deadline. Output only JSON."#;

pub const JUDGE_PROMPT: &str = r#"You grade how much of the ORIGINAL message's meaning the CANDIDATE preserves.

Score 1.0 when every fact, number and request survives, 0.0 when nothing does.

Return JSON: {"similarity": <number between 0 and 1>}. Output only JSON."#;

/// Prompt asking which concepts of `original` are missing from `candidate`.
pub fn loss_analysis_prompt(original: &str, candidate: &str) -> String {
    format!(
        r#"List information that is present in the ORIGINAL message but missing or changed in the CANDIDATE.

ORIGINAL:
{original}

CANDIDATE:
{candidate}

Look for missing numbers, dates and metrics; missing names and entities; missing actions or requirements; missing deadlines and constraints.

Return JSON: {{"missing_concepts": ["...", "..."]}}. Output only JSON."#
    )
}

/// User turn for the judge.
pub fn judge_input(original: &str, candidate: &str) -> String {
    format!("ORIGINAL:\n{original}\n\nCANDIDATE:\n{candidate}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SemanticUnit;

    fn graph() -> SemanticGraph {
        let mut g = SemanticGraph::new();
        g.add_unit(SemanticUnit::new("d", UnitKind::Detail, "context here"));
        g.add_unit(SemanticUnit::new("i2", UnitKind::Intent, "secondary"));
        g.add_unit(SemanticUnit::new("i", UnitKind::Intent, "ANALYZE"));
        g.add_unit(SemanticUnit::new("a", UnitKind::Attribute, "23% decline"));
        g.add_unit(SemanticUnit::new("e", UnitKind::Entity, ""));
        g.set_root("i".into());
        g
    }

    #[test]
    fn test_sections_in_kind_order_root_first() {
        let req = ReconstructionRequest::from_graph(&graph());
        let items: Vec<&str> = req.items().collect();
        assert_eq!(items, vec!["ANALYZE", "secondary", "23% decline", "context here"]);
        assert_eq!(req.unit_count, 5);
        assert_eq!(req.target_tokens, 5 * TOKENS_PER_UNIT);
    }

    #[test]
    fn test_render_lists_every_item_and_rules() {
        let req = ReconstructionRequest::from_graph(&graph());
        let prompt = req.render();
        for item in req.items() {
            assert!(prompt.contains(item), "missing {item}");
        }
        assert!(prompt.contains("Entities: None"));
        assert!(prompt.contains("about 140 tokens"));
        for rule in RECONSTRUCTION_RULES {
            assert!(prompt.contains(rule));
        }
    }

    #[test]
    fn test_loss_prompt_embeds_texts() {
        let p = loss_analysis_prompt("orig text", "cand text");
        assert!(p.contains("orig text"));
        assert!(p.contains("cand text"));
        assert!(p.contains("missing_concepts"));
    }
}
