//! Model-backed collaborators.
//!
//! `LlmCollaborators` implements all four collaborator contracts on top of
//! any [`ChatModel`]. The HTTP client itself is the caller's: implement
//! `ChatModel` for it. Every call goes through the shared [`RateGate`].

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use tracing::debug;

use crate::model::{SemanticGraph, UnitKind};
use crate::{Error, Result};
use super::gate::RateGate;
use super::ingest::{relation_label, FALLBACK_INTENT};
use super::prompt::{self, ReconstructionRequest};
use super::{
    ExtractedRelation, ExtractedStructure, ExtractedUnit, FidelityJudge, LossAnalyzer,
    Reconstructor, StructureExtractor,
};

// ============================================================================
// Chat model seam
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: ChatRole::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }
}

/// One chat completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    /// Ask the model for a JSON object.
    pub json_mode: bool,
    pub temperature: f64,
}

impl ChatRequest {
    fn new(system: impl Into<String>, user: impl Into<String>, json_mode: bool) -> Self {
        Self {
            messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
            json_mode,
            temperature: 0.0,
        }
    }
}

/// A chat completion endpoint.
///
/// Transport failures should be reported as `Error::Collaborator`.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn chat(&self, request: ChatRequest) -> Result<String>;
}

#[async_trait]
impl<M: ChatModel + ?Sized> ChatModel for Arc<M> {
    async fn chat(&self, request: ChatRequest) -> Result<String> {
        (**self).chat(request).await
    }
}

// ============================================================================
// LlmCollaborators
// ============================================================================

/// Extractor, reconstructor, judge and loss analyzer over one model.
pub struct LlmCollaborators<M> {
    model: M,
    gate: RateGate,
}

impl<M: ChatModel> LlmCollaborators<M> {
    pub fn new(model: M, gate: RateGate) -> Self {
        Self { model, gate }
    }

    pub fn gate(&self) -> &RateGate {
        &self.gate
    }

    async fn call(&self, request: ChatRequest) -> Result<String> {
        self.gate.acquire().await;
        self.model.chat(request).await
    }
}

#[async_trait]
impl<M: ChatModel> StructureExtractor for LlmCollaborators<M> {
    async fn extract(&self, text: &str) -> Result<ExtractedStructure> {
        let response = self.call(ChatRequest::new(prompt::EXTRACTION_PROMPT, text, true)).await?;
        parse_structure(&response)
    }
}

#[async_trait]
impl<M: ChatModel> Reconstructor for LlmCollaborators<M> {
    async fn reconstruct(&self, graph: &SemanticGraph) -> Result<String> {
        let request = ReconstructionRequest::from_graph(graph);
        let response = self
            .call(ChatRequest::new(request.render(), "Reconstruct the message.", false))
            .await?;
        let text = response.trim();
        if text.is_empty() {
            return Err(Error::MalformedOutput("reconstructor returned empty text".into()));
        }
        Ok(text.to_string())
    }
}

#[async_trait]
impl<M: ChatModel> FidelityJudge for LlmCollaborators<M> {
    async fn score(&self, original: &str, candidate: &str) -> Result<f64> {
        let response = self
            .call(ChatRequest::new(prompt::JUDGE_PROMPT, prompt::judge_input(original, candidate), true))
            .await?;
        parse_similarity(&response)
    }
}

#[async_trait]
impl<M: ChatModel> LossAnalyzer for LlmCollaborators<M> {
    async fn diagnose_loss(&self, original: &str, candidate: &str) -> Result<Vec<String>> {
        let response = self
            .call(ChatRequest::new(
                prompt::loss_analysis_prompt(original, candidate),
                "Analyze the loss.",
                true,
            ))
            .await?;
        parse_missing_concepts(&response)
    }
}

// ============================================================================
// Response parsing
// ============================================================================

fn parse_json(response: &str) -> Result<Json> {
    let body = strip_code_fence(response.trim());
    serde_json::from_str(body).map_err(|e| Error::MalformedOutput(format!("invalid JSON: {e}")))
}

/// Models sometimes wrap JSON in a ```json fence.
fn strip_code_fence(s: &str) -> &str {
    let Some(rest) = s.strip_prefix("```") else {
        return s;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Accepts the flat `{"units": [...], "relations": [...]}` form and the
/// sectioned `{"intent": .., "entities": [..], ...}` form.
pub fn parse_structure(response: &str) -> Result<ExtractedStructure> {
    let json = parse_json(response)?;
    let Json::Object(map) = &json else {
        return Err(Error::MalformedOutput("extraction is not a JSON object".into()));
    };

    if map.contains_key("units") || map.contains_key("nodes") {
        return serde_json::from_value(json)
            .map_err(|e| Error::MalformedOutput(format!("bad unit list: {e}")));
    }

    let mut structure = ExtractedStructure::default();
    let intent = match map.get("intent") {
        Some(Json::String(s)) => s.clone(),
        Some(Json::Object(o)) => o.get("content").and_then(Json::as_str).unwrap_or_default().to_string(),
        _ => String::new(),
    };
    let intent = if intent.trim().is_empty() { FALLBACK_INTENT.to_string() } else { intent };
    let root = "u0".to_string();
    structure.units.push(ExtractedUnit::new("intent", intent).with_id(root.clone()));

    let sections = [
        ("entities", UnitKind::Entity),
        ("attributes", UnitKind::Attribute),
        ("details", UnitKind::Detail),
        ("constraints", UnitKind::Constraint),
        ("outcomes", UnitKind::Outcome),
    ];
    for (key, kind) in sections {
        let Some(Json::Array(items)) = map.get(key) else {
            continue;
        };
        for item in items {
            let Some(mut unit) = section_item(kind, item) else {
                debug!(section = key, "skipping unusable extraction item");
                continue;
            };
            let id = format!("u{}", structure.units.len());
            unit.id = Some(id.clone());
            structure.relations.push(ExtractedRelation::new(root.clone(), id, relation_label(kind)));
            structure.units.push(unit);
        }
    }
    Ok(structure)
}

fn section_item(kind: UnitKind, item: &Json) -> Option<ExtractedUnit> {
    match item {
        Json::String(s) if !s.trim().is_empty() => Some(ExtractedUnit::new(kind.as_str(), s.clone())),
        Json::Object(o) => {
            let content = o.get("content").and_then(Json::as_str)?.trim();
            if content.is_empty() {
                return None;
            }
            let mut unit = ExtractedUnit::new(kind.as_str(), content);
            unit.subtype = o.get("type").and_then(Json::as_str).map(str::to_string);
            unit.importance_hint = o.get("importance").cloned();
            Some(unit)
        }
        _ => None,
    }
}

/// `{"similarity": 0.83}`, `{"score": 0.83}` or a bare number.
pub fn parse_similarity(response: &str) -> Result<f64> {
    let json = parse_json(response)?;
    let value = match &json {
        Json::Number(n) => n.as_f64(),
        Json::Object(o) => o
            .get("similarity")
            .or_else(|| o.get("score"))
            .and_then(Json::as_f64),
        _ => None,
    };
    value.ok_or_else(|| Error::MalformedOutput(format!("no similarity in judge output: {json}")))
}

/// `{"missing_concepts": [...]}` or a bare array of strings.
pub fn parse_missing_concepts(response: &str) -> Result<Vec<String>> {
    let json = parse_json(response)?;
    let items = match &json {
        Json::Array(items) => items,
        Json::Object(o) => match o.get("missing_concepts") {
            Some(Json::Array(items)) => items,
            Some(Json::Null) | None => return Ok(Vec::new()),
            Some(other) => {
                return Err(Error::MalformedOutput(format!("missing_concepts is not a list: {other}")));
            }
        },
        _ => return Err(Error::MalformedOutput("loss analysis is not a list or object".into())),
    };
    Ok(items
        .iter()
        .filter_map(Json::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect())
}
