//! # Adaptive Controller
//!
//! Drives one compression run as a closed feedback loop:
//!
//! ```text
//! encode once ─> ┌ compress original graph at target ─> reconstruct ─> score ┐
//!                │                                                          │ similarity ≥ target → success
//!                └─ relax target (if < relax_below) <─ boost <─ diagnose ───┘ otherwise (not last)
//! ```
//!
//! Every iteration compresses the persistent, possibly boosted, source
//! graph. A compressed graph is never compressed again.
//!
//! ## Failure policy
//!
//! | Collaborator | On error |
//! |--------------|----------|
//! | extractor | `MalformedOutput` → minimal graph, continue; other errors abort |
//! | reconstructor | `Error::Reconstruction { iteration, .. }` |
//! | judge | `Error::Judge { iteration, .. }` |
//! | loss analyzer | logged, treated as no missing concepts |

pub mod config;
pub mod state;

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::boost;
use crate::collab::{
    ingest, minimal_graph, ChatModel, FidelityJudge, LexicalJudge, LexicalLossAnalyzer,
    LlmCollaborators, LossAnalyzer, RateGate, Reconstructor, SentenceExtractor,
    StructureExtractor, TemplateReconstructor, TokenCounter, WordTokenCounter,
};
use crate::compress::{CompressionStats, Compressor};
use crate::model::SemanticGraph;
use crate::report::{IterationRecord, RunReport};
use crate::{Error, Result};

pub use config::ControllerConfig;
pub use state::{RunState, StateTracker, Termination};

/// Orchestrates extraction, compression, reconstruction, scoring and
/// boosting for one input text at a time.
///
/// Holds no per-run state, so one controller can serve concurrent runs.
#[derive(Clone)]
pub struct AdaptiveController {
    config: ControllerConfig,
    compressor: Compressor,
    extractor: Arc<dyn StructureExtractor>,
    reconstructor: Arc<dyn Reconstructor>,
    judge: Arc<dyn FidelityJudge>,
    loss_analyzer: Arc<dyn LossAnalyzer>,
    tokens: Arc<dyn TokenCounter>,
}

impl AdaptiveController {
    pub fn new(
        config: ControllerConfig,
        extractor: Arc<dyn StructureExtractor>,
        reconstructor: Arc<dyn Reconstructor>,
        judge: Arc<dyn FidelityJudge>,
        loss_analyzer: Arc<dyn LossAnalyzer>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            compressor: Compressor::new(config.compression.clone()),
            config,
            extractor,
            reconstructor,
            judge,
            loss_analyzer,
            tokens: Arc::new(WordTokenCounter),
        })
    }

    /// Controller over the offline lexical collaborators.
    pub fn lexical(config: ControllerConfig) -> Result<Self> {
        Self::new(
            config,
            Arc::new(SentenceExtractor),
            Arc::new(TemplateReconstructor),
            Arc::new(LexicalJudge),
            Arc::new(LexicalLossAnalyzer::default()),
        )
    }

    /// Controller whose four collaborators share one chat model and gate.
    pub fn with_llm<M: ChatModel + 'static>(config: ControllerConfig, model: M, gate: RateGate) -> Result<Self> {
        let llm = Arc::new(LlmCollaborators::new(model, gate));
        Self::new(config, llm.clone(), llm.clone(), llm.clone(), llm)
    }

    pub fn with_token_counter(mut self, counter: impl TokenCounter + 'static) -> Self {
        self.tokens = Arc::new(counter);
        self
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Extract and score the working graph for `text`.
    pub async fn encode(&self, text: &str) -> Result<SemanticGraph> {
        let tokens = self.tokens.count(text);
        let graph = ingest(text, tokens, self.extractor.extract(text).await)?;
        if graph.total_entropy() > 0.0 {
            return Ok(graph);
        }
        warn!(units = graph.unit_count(), "extracted graph carries no entropy; using minimal graph");
        Ok(minimal_graph(text, tokens))
    }

    /// Run the loop until the target similarity is reached or the iteration
    /// budget is spent.
    ///
    /// An exhausted run is still `Ok`: the report carries the last
    /// iteration's result with `success == false`.
    pub async fn run(&self, text: &str) -> Result<RunReport> {
        let started_at = Utc::now();
        let mut state = StateTracker::new();
        let original_tokens = self.tokens.count(text);

        let mut graph = self.encode(text).await?;
        state.advance(RunState::Encoded)?;
        info!(
            units = graph.unit_count(),
            relations = graph.relation_count(),
            tokens = original_tokens,
            total_entropy = graph.total_entropy(),
            "encoded source"
        );

        let max_iterations = self.config.max_iterations;
        let mut target = self.config.initial_target_for(original_tokens);
        let mut records: Vec<IterationRecord> = Vec::with_capacity(max_iterations);
        let mut outcome: Option<(SemanticGraph, String)> = None;
        let mut converged_at = None;

        for iteration in 1..=max_iterations {
            state.advance(RunState::Compressing)?;
            let compressed = self.compressor.compress(&graph, target)?;
            let stats = CompressionStats::between(&graph, &compressed);

            state.advance(RunState::AwaitingReconstruction)?;
            let candidate = self
                .reconstructor
                .reconstruct(&compressed)
                .await
                .map_err(|e| Error::Reconstruction { iteration, source: Box::new(e) })?;

            state.advance(RunState::AwaitingScore)?;
            let similarity = self.score(iteration, text, &candidate).await?;

            let candidate_tokens = self.tokens.count(&candidate);
            let mut record = IterationRecord {
                iteration,
                entropy_target: target,
                nodes_kept: compressed.unit_count(),
                total_nodes: graph.unit_count(),
                candidate_tokens,
                candidate_chars: candidate.chars().count(),
                original_tokens,
                compression_ratio: compression_ratio(candidate_tokens, original_tokens),
                similarity,
                missing_concepts: Vec::new(),
                missing_concept_count: 0,
                boosted_units: 0,
                entropy_retention: stats.entropy_retention,
                importance_retention: stats.importance_retention,
                candidate_text: candidate.clone(),
            };

            let converged = similarity >= self.config.target_similarity;
            let last = iteration == max_iterations;

            if !converged && !last {
                state.advance(RunState::AwaitingLossAnalysis)?;
                let missing = match self.loss_analyzer.diagnose_loss(text, &candidate).await {
                    Ok(missing) => missing,
                    Err(e) => {
                        warn!(iteration, error = %e, "loss analysis failed; continuing without concepts");
                        Vec::new()
                    }
                };

                state.advance(RunState::Boosting)?;
                record.boosted_units = boost::boost(&mut graph, &missing);
                record.missing_concept_count = missing.len();
                record.missing_concepts = missing;

                state.advance(RunState::RetargetingEntropy)?;
                let next = self.config.next_target(target, similarity);
                if next != target {
                    debug!(iteration, from = target, to = next, "relaxing entropy target");
                }
                target = next;
            }

            info!(
                iteration,
                entropy_target = record.entropy_target,
                nodes_kept = record.nodes_kept,
                total_nodes = record.total_nodes,
                candidate_tokens,
                compression_ratio = record.compression_ratio,
                similarity,
                missing_concepts = record.missing_concept_count,
                boosted = record.boosted_units,
                entropy_retention = record.entropy_retention,
                importance_retention = record.importance_retention,
                "iteration complete"
            );
            records.push(record);
            outcome = Some((compressed, candidate));

            if converged {
                converged_at = Some(iteration);
                state.advance(RunState::Converged)?;
                state.advance(RunState::Terminated(Termination::Success))?;
                break;
            }
            if last {
                state.advance(RunState::Terminated(Termination::Exhausted))?;
            }
        }

        let (final_graph, final_text) =
            outcome.ok_or_else(|| Error::Validation("run finished without any iteration".into()))?;
        let (final_similarity, final_compression, final_tokens) = records
            .last()
            .map(|r| (r.similarity, r.compression_ratio, r.candidate_tokens))
            .unwrap_or_default();

        match converged_at {
            Some(iteration) => info!(iteration, similarity = final_similarity, "run converged"),
            None => warn!(
                iterations = records.len(),
                similarity = final_similarity,
                "run exhausted without reaching target similarity"
            ),
        }

        Ok(RunReport {
            success: converged_at.is_some(),
            converged_at,
            iterations: records,
            final_text,
            final_similarity,
            final_compression,
            original_tokens,
            final_tokens,
            states: state.into_history(),
            final_graph,
            started_at,
            finished_at: Utc::now(),
        })
    }

    /// Judge call with output checking: non-finite scores are errors,
    /// out-of-range ones are clamped.
    async fn score(&self, iteration: usize, original: &str, candidate: &str) -> Result<f64> {
        let raw = self
            .judge
            .score(original, candidate)
            .await
            .map_err(|e| Error::Judge { iteration, source: Box::new(e) })?;
        if !raw.is_finite() {
            return Err(Error::Judge {
                iteration,
                source: Box::new(Error::MalformedOutput(format!("non-finite similarity {raw}"))),
            });
        }
        if !(0.0..=1.0).contains(&raw) {
            warn!(iteration, similarity = raw, "judge score out of range; clamping");
        }
        Ok(raw.clamp(0.0, 1.0))
    }
}

fn compression_ratio(candidate_tokens: usize, original_tokens: usize) -> f64 {
    if original_tokens == 0 {
        0.0
    } else {
        candidate_tokens as f64 / original_tokens as f64
    }
}
