//! # Run Report
//!
//! The one persisted artifact of a compression run: per-iteration telemetry
//! plus the final outcome. Serialized with `serde_json`.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::controller::RunState;
use crate::model::SemanticGraph;
use crate::Result;

/// Telemetry of one controller iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    /// 1-based.
    pub iteration: usize,
    pub entropy_target: f64,
    pub nodes_kept: usize,
    pub total_nodes: usize,
    pub candidate_tokens: usize,
    pub candidate_chars: usize,
    pub original_tokens: usize,
    /// `candidate_tokens / original_tokens`, 0 for an empty source.
    pub compression_ratio: f64,
    pub similarity: f64,
    /// Empty when the iteration converged, was the last one, or the loss
    /// analyzer failed.
    pub missing_concepts: Vec<String>,
    pub missing_concept_count: usize,
    pub boosted_units: usize,
    pub entropy_retention: f64,
    pub importance_retention: f64,
    pub candidate_text: String,
}

/// Outcome of a full run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Whether some iteration reached the target similarity.
    pub success: bool,
    /// First converging iteration, if any.
    pub converged_at: Option<usize>,
    pub iterations: Vec<IterationRecord>,
    pub final_text: String,
    pub final_similarity: f64,
    pub final_compression: f64,
    pub original_tokens: usize,
    pub final_tokens: usize,
    /// States visited, in order.
    pub states: Vec<RunState>,
    /// Compressed graph behind `final_text`.
    pub final_graph: SemanticGraph,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    pub fn last_iteration(&self) -> Option<&IterationRecord> {
        self.iterations.last()
    }

    pub fn iteration_count(&self) -> usize {
        self.iterations.len()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_json<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_json(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}
