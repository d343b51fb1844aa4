//! # semgraph: Importance-Ranked Semantic Graph Compression
//!
//! Compresses a natural-language message into a graph of semantic units,
//! prunes that graph under an entropy budget, and iterates reconstruction
//! until a fidelity target is met or the iteration budget runs out.
//!
//! ## Design Principles
//!
//! 1. **Trait-first**: extraction, reconstruction, judging and loss analysis
//!    are collaborator traits; the core never calls a model directly
//! 2. **Clean DTOs**: `SemanticUnit`, `Relation`, `SemanticGraph` cross all boundaries
//! 3. **Compression is pure**: the compressor reads a graph and returns a new one
//! 4. **Explicit shared state**: the only cross-run state is an injected `RateGate`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use semgraph::{AdaptiveController, ControllerConfig};
//!
//! # async fn example() -> semgraph::Result<()> {
//! let controller = AdaptiveController::lexical(ControllerConfig::default())?;
//! let report = controller
//!     .run("Please review the Q3 report for Acme. Revenue fell 23% to 4.5M dollars.")
//!     .await?;
//!
//! println!("{} after {} iterations", report.final_text, report.iterations.len());
//! report.save("run.json")?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Collaborators
//!
//! | Set | Constructor | Description |
//! |-----|-------------|-------------|
//! | Lexical | `AdaptiveController::lexical` | Offline, deterministic reference implementations |
//! | LLM | `AdaptiveController::with_llm` | Any `ChatModel`, spaced by a shared `RateGate` |
//! | Custom | `AdaptiveController::new` | Bring your own trait objects |

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod scoring;
pub mod compress;
pub mod boost;
pub mod collab;
pub mod controller;
pub mod report;

// ============================================================================
// Re-exports: Model (the DTOs)
// ============================================================================

pub use model::{
    SemanticUnit, UnitId, UnitKind, Relation, SemanticGraph,
    SortKey, Value, Metadata,
};

// ============================================================================
// Re-exports: Engine
// ============================================================================

pub use compress::{Compressor, CompressionConfig, CompressionStats, EscapeValve};
pub use boost::boost;

// ============================================================================
// Re-exports: Collaborators
// ============================================================================

pub use collab::{
    StructureExtractor, Reconstructor, FidelityJudge, LossAnalyzer,
    TokenCounter, WordTokenCounter, RateGate,
    ExtractedStructure, ExtractedUnit, ExtractedRelation,
    ChatModel, ChatRequest, LlmCollaborators,
};

// ============================================================================
// Re-exports: Controller
// ============================================================================

pub use controller::{AdaptiveController, ControllerConfig, RunState, Termination};
pub use report::{IterationRecord, RunReport};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Out-of-range input rejected at a boundary.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A collaborator answered, but not in a usable shape.
    #[error("Malformed collaborator output: {0}")]
    MalformedOutput(String),

    /// Transport or model failure inside a collaborator.
    #[error("Collaborator error: {0}")]
    Collaborator(String),

    #[error("Reconstruction failed in iteration {iteration}: {source}")]
    Reconstruction {
        iteration: usize,
        #[source]
        source: Box<Error>,
    },

    #[error("Fidelity judge failed in iteration {iteration}: {source}")]
    Judge {
        iteration: usize,
        #[source]
        source: Box<Error>,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
