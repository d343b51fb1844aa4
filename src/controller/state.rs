//! Run state machine.
//!
//! ```text
//! Init → Encoded → Compressing → AwaitingReconstruction → AwaitingScore ─┬→ Converged → Terminated(Success)
//!                      ▲                                                 ├→ Terminated(Exhausted)
//!                      └─ RetargetingEntropy ← Boosting ← AwaitingLossAnalysis
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    Success,
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Init,
    Encoded,
    Compressing,
    AwaitingReconstruction,
    AwaitingScore,
    AwaitingLossAnalysis,
    Boosting,
    RetargetingEntropy,
    Converged,
    Terminated(Termination),
}

impl RunState {
    pub fn can_transition_to(self, next: RunState) -> bool {
        use RunState::*;
        matches!(
            (self, next),
            (Init, Encoded)
                | (Encoded, Compressing)
                | (Compressing, AwaitingReconstruction)
                | (AwaitingReconstruction, AwaitingScore)
                | (AwaitingScore, Converged)
                | (AwaitingScore, AwaitingLossAnalysis)
                // last iteration without convergence
                | (AwaitingScore, Terminated(Termination::Exhausted))
                | (AwaitingLossAnalysis, Boosting)
                | (Boosting, RetargetingEntropy)
                | (RetargetingEntropy, Compressing)
                | (Converged, Terminated(Termination::Success))
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Terminated(_))
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Terminated(Termination::Success) => write!(f, "Terminated(success)"),
            RunState::Terminated(Termination::Exhausted) => write!(f, "Terminated(exhausted)"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// Current state plus the sequence of states visited so far.
#[derive(Debug, Clone)]
pub struct StateTracker {
    current: RunState,
    history: Vec<RunState>,
}

impl Default for StateTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl StateTracker {
    pub fn new() -> Self {
        Self { current: RunState::Init, history: vec![RunState::Init] }
    }

    pub fn current(&self) -> RunState {
        self.current
    }

    pub fn history(&self) -> &[RunState] {
        &self.history
    }

    pub fn into_history(self) -> Vec<RunState> {
        self.history
    }

    pub fn advance(&mut self, next: RunState) -> Result<()> {
        if !self.current.can_transition_to(next) {
            return Err(Error::Validation(format!(
                "illegal state transition {} -> {}",
                self.current, next
            )));
        }
        debug!(from = %self.current, to = %next, "state transition");
        self.current = next;
        self.history.push(next);
        Ok(())
    }
}
