//! Controller configuration.

use serde::{Deserialize, Serialize};

use crate::compress::CompressionConfig;
use crate::{Error, Result};

/// Knobs of one adaptive compression run.
///
/// | Field | Default |
/// |-------|---------|
/// | `target_similarity` | 0.80 |
/// | `max_iterations` | 5 |
/// | `initial_entropy_target` | 0.40 |
/// | `entropy_step` | 0.10 |
/// | `max_entropy_target` | 0.95 |
/// | `relax_below` | 0.70 |
/// | `long_input_tokens` | 1000 |
/// | `long_input_entropy_target` | 0.90 |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Similarity at or above which a run converges.
    pub target_similarity: f64,
    pub max_iterations: usize,
    /// Entropy retention of the first iteration for ordinary inputs.
    pub initial_entropy_target: f64,
    /// Added to the entropy target when an iteration scores below `relax_below`.
    pub entropy_step: f64,
    /// Upper clamp for the relaxed target.
    pub max_entropy_target: f64,
    pub relax_below: f64,
    /// Inputs with more tokens than this start at `long_input_entropy_target`.
    pub long_input_tokens: usize,
    pub long_input_entropy_target: f64,
    pub compression: CompressionConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            target_similarity: 0.80,
            max_iterations: 5,
            initial_entropy_target: 0.40,
            entropy_step: 0.10,
            max_entropy_target: 0.95,
            relax_below: 0.70,
            long_input_tokens: 1000,
            long_input_entropy_target: 0.90,
            compression: CompressionConfig::default(),
        }
    }
}

impl ControllerConfig {
    pub fn with_target_similarity(mut self, target: f64) -> Self {
        self.target_similarity = target;
        self
    }

    pub fn with_max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = n;
        self
    }

    pub fn with_initial_entropy_target(mut self, target: f64) -> Self {
        self.initial_entropy_target = target;
        self
    }

    pub fn with_entropy_step(mut self, step: f64) -> Self {
        self.entropy_step = step;
        self
    }

    pub fn with_max_entropy_target(mut self, cap: f64) -> Self {
        self.max_entropy_target = cap;
        self
    }

    pub fn with_relax_below(mut self, threshold: f64) -> Self {
        self.relax_below = threshold;
        self
    }

    pub fn with_long_input(mut self, tokens: usize, entropy_target: f64) -> Self {
        self.long_input_tokens = tokens;
        self.long_input_entropy_target = entropy_target;
        self
    }

    pub fn with_compression(mut self, compression: CompressionConfig) -> Self {
        self.compression = compression;
        self
    }

    /// Entropy target of the first iteration for an input of `tokens` tokens.
    pub fn initial_target_for(&self, tokens: usize) -> f64 {
        if tokens > self.long_input_tokens {
            self.long_input_entropy_target
        } else {
            self.initial_entropy_target
        }
    }

    /// Next entropy target after an iteration scored `similarity`.
    pub fn next_target(&self, current: f64, similarity: f64) -> f64 {
        if similarity < self.relax_below {
            (current + self.entropy_step).min(self.max_entropy_target)
        } else {
            current
        }
    }

    pub fn validate(&self) -> Result<()> {
        let unit_fields = [
            ("target_similarity", self.target_similarity),
            ("initial_entropy_target", self.initial_entropy_target),
            ("max_entropy_target", self.max_entropy_target),
            ("relax_below", self.relax_below),
            ("long_input_entropy_target", self.long_input_entropy_target),
        ];
        for (name, value) in unit_fields {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::Validation(format!("{name} must be in [0, 1], got {value}")));
            }
        }
        if self.max_iterations == 0 {
            return Err(Error::Validation("max_iterations must be at least 1".into()));
        }
        if self.entropy_step.is_nan() || self.entropy_step < 0.0 {
            return Err(Error::Validation(format!(
                "entropy_step must be non-negative, got {}",
                self.entropy_step
            )));
        }
        if self.initial_entropy_target > self.max_entropy_target
            || self.long_input_entropy_target > self.max_entropy_target
        {
            return Err(Error::Validation("initial entropy targets must not exceed max_entropy_target".into()));
        }
        self.compression.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        ControllerConfig::default().validate().unwrap();
    }

    #[test]
    fn test_initial_target_for_long_input() {
        let c = ControllerConfig::default();
        assert_eq!(c.initial_target_for(1000), 0.40);
        assert_eq!(c.initial_target_for(1001), 0.90);
    }

    #[test]
    fn test_next_target_relaxes_only_below_threshold() {
        let c = ControllerConfig::default();
        assert!((c.next_target(0.40, 0.50) - 0.50).abs() < 1e-12);
        assert_eq!(c.next_target(0.40, 0.75), 0.40);
        assert_eq!(c.next_target(0.90, 0.10), 0.95);
        assert_eq!(c.next_target(0.95, 0.10), 0.95);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad = [
            ControllerConfig::default().with_target_similarity(1.5),
            ControllerConfig::default().with_max_iterations(0),
            ControllerConfig::default().with_entropy_step(f64::NAN),
            ControllerConfig::default().with_initial_entropy_target(f64::NAN),
            ControllerConfig::default().with_max_entropy_target(0.3),
        ];
        for config in bad {
            assert!(matches!(config.validate(), Err(Error::Validation(_))), "{config:?}");
        }
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let c: ControllerConfig = serde_json::from_str(r#"{"max_iterations": 3}"#).unwrap();
        assert_eq!(c.max_iterations, 3);
        assert_eq!(c.target_similarity, 0.80);
        assert!(c.compression.escape_valve.is_some());
    }
}
