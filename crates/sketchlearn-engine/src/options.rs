//! Learner configuration.

use serde::{Deserialize, Serialize};
use sketchlearn_ir::collaborators::ComplexityLimits;
use sketchlearn_smt::facts::{EncodingMode, EncodingOptions};

/// Options of one learning run.
///
/// Deserializes from a partial JSON object; missing fields take their
/// defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LearnerOptions {
    /// Novelty width of the tuple graphs.
    pub width: usize,
    pub encoding: EncodingMode,
    pub max_num_rules: usize,
    pub goal_separation: bool,
    pub optimal_width: bool,
    /// Wall-clock budget of the whole loop; 0 is unbounded.
    pub timeout_secs: u64,
    /// Budget of a single solver call; 0 is unbounded.
    pub solver_timeout_secs: u64,
    pub max_num_states_per_instance: usize,
    pub prune_features: bool,
    pub minimize_sketch: bool,
    /// Verify from every alive state instead of the initial states only.
    pub closed_q: bool,
    pub feature_limits: ComplexityLimits,
}

impl Default for LearnerOptions {
    fn default() -> Self {
        Self {
            width: 1,
            encoding: EncodingMode::D2,
            max_num_rules: 4,
            goal_separation: false,
            optimal_width: false,
            timeout_secs: 0,
            solver_timeout_secs: 0,
            max_num_states_per_instance: 10_000,
            prune_features: true,
            minimize_sketch: true,
            closed_q: true,
            feature_limits: ComplexityLimits::default(),
        }
    }
}

impl LearnerOptions {
    pub fn encoding_options(&self) -> EncodingOptions {
        EncodingOptions {
            mode: self.encoding,
            max_num_rules: self.max_num_rules,
            goal_separation: self.goal_separation,
            optimal_width: self.optimal_width,
        }
    }
}
