//! Contracts of the external collaborators that feed the learner.
//!
//! State spaces, tuple graphs and feature valuations are produced outside
//! the learner. These traits are the boundary; [`crate::problem`] implements
//! all of them from precomputed JSON data.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::IrError;
use crate::feature::{Feature, FeatureValue};
use crate::instance::{InstanceData, StateId, StateSpace, TupleGraph};

/// Why an instance was dropped before learning. Never fatal.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InstanceRejection {
    #[error("instance is unsolvable")]
    Unsolvable,
    #[error("instance is trivially solvable")]
    TriviallySolvable,
    #[error("instance exceeds the state limit ({num_states} > {limit})")]
    ExceededStateLimit { num_states: usize, limit: usize },
    #[error("state space generation exceeded {secs}s")]
    ExceededTimeLimit { secs: u64 },
    #[error("alive state {state} has no tuple graph")]
    MissingTupleGraph { state: StateId },
}

/// Per-category complexity bounds handed to the feature generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ComplexityLimits {
    pub concept: u32,
    pub role: u32,
    pub boolean: u32,
    pub count_numerical: u32,
    pub distance_numerical: u32,
    /// Upper bound on the number of generated features.
    pub feature_limit: usize,
}

impl Default for ComplexityLimits {
    fn default() -> Self {
        Self {
            concept: 9,
            role: 9,
            boolean: 9,
            count_numerical: 9,
            distance_numerical: 9,
            feature_limit: 1_000_000,
        }
    }
}

pub trait StateSpaceProvider {
    type Description;

    fn instance_name(&self, description: &Self::Description) -> String;

    fn state_space(&self, description: &Self::Description)
        -> Result<StateSpace, InstanceRejection>;
}

pub trait TupleGraphProvider<D> {
    /// Tuple graph of `root` at novelty `width`; `None` for goals and dead ends.
    fn tuple_graph(
        &self,
        description: &D,
        state_space: &StateSpace,
        root: StateId,
        width: usize,
    ) -> Option<TupleGraph>;
}

pub trait FeatureGenerator {
    /// Deduplicated features for the states of `instances`, with the
    /// generator's own complexity scores.
    fn generate(
        &self,
        instances: &[&InstanceData],
        limits: &ComplexityLimits,
    ) -> Result<Vec<Feature>, IrError>;
}

pub trait FeatureEvaluator {
    /// Value of `feature` in every state of `instance`, indexed by state id.
    fn evaluate(
        &self,
        feature: &Feature,
        instance: &InstanceData,
    ) -> Result<Vec<FeatureValue>, IrError>;
}

/// A manually specified feature list used instead of generation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixedFeatures(pub Vec<Feature>);

impl FeatureGenerator for FixedFeatures {
    fn generate(
        &self,
        _instances: &[&InstanceData],
        limits: &ComplexityLimits,
    ) -> Result<Vec<Feature>, IrError> {
        Ok(self.0.iter().take(limits.feature_limit).cloned().collect())
    }
}
