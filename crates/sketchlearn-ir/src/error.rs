use thiserror::Error;

use crate::feature::FeatureId;
use crate::instance::StateId;

/// Errors raised while building or reading the learner's data model.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IrError {
    #[error("state {state} is out of range for an instance with {num_states} states")]
    StateOutOfRange { state: StateId, num_states: usize },
    #[error("no valuation of feature {feature} for state {state}")]
    MissingValuation { feature: FeatureId, state: StateId },
    #[error("feature `{repr}` has no valuation in instance `{instance}`")]
    UnknownFeature { repr: String, instance: String },
    #[error("feature `{repr}` in instance `{instance}` has {found} values, expected {expected}")]
    ValuationLength {
        repr: String,
        instance: String,
        found: usize,
        expected: usize,
    },
    #[error("feature id {0} is not in the pool")]
    FeatureIdOutOfRange(FeatureId),
    #[error("unknown instance `{0}`")]
    UnknownInstance(String),
    #[error("invalid problem class: {0}")]
    InvalidProblem(String),
    #[error("policy parse error: {0}")]
    PolicyParse(String),
}
