//! JSON problem-class format.
//!
//! A problem class carries precomputed state spaces, tuple graphs and
//! feature valuations for a set of instances of one domain, and implements
//! every collaborator trait on top of that data.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::collaborators::{
    ComplexityLimits, FeatureEvaluator, FeatureGenerator, InstanceRejection, StateSpaceProvider,
    TupleGraphProvider,
};
use crate::error::IrError;
use crate::feature::{Feature, FeatureValue};
use crate::instance::{InstanceData, StateId, StateSpace, TupleGraph};

pub const PROBLEM_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProblemClass {
    pub schema_version: u32,
    #[serde(default)]
    pub domain: String,
    pub features: Vec<Feature>,
    pub instances: Vec<InstanceSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstanceSpec {
    pub name: String,
    pub num_states: usize,
    #[serde(default)]
    pub initial: Vec<StateId>,
    pub goals: Vec<StateId>,
    pub transitions: Vec<(StateId, StateId)>,
    #[serde(default)]
    pub tuple_graphs: Vec<TupleGraphSpec>,
    /// Feature representation to one value per state.
    #[serde(default)]
    pub valuations: BTreeMap<String, Vec<FeatureValue>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TupleGraphSpec {
    pub root: StateId,
    /// `layers[d]` holds the covered states of every tuple at distance `d`.
    pub layers: Vec<Vec<Vec<StateId>>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProblemValidationError {
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for ProblemValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

impl ProblemClass {
    /// Parse and validate. All validation errors are reported together.
    pub fn from_json(text: &str) -> Result<Self, IrError> {
        let problem: ProblemClass =
            serde_json::from_str(text).map_err(|e| IrError::InvalidProblem(e.to_string()))?;
        let errors = problem.validate();
        if errors.is_empty() {
            Ok(problem)
        } else {
            let joined = errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            Err(IrError::InvalidProblem(joined))
        }
    }

    pub fn validate(&self) -> Vec<ProblemValidationError> {
        let mut errors = Vec::new();
        let mut push = |path: String, message: String| {
            errors.push(ProblemValidationError { path, message })
        };

        if self.schema_version != PROBLEM_SCHEMA_VERSION {
            push(
                "schema_version".into(),
                format!(
                    "unsupported version {} (expected {PROBLEM_SCHEMA_VERSION})",
                    self.schema_version
                ),
            );
        }

        let mut feature_reprs = BTreeSet::new();
        for (i, feature) in self.features.iter().enumerate() {
            if !feature_reprs.insert(feature.repr.as_str()) {
                push(format!("features[{i}]"), format!("duplicate feature `{}`", feature.repr));
            }
        }

        let mut names = BTreeSet::new();
        for (i, instance) in self.instances.iter().enumerate() {
            let at = format!("instances[{i}]");
            if !names.insert(instance.name.as_str()) {
                push(at.clone(), format!("duplicate instance name `{}`", instance.name));
            }
            let n = instance.num_states;
            let out_of_range = |s: &StateId| *s >= n;
            if instance.initial.iter().any(out_of_range) || instance.goals.iter().any(out_of_range)
            {
                push(at.clone(), "initial or goal state out of range".into());
            }
            if instance
                .transitions
                .iter()
                .any(|(from, to)| *from >= n || *to >= n)
            {
                push(format!("{at}.transitions"), "state out of range".into());
            }
            for (j, graph) in instance.tuple_graphs.iter().enumerate() {
                let covered_out_of_range = graph.layers.iter().flatten().flatten().any(out_of_range);
                if graph.root >= n || covered_out_of_range {
                    push(format!("{at}.tuple_graphs[{j}]"), "state out of range".into());
                }
            }
            for (repr, values) in &instance.valuations {
                let path = format!("{at}.valuations[{repr}]");
                let Some(feature) = self.features.iter().find(|f| &f.repr == repr) else {
                    push(path, "valuation of an undeclared feature".into());
                    continue;
                };
                if values.len() != n {
                    push(path.clone(), format!("{} values for {n} states", values.len()));
                }
                if values.iter().any(|v| v.kind() != feature.kind) {
                    push(path, format!("values are not all {}", feature.kind));
                }
            }
        }
        errors
    }

    pub fn instance(&self, name: &str) -> Option<&InstanceSpec> {
        self.instances.iter().find(|i| i.name == name)
    }
}

impl StateSpaceProvider for ProblemClass {
    type Description = InstanceSpec;

    fn instance_name(&self, description: &InstanceSpec) -> String {
        description.name.clone()
    }

    fn state_space(&self, description: &InstanceSpec) -> Result<StateSpace, InstanceRejection> {
        StateSpace::new(
            description.num_states,
            description.initial.clone(),
            description.goals.iter().copied(),
            &description.transitions,
        )
        .map_err(|_| InstanceRejection::Unsolvable)
    }
}

impl TupleGraphProvider<InstanceSpec> for ProblemClass {
    fn tuple_graph(
        &self,
        description: &InstanceSpec,
        state_space: &StateSpace,
        root: StateId,
        _width: usize,
    ) -> Option<TupleGraph> {
        if !state_space.is_alive(root) {
            return None;
        }
        description
            .tuple_graphs
            .iter()
            .find(|graph| graph.root == root)
            .map(|graph| TupleGraph::new(root, graph.layers.clone()))
    }
}

impl FeatureGenerator for ProblemClass {
    fn generate(
        &self,
        _instances: &[&InstanceData],
        limits: &ComplexityLimits,
    ) -> Result<Vec<Feature>, IrError> {
        Ok(self
            .features
            .iter()
            .take(limits.feature_limit)
            .cloned()
            .collect())
    }
}

impl FeatureEvaluator for ProblemClass {
    fn evaluate(
        &self,
        feature: &Feature,
        instance: &InstanceData,
    ) -> Result<Vec<FeatureValue>, IrError> {
        let spec = self
            .instance(&instance.name)
            .ok_or_else(|| IrError::UnknownInstance(instance.name.clone()))?;
        let values = spec
            .valuations
            .get(&feature.repr)
            .ok_or_else(|| IrError::UnknownFeature {
                repr: feature.repr.clone(),
                instance: instance.name.clone(),
            })?;
        if values.len() != instance.num_states() {
            return Err(IrError::ValuationLength {
                repr: feature.repr.clone(),
                instance: instance.name.clone(),
                found: values.len(),
                expected: instance.num_states(),
            });
        }
        Ok(values.clone())
    }
}
