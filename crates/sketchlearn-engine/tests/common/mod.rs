#![allow(dead_code)]

use std::time::Duration;

use sketchlearn_engine::instances::prepare_instances;
use sketchlearn_engine::LearnerOptions;
use sketchlearn_ir::instance::InstanceData;
use sketchlearn_ir::problem::ProblemClass;
use sketchlearn_smt::facts::FactSet;
use sketchlearn_smt::solver::{ConstraintSolver, SolveOutcome};

/// s0 -> s1 -> g, with s0 -> d where d is a dead end.
pub const BRANCHING: &str = r#"{
    "name": "branching",
    "num_states": 4,
    "initial": [0],
    "goals": [2],
    "transitions": [[0, 1], [1, 2], [0, 3]],
    "tuple_graphs": [
        {"root": 0, "layers": [[[0]], [[1], [3]]]},
        {"root": 1, "layers": [[[1]], [[2]]]}
    ],
    "valuations": {
        "holding": [false, true, false, false],
        "n0": [2, 1, 0, 3]
    }
}"#;

/// s0 -> g.
pub const SINGLE_STEP: &str = r#"{
    "name": "single-step",
    "num_states": 2,
    "initial": [0],
    "goals": [1],
    "transitions": [[0, 1]],
    "tuple_graphs": [
        {"root": 0, "layers": [[[0]], [[1]]]}
    ],
    "valuations": {
        "holding": [false, false],
        "n0": [1, 0]
    }
}"#;

/// 0 <-> 1 -> 2 (goal). `n` is 1 on both 0 and 1.
pub const BACK_AND_FORTH: &str = r#"{
    "name": "back-and-forth",
    "num_states": 3,
    "initial": [0],
    "goals": [2],
    "transitions": [[0, 1], [1, 0], [1, 2]],
    "tuple_graphs": [
        {"root": 0, "layers": [[[0]], [[1]], [[2]]]},
        {"root": 1, "layers": [[[1]], [[0], [2]]]}
    ],
    "valuations": {
        "n": [1, 1, 0]
    }
}"#;

/// 0 -> 1 (goal) and 0 -> 2 (dead end) look the same to `n`.
pub const INDISTINGUISHABLE_DEAD_END: &str = r#"{
    "name": "indistinguishable",
    "num_states": 3,
    "initial": [0],
    "goals": [1],
    "transitions": [[0, 1], [0, 2]],
    "tuple_graphs": [
        {"root": 0, "layers": [[[0]], [[1], [2]]]}
    ],
    "valuations": {
        "n": [1, 0, 0]
    }
}"#;

/// 0 -> 1 (goal). State 2 is alive but unreachable from 0; its moves
/// 2 -> 1 and 2 -> 3 (dead end) look the same to `n`.
pub const UNREACHABLE_TRAP: &str = r#"{
    "name": "unreachable-trap",
    "num_states": 4,
    "initial": [0],
    "goals": [1],
    "transitions": [[0, 1], [2, 1], [2, 3]],
    "tuple_graphs": [
        {"root": 0, "layers": [[[0]], [[1]]]},
        {"root": 2, "layers": [[[2]], [[1], [3]]]}
    ],
    "valuations": {
        "n": [1, 0, 1, 0]
    }
}"#;

pub const HOLDING_FEATURES: &str = r#"[
    {"repr": "holding", "kind": "boolean", "complexity": 1},
    {"repr": "n0", "kind": "numerical", "complexity": 1}
]"#;

pub const COUNTER_FEATURE: &str = r#"[
    {"repr": "n", "kind": "numerical", "complexity": 1}
]"#;

pub fn problem(features: &str, instances: &[&str]) -> ProblemClass {
    let text = format!(
        r#"{{"schema_version": 1, "features": {features}, "instances": [{}]}}"#,
        instances.join(",")
    );
    ProblemClass::from_json(&text).unwrap_or_else(|e| panic!("invalid problem: {e}"))
}

pub fn prepared(problem: &ProblemClass, options: &LearnerOptions) -> Vec<InstanceData> {
    let prepared = prepare_instances(problem, &problem.instances, options);
    assert!(prepared.rejected.is_empty(), "{:?}", prepared.rejected);
    prepared.instances
}

#[derive(Debug, thiserror::Error)]
#[error("mock solver ran out of outcomes")]
pub struct OutOfOutcomes;

/// Replays scripted outcomes and records the budget of every call.
#[derive(Debug, Clone, Default)]
pub struct MockSolver {
    outcomes: Vec<SolveOutcome>,
    calls: usize,
    /// Calls from this index on sleep before answering.
    slow_from: Option<(usize, Duration)>,
    pub budgets: Vec<u64>,
}

impl MockSolver {
    pub fn new(outcomes: Vec<SolveOutcome>) -> Self {
        Self {
            outcomes,
            ..Self::default()
        }
    }

    pub fn slow_from(mut self, call: usize, delay: Duration) -> Self {
        self.slow_from = Some((call, delay));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl ConstraintSolver for MockSolver {
    type Error = OutOfOutcomes;

    fn solve(&mut self, _facts: &FactSet) -> Result<SolveOutcome, OutOfOutcomes> {
        let outcome = self.outcomes.get(self.calls).cloned().ok_or(OutOfOutcomes)?;
        if let Some((from, delay)) = self.slow_from {
            if self.calls >= from {
                std::thread::sleep(delay);
            }
        }
        self.calls += 1;
        Ok(outcome)
    }

    fn set_time_budget(&mut self, secs: u64) {
        self.budgets.push(secs);
    }

    fn name(&self) -> &str {
        "mock"
    }
}
