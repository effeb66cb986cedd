//! Brute-force backend for small queries.
//!
//! Enumerates every assignment of the declared Boolean variables and keeps
//! the cheapest satisfying one. Useful for tests and tiny problem classes
//! where spawning an external solver is not worth it.

use std::collections::BTreeSet;

use thiserror::Error;
use tracing::debug;

use crate::encoder::{lower, symbol_of};
use crate::facts::FactSet;
use crate::solver::{ConstraintSolver, SolveOutcome, SolveStatus, SolverModel};
use crate::terms::SmtSort;

pub const DEFAULT_MAX_VARIABLES: usize = 20;

#[derive(Debug, Error)]
pub enum ExhaustiveError {
    #[error("variable `{0}` has sort {1}; only Bool variables can be enumerated")]
    UnsupportedSort(String, SmtSort),
}

#[derive(Debug, Clone)]
pub struct ExhaustiveSolver {
    max_variables: usize,
}

impl Default for ExhaustiveSolver {
    fn default() -> Self {
        Self {
            max_variables: DEFAULT_MAX_VARIABLES,
        }
    }
}

impl ExhaustiveSolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queries with more variables are answered with `Unknown`.
    pub fn with_max_variables(max_variables: usize) -> Self {
        Self {
            max_variables: max_variables.min(usize::BITS as usize - 1),
        }
    }
}

impl ConstraintSolver for ExhaustiveSolver {
    type Error = ExhaustiveError;

    fn solve(&mut self, facts: &FactSet) -> Result<SolveOutcome, ExhaustiveError> {
        let query = lower(facts);
        if let Some((name, sort)) = query
            .declarations
            .iter()
            .find(|(_, sort)| *sort != SmtSort::Bool)
        {
            return Err(ExhaustiveError::UnsupportedSort(name.clone(), *sort));
        }
        let names: Vec<&str> = query.variable_names().collect();
        if names.len() > self.max_variables {
            return Ok(SolveOutcome::without_model(SolveStatus::Unknown(format!(
                "{} variables exceed the enumeration limit of {}",
                names.len(),
                self.max_variables
            ))));
        }

        let mut best: Option<(i64, BTreeSet<&str>)> = None;
        for mask in 0u64..(1u64 << names.len()) {
            let truth: BTreeSet<&str> = names
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, name)| *name)
                .collect();
            let assignment = |name: &str| truth.contains(name);
            if !query.satisfied_by(&assignment) {
                continue;
            }
            let cost = query.cost(&assignment);
            if best.as_ref().map_or(true, |(best_cost, _)| cost < *best_cost) {
                best = Some((cost, truth));
            }
        }

        debug!(
            variables = names.len(),
            found = best.is_some(),
            "Enumerated all assignments"
        );
        Ok(match best {
            Some((cost, truth)) => {
                let symbols = truth.into_iter().filter_map(symbol_of).collect();
                SolveOutcome::optimal(SolverModel::new(symbols).with_cost(cost))
            }
            None => SolveOutcome::without_model(SolveStatus::Unsat),
        })
    }

    fn name(&self) -> &str {
        "exhaustive"
    }
}

#[cfg(test)]
mod tests {
    use sketchlearn_ir::feature::FeatureKind;

    use super::*;
    use crate::facts::{EncodingOptions, Fact};

    fn two_features() -> FactSet {
        let mut facts = FactSet::new(EncodingOptions::default());
        for (feature, complexity) in [(0, 4), (1, 1)] {
            facts.push(Fact::Feature {
                feature,
                complexity,
                kind: FeatureKind::Boolean,
            });
        }
        facts
    }

    #[test]
    fn unconstrained_query_selects_nothing() {
        let outcome = ExhaustiveSolver::new()
            .solve(&two_features())
            .expect("bool-only query");
        assert_eq!(outcome.status, SolveStatus::OptimalSat);
        let model = outcome.model.expect("model");
        assert!(model.selected_features().is_empty());
        assert_eq!(model.cost, Some(0));
    }

    #[test]
    fn exclusion_of_the_only_model_is_unsat() {
        // With no classes, excluding "nothing selected" leaves the cheapest
        // single feature; excluding every subset leaves nothing.
        let mut facts = two_features();
        facts.push(Fact::Exclude {
            selected: vec![],
            good: vec![],
        });
        let outcome = ExhaustiveSolver::new().solve(&facts).expect("solve");
        let model = outcome.model.expect("model");
        assert_eq!(model.selected_features(), BTreeSet::from([1]));
        assert_eq!(model.cost, Some(1));

        for selected in [vec![1], vec![0], vec![0, 1]] {
            facts.push(Fact::Exclude {
                selected,
                good: vec![],
            });
        }
        let outcome = ExhaustiveSolver::new().solve(&facts).expect("solve");
        assert_eq!(outcome.status, SolveStatus::Unsat);
    }

    #[test]
    fn oversized_queries_are_unknown() {
        let outcome = ExhaustiveSolver::with_max_variables(1)
            .solve(&two_features())
            .expect("solve");
        assert!(matches!(outcome.status, SolveStatus::Unknown(_)));
    }
}
