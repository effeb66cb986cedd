use std::collections::{BTreeMap, BTreeSet};

use sketchlearn_ir::class_table::ClassId;
use sketchlearn_ir::feature::FeatureId;
use sketchlearn_ir::valuation::{Condition, Effect};

use crate::facts::FactSet;

/// Exit status of one solver call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolveStatus {
    /// An optimal model was found.
    OptimalSat,
    Unsat,
    Unknown(String),
    /// The search space was exhausted without an answer.
    Exhausted,
    /// The solver was stopped, typically by its own time limit.
    Interrupted,
}

impl std::fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolveStatus::OptimalSat => write!(f, "OPTIMAL_SAT"),
            SolveStatus::Unsat => write!(f, "UNSAT"),
            SolveStatus::Unknown(reason) => write!(f, "UNKNOWN ({reason})"),
            SolveStatus::Exhausted => write!(f, "EXHAUSTED"),
            SolveStatus::Interrupted => write!(f, "INTERRUPTED"),
        }
    }
}

/// A true atom of an optimal model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Symbol {
    Select(FeatureId),
    Good(ClassId),
    RuleSlot(usize),
    SlotCondition {
        slot: usize,
        feature: FeatureId,
        condition: Condition,
    },
    SlotEffect {
        slot: usize,
        feature: FeatureId,
        effect: Effect,
    },
}

/// Conditions and effects picked for one explicit rule slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotChoice {
    pub conditions: BTreeMap<FeatureId, Condition>,
    pub effects: BTreeMap<FeatureId, Effect>,
}

/// Flat list of true symbols, as in an answer set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SolverModel {
    pub symbols: Vec<Symbol>,
    /// Objective value, when the backend reports or computes it.
    pub cost: Option<i64>,
}

impl SolverModel {
    pub fn new(symbols: Vec<Symbol>) -> Self {
        Self {
            symbols,
            cost: None,
        }
    }

    pub fn with_cost(mut self, cost: i64) -> Self {
        self.cost = Some(cost);
        self
    }

    pub fn selected_features(&self) -> BTreeSet<FeatureId> {
        self.symbols
            .iter()
            .filter_map(|s| match s {
                Symbol::Select(f) => Some(*f),
                _ => None,
            })
            .collect()
    }

    pub fn good_classes(&self) -> BTreeSet<ClassId> {
        self.symbols
            .iter()
            .filter_map(|s| match s {
                Symbol::Good(c) => Some(*c),
                _ => None,
            })
            .collect()
    }

    /// Choices of every active slot, keyed by slot.
    pub fn active_slots(&self) -> BTreeMap<usize, SlotChoice> {
        let mut slots: BTreeMap<usize, SlotChoice> = self
            .symbols
            .iter()
            .filter_map(|s| match s {
                Symbol::RuleSlot(k) => Some((*k, SlotChoice::default())),
                _ => None,
            })
            .collect();
        for symbol in &self.symbols {
            match symbol {
                Symbol::SlotCondition {
                    slot,
                    feature,
                    condition,
                } => {
                    if let Some(choice) = slots.get_mut(slot) {
                        choice.conditions.insert(*feature, *condition);
                    }
                }
                Symbol::SlotEffect {
                    slot,
                    feature,
                    effect,
                } => {
                    if let Some(choice) = slots.get_mut(slot) {
                        choice.effects.insert(*feature, *effect);
                    }
                }
                _ => {}
            }
        }
        slots
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolveOutcome {
    pub status: SolveStatus,
    /// Present exactly when `status` is [`SolveStatus::OptimalSat`].
    pub model: Option<SolverModel>,
}

impl SolveOutcome {
    pub fn optimal(model: SolverModel) -> Self {
        Self {
            status: SolveStatus::OptimalSat,
            model: Some(model),
        }
    }

    pub fn without_model(status: SolveStatus) -> Self {
        Self {
            status,
            model: None,
        }
    }
}

/// A declarative optimizer for the sketch encodings.
pub trait ConstraintSolver {
    type Error: std::error::Error;

    /// Find a model of `facts` that minimizes the total complexity of the
    /// selected features. One blocking call per inner-loop step.
    fn solve(&mut self, facts: &FactSet) -> Result<SolveOutcome, Self::Error>;

    /// Limit the next calls to `secs` seconds; 0 lifts the limit.
    fn set_time_budget(&mut self, _secs: u64) {}

    /// Short backend name for logs.
    fn name(&self) -> &str {
        "solver"
    }
}

impl<S: ConstraintSolver + ?Sized> ConstraintSolver for Box<S> {
    type Error = S::Error;

    fn solve(&mut self, facts: &FactSet) -> Result<SolveOutcome, Self::Error> {
        (**self).solve(facts)
    }

    fn set_time_budget(&mut self, secs: u64) {
        (**self).set_time_budget(secs)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::EncodingOptions;

    /// Replays a fixed sequence of outcomes.
    struct MockSolver {
        outcomes: Vec<SolveOutcome>,
        calls: usize,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("mock solver ran out of outcomes")]
    struct Exhausted;

    impl ConstraintSolver for MockSolver {
        type Error = Exhausted;

        fn solve(&mut self, _facts: &FactSet) -> Result<SolveOutcome, Exhausted> {
            let outcome = self.outcomes.get(self.calls).cloned().ok_or(Exhausted)?;
            self.calls += 1;
            Ok(outcome)
        }
    }

    #[test]
    fn model_accessors_split_symbols_by_kind() {
        let model = SolverModel::new(vec![
            Symbol::Select(0),
            Symbol::Good(3),
            Symbol::Select(2),
            Symbol::RuleSlot(0),
            Symbol::SlotCondition {
                slot: 0,
                feature: 2,
                condition: Condition::NumGt,
            },
            Symbol::SlotEffect {
                slot: 1,
                feature: 2,
                effect: Effect::NumDown,
            },
        ]);
        assert_eq!(model.selected_features(), BTreeSet::from([0, 2]));
        assert_eq!(model.good_classes(), BTreeSet::from([3]));
        let slots = model.active_slots();
        assert_eq!(slots.len(), 1, "slot 1 is not active");
        assert_eq!(slots[&0].conditions[&2], Condition::NumGt);
        assert!(slots[&0].effects.is_empty());
    }

    #[test]
    fn boxed_solvers_forward_calls() {
        let mut solver: Box<MockSolver> = Box::new(MockSolver {
            outcomes: vec![SolveOutcome::without_model(SolveStatus::Unsat)],
            calls: 0,
        });
        let facts = FactSet::new(EncodingOptions::default());
        let outcome = solver.solve(&facts).expect("first call should succeed");
        assert_eq!(outcome.status, SolveStatus::Unsat);
        assert!(solver.solve(&facts).is_err());
        assert_eq!(solver.name(), "solver");
    }
}
