//! Sketch verification: bounded width, acyclicity and goal separation.
//!
//! The verifier only reads the instance and the valuation table of the
//! sketch's features; it never touches the class table of the loop.

use std::collections::{BTreeMap, BTreeSet};

use sketchlearn_ir::feature::{FeatureId, FeatureKind};
use sketchlearn_ir::instance::{InstanceData, InstanceId, StateId, StateSpace};
use sketchlearn_ir::sketch::Sketch;
use sketchlearn_ir::valuation::ValuationTable;

use crate::error::VerificationFailure;
use crate::options::LearnerOptions;

/// By-product of a successful bounded-width check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WidthWitness {
    /// Every R-reachable non-goal root and its compatible subgoal states.
    pub adjacency: BTreeMap<StateId, BTreeSet<StateId>>,
    /// Distance of the first fully satisfied tuple of each root.
    pub realized_width: BTreeMap<StateId, usize>,
}

impl WidthWitness {
    pub fn max_width(&self) -> Option<usize> {
        self.realized_width.values().copied().max()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SketchVerifier {
    pub optimal_width: bool,
    pub goal_separation: bool,
}

impl SketchVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_options(options: &LearnerOptions) -> Self {
        Self {
            optimal_width: options.optimal_width,
            goal_separation: options.goal_separation,
        }
    }

    /// Search the R-reachable states from the instance roots and certify a
    /// satisfied tuple for each of them.
    pub fn bounded_width(
        &self,
        sketch: &Sketch,
        instance: &InstanceData,
        table: &ValuationTable,
    ) -> Result<WidthWitness, VerificationFailure> {
        let space = &instance.state_space;
        let mut witness = WidthWitness::default();
        let mut seen: BTreeSet<StateId> = instance.roots.iter().copied().collect();
        let mut queue: Vec<StateId> = instance.roots.iter().rev().copied().collect();

        while let Some(root) = queue.pop() {
            if space.is_deadend(root) {
                return Err(VerificationFailure::DeadEndReached { state: root });
            }
            if space.is_goal(root) {
                continue;
            }
            let graph = instance
                .tuple_graph(root)
                .ok_or(VerificationFailure::MissingTupleGraph { state: root })?;

            let compatible = witness.adjacency.entry(root).or_default();
            let mut closest: Option<usize> = None;
            let mut realized = None;
            for distance in graph.subgoal_distances() {
                for target in graph.states_at(distance) {
                    if !sketch.is_compatible(table, root, target) {
                        continue;
                    }
                    compatible.insert(target);
                    if seen.insert(target) {
                        queue.push(target);
                    }
                    closest.get_or_insert(distance);
                }
                let satisfied = graph.layer(distance).iter().any(|tuple| {
                    !tuple.states.is_empty() && tuple.states.iter().all(|s| compatible.contains(s))
                });
                if !satisfied {
                    continue;
                }
                if let Some(nearest) = closest.filter(|d| self.optimal_width && *d < distance) {
                    return Err(VerificationFailure::SuboptimalWidth {
                        state: root,
                        compatible_distance: nearest,
                        tuple_distance: distance,
                    });
                }
                realized = Some(distance);
                break;
            }
            match realized {
                Some(distance) => {
                    witness.realized_width.insert(root, distance);
                }
                None => return Err(VerificationFailure::UnboundedWidth { state: root }),
            }
        }
        Ok(witness)
    }

    pub fn solves(
        &self,
        sketch: &Sketch,
        instance: &InstanceData,
        table: &ValuationTable,
    ) -> Result<WidthWitness, VerificationFailure> {
        let witness = self.bounded_width(sketch, instance, table)?;
        acyclicity(&witness, &instance.state_space)?;
        if self.goal_separation {
            goal_separation(sketch, instance, table)?;
        }
        Ok(witness)
    }

    /// First instance the sketch does not solve, in iteration order.
    pub fn first_failure<'a>(
        &self,
        sketch: &Sketch,
        checks: impl IntoIterator<Item = (&'a InstanceData, &'a ValuationTable)>,
    ) -> Option<(InstanceId, VerificationFailure)> {
        checks.into_iter().find_map(|(instance, table)| {
            self.solves(sketch, instance, table)
                .err()
                .map(|failure| (instance.id, failure))
        })
    }
}

#[derive(Clone, Copy)]
enum Mark {
    OnPath,
    Done,
}

static NO_SUCCESSORS: BTreeSet<StateId> = BTreeSet::new();

/// Depth-first search for a back edge in the compatibility graph. Goal
/// states end a branch.
pub fn acyclicity(witness: &WidthWitness, space: &StateSpace) -> Result<(), VerificationFailure> {
    let successors =
        |state: StateId| witness.adjacency.get(&state).unwrap_or(&NO_SUCCESSORS).iter();
    let mut marks: BTreeMap<StateId, Mark> = BTreeMap::new();

    for start in witness.adjacency.keys() {
        if marks.contains_key(start) {
            continue;
        }
        marks.insert(*start, Mark::OnPath);
        let mut stack = vec![(*start, successors(*start))];
        while let Some((state, pending)) = stack.last_mut() {
            let state = *state;
            let next = pending.next().copied();
            let Some(next) = next else {
                marks.insert(state, Mark::Done);
                stack.pop();
                continue;
            };
            if space.is_goal(next) {
                continue;
            }
            match marks.get(&next) {
                Some(Mark::OnPath) => return Err(VerificationFailure::Cycle { state: next }),
                Some(Mark::Done) => {}
                None => {
                    marks.insert(next, Mark::OnPath);
                    stack.push((next, successors(next)));
                }
            }
        }
    }
    Ok(())
}

/// Abstract value of a state under the selected features: each Boolean,
/// then whether each numerical is positive.
fn abstraction(
    booleans: &[FeatureId],
    numericals: &[FeatureId],
    table: &ValuationTable,
    state: StateId,
) -> Vec<bool> {
    let positive = |f: &FeatureId, strict: bool| {
        table.value(*f, state).is_some_and(|v| {
            if strict {
                v.as_i64() > 0
            } else {
                !v.is_zero()
            }
        })
    };
    booleans
        .iter()
        .map(|f| positive(f, false))
        .chain(numericals.iter().map(|f| positive(f, true)))
        .collect()
}

/// No goal state may share its abstract value with a non-goal state.
pub fn goal_separation(
    sketch: &Sketch,
    instance: &InstanceData,
    table: &ValuationTable,
) -> Result<(), VerificationFailure> {
    let booleans: Vec<FeatureId> = sketch.features_of_kind(FeatureKind::Boolean).collect();
    let numericals: Vec<FeatureId> = sketch.features_of_kind(FeatureKind::Numerical).collect();
    let space = &instance.state_space;

    let mut goals: BTreeMap<Vec<bool>, StateId> = BTreeMap::new();
    for goal in space.goal_states() {
        goals
            .entry(abstraction(&booleans, &numericals, table, *goal))
            .or_insert(*goal);
    }
    for state in space.states().filter(|s| !space.is_goal(*s)) {
        if let Some(goal) = goals.get(&abstraction(&booleans, &numericals, table, state)) {
            return Err(VerificationFailure::GoalSeparation {
                goal: *goal,
                nongoal: state,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use sketchlearn_ir::feature::{Feature, FeaturePool, FeatureValue};
    use sketchlearn_ir::instance::TupleGraph;
    use sketchlearn_ir::signature::Signature;
    use sketchlearn_ir::valuation::{Condition, Effect};

    use super::*;

    fn instance(
        num_states: usize,
        goals: &[StateId],
        transitions: &[(StateId, StateId)],
        graphs: Vec<(StateId, Vec<Vec<Vec<StateId>>>)>,
    ) -> InstanceData {
        let space = StateSpace::new(num_states, vec![0], goals.iter().copied(), transitions)
            .expect("valid space");
        let roots = space.alive_states().collect();
        InstanceData {
            id: 0,
            name: "test".into(),
            state_space: space,
            tuple_graphs: graphs
                .into_iter()
                .map(|(root, layers)| (root, TupleGraph::new(root, layers)))
                .collect(),
            roots,
        }
    }

    fn table(columns: Vec<(FeatureId, Vec<FeatureValue>)>) -> ValuationTable {
        let n = columns.first().map_or(0, |(_, values)| values.len());
        let mut table = ValuationTable::new(n);
        for (f, values) in columns {
            table.insert_column(f, values).expect("column");
        }
        table
    }

    fn rule(
        conditions: &[(FeatureId, Condition)],
        effects: &[(FeatureId, Effect)],
    ) -> Signature {
        Signature {
            conditions: conditions.iter().copied().collect(),
            effects: effects.iter().copied().collect(),
        }
    }

    fn bools(values: &[bool]) -> Vec<FeatureValue> {
        values.iter().map(|v| FeatureValue::Boolean(*v)).collect()
    }

    fn nums(values: &[i64]) -> Vec<FeatureValue> {
        values.iter().map(|v| FeatureValue::Numerical(*v)).collect()
    }

    /// s0 (not holding, n=2) -> s1 (holding, n=1) -> g (n=0).
    fn holding_chain() -> (InstanceData, ValuationTable, Sketch) {
        let instance = instance(
            3,
            &[2],
            &[(0, 1), (1, 2)],
            vec![
                (0, vec![vec![vec![0]], vec![vec![1]]]),
                (1, vec![vec![vec![1]], vec![vec![2]]]),
            ],
        );
        let table = table(vec![
            (0, bools(&[false, true, false])),
            (1, nums(&[2, 1, 0])),
        ]);
        let pool: FeaturePool = [Feature::boolean("holding", 1), Feature::numerical("n0", 1)]
            .into_iter()
            .collect();
        let pick = rule(
            &[(0, Condition::NegBool), (1, Condition::NumGt)],
            &[(0, Effect::BoolUp), (1, Effect::NumDown)],
        );
        let place = rule(
            &[(0, Condition::PosBool), (1, Condition::NumGt)],
            &[(0, Effect::BoolDown), (1, Effect::NumDown)],
        );
        let sketch = Sketch::new(&pool, &BTreeSet::from([0, 1]), [pick, place]).expect("sketch");
        (instance, table, sketch)
    }

    #[test]
    fn chain_is_solved_with_width_one() {
        let (instance, table, sketch) = holding_chain();
        let witness = SketchVerifier::new()
            .solves(&sketch, &instance, &table)
            .expect("solved");
        assert_eq!(witness.realized_width, BTreeMap::from([(0, 1), (1, 1)]));
        assert_eq!(witness.adjacency[&0], BTreeSet::from([1]));
        assert_eq!(witness.max_width(), Some(1));
    }

    #[test]
    fn missing_rule_leaves_width_unbounded() {
        let (instance, table, sketch) = holding_chain();
        let only_pick = sketch.with_rules(sketch.rules().iter().take(1).cloned());
        let failure = SketchVerifier::new()
            .bounded_width(&only_pick, &instance, &table)
            .expect_err("unbounded");
        assert!(matches!(failure, VerificationFailure::UnboundedWidth { .. }));
    }

    #[test]
    fn reaching_a_dead_end_fails() {
        // 0 -> 1 (dead end), 0 -> 2 (goal).
        let instance = instance(
            3,
            &[2],
            &[(0, 1), (0, 2)],
            vec![(0, vec![vec![vec![0]], vec![vec![1], vec![2]]])],
        );
        let table = table(vec![(0, nums(&[1, 2, 0]))]);
        let pool: FeaturePool = [Feature::numerical("n", 1)].into_iter().collect();
        let anything_goes = rule(&[], &[]);
        let sketch = Sketch::new(&pool, &BTreeSet::from([0]), [anything_goes]).expect("sketch");
        let failure = SketchVerifier::new()
            .solves(&sketch, &instance, &table)
            .expect_err("dead end");
        assert_eq!(failure, VerificationFailure::DeadEndReached { state: 1 });
    }

    #[test]
    fn optimal_width_rejects_ignored_shortcuts() {
        // Tuple at distance 1 covers {1, 3}; only 1 is compatible.
        let instance = instance(
            4,
            &[2],
            &[(0, 1), (0, 3), (1, 2), (3, 2)],
            vec![
                (0, vec![vec![vec![0]], vec![vec![1, 3]], vec![vec![2]]]),
                (1, vec![vec![vec![1]], vec![vec![2]]]),
                (3, vec![vec![vec![3]], vec![vec![2]]]),
            ],
        );
        let table = table(vec![(0, nums(&[3, 2, 0, 4]))]);
        let pool: FeaturePool = [Feature::numerical("n", 1)].into_iter().collect();
        let down = rule(&[], &[(0, Effect::NumDown)]);
        let sketch = Sketch::new(&pool, &BTreeSet::from([0]), [down]).expect("sketch");

        let relaxed = SketchVerifier::new();
        let from_zero = relaxed
            .bounded_width(&sketch, &instance, &table)
            .expect("solved");
        assert_eq!(from_zero.realized_width[&0], 2);

        let strict = SketchVerifier {
            optimal_width: true,
            ..SketchVerifier::new()
        };
        assert_eq!(
            strict.bounded_width(&sketch, &instance, &table),
            Err(VerificationFailure::SuboptimalWidth {
                state: 0,
                compatible_distance: 1,
                tuple_distance: 2,
            })
        );
    }

    #[test]
    fn indistinguishable_back_and_forth_is_a_cycle() {
        // 0 <-> 1, 1 -> 2 (goal). `n` cannot tell 0 from 1.
        let instance = instance(
            3,
            &[2],
            &[(0, 1), (1, 0), (1, 2)],
            vec![
                (0, vec![vec![vec![0]], vec![vec![1]], vec![vec![2]]]),
                (1, vec![vec![vec![1]], vec![vec![0], vec![2]]]),
            ],
        );
        let table = table(vec![(0, nums(&[1, 1, 0]))]);
        let pool: FeaturePool = [Feature::numerical("n", 1)].into_iter().collect();
        let stay = rule(&[(0, Condition::NumGt)], &[(0, Effect::NumSame)]);
        let sketch = Sketch::new(&pool, &BTreeSet::from([0]), [stay]).expect("sketch");

        let verifier = SketchVerifier::new();
        let witness = verifier
            .bounded_width(&sketch, &instance, &table)
            .expect("width is bounded");
        assert_eq!(
            acyclicity(&witness, &instance.state_space),
            Err(VerificationFailure::Cycle { state: 0 })
        );
        assert_eq!(
            verifier.first_failure(&sketch, [(&instance, &table)]),
            Some((0, VerificationFailure::Cycle { state: 0 }))
        );
    }

    #[test]
    fn goal_edges_do_not_close_cycles() {
        let mut witness = WidthWitness::default();
        witness.adjacency.insert(0, BTreeSet::from([1, 2]));
        witness.adjacency.insert(1, BTreeSet::from([2]));
        let space = StateSpace::new(3, vec![0], [2], &[(0, 1), (1, 2), (0, 2)]).expect("space");
        assert_eq!(acyclicity(&witness, &space), Ok(()));
    }

    #[test]
    fn goal_separation_compares_abstract_values() {
        let (instance, _, sketch) = holding_chain();
        // n0 stays positive at the goal, so the goal looks like s0.
        let unseparated = table(vec![
            (0, bools(&[false, true, false])),
            (1, nums(&[2, 1, 1])),
        ]);
        assert_eq!(
            goal_separation(&sketch, &instance, &unseparated),
            Err(VerificationFailure::GoalSeparation { goal: 2, nongoal: 0 })
        );
        let (_, separated, _) = holding_chain();
        assert_eq!(goal_separation(&sketch, &instance, &separated), Ok(()));
    }
}
