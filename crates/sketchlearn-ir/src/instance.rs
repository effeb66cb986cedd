//! Instances: state spaces, tuple graphs, and the per-instance data the
//! learner keeps for them.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::error::IrError;

/// Stable state index inside one instance.
pub type StateId = usize;

/// Dense index of an instance after preparation; smaller ids are smaller instances.
pub type InstanceId = usize;

/// Dense index of a tuple vertex inside one tuple graph.
pub type TupleId = usize;

/// Forward transition system of one instance.
///
/// Dead ends are derived on construction: a state is a dead end when no goal
/// is reachable from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSpace {
    num_states: usize,
    initial: Vec<StateId>,
    goals: BTreeSet<StateId>,
    deadends: BTreeSet<StateId>,
    successors: Vec<Vec<StateId>>,
}

impl StateSpace {
    pub fn new(
        num_states: usize,
        initial: Vec<StateId>,
        goals: impl IntoIterator<Item = StateId>,
        transitions: &[(StateId, StateId)],
    ) -> Result<Self, IrError> {
        let check = |state: StateId| {
            if state < num_states {
                Ok(state)
            } else {
                Err(IrError::StateOutOfRange { state, num_states })
            }
        };
        for state in &initial {
            check(*state)?;
        }
        let goals = goals
            .into_iter()
            .map(check)
            .collect::<Result<BTreeSet<_>, _>>()?;

        let mut successors = vec![Vec::new(); num_states];
        let mut predecessors = vec![Vec::new(); num_states];
        for &(from, to) in transitions {
            check(from)?;
            check(to)?;
            if !successors[from].contains(&to) {
                successors[from].push(to);
                predecessors[to].push(from);
            }
        }

        let mut solvable = vec![false; num_states];
        let mut queue: VecDeque<StateId> = goals.iter().copied().collect();
        for goal in &goals {
            solvable[*goal] = true;
        }
        while let Some(state) = queue.pop_front() {
            for &pred in &predecessors[state] {
                if !solvable[pred] {
                    solvable[pred] = true;
                    queue.push_back(pred);
                }
            }
        }
        let deadends = (0..num_states).filter(|s| !solvable[*s]).collect();

        Ok(Self {
            num_states,
            initial,
            goals,
            deadends,
            successors,
        })
    }

    pub fn num_states(&self) -> usize {
        self.num_states
    }

    pub fn num_transitions(&self) -> usize {
        self.successors.iter().map(Vec::len).sum()
    }

    pub fn initial_states(&self) -> &[StateId] {
        &self.initial
    }

    pub fn states(&self) -> std::ops::Range<StateId> {
        0..self.num_states
    }

    pub fn goal_states(&self) -> &BTreeSet<StateId> {
        &self.goals
    }

    pub fn is_goal(&self, state: StateId) -> bool {
        self.goals.contains(&state)
    }

    pub fn is_deadend(&self, state: StateId) -> bool {
        self.deadends.contains(&state)
    }

    /// Neither a goal nor a dead end.
    pub fn is_alive(&self, state: StateId) -> bool {
        state < self.num_states && !self.is_goal(state) && !self.is_deadend(state)
    }

    pub fn alive_states(&self) -> impl Iterator<Item = StateId> + '_ {
        self.states().filter(|s| self.is_alive(*s))
    }

    pub fn successors(&self, state: StateId) -> &[StateId] {
        self.successors.get(state).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// One vertex of a tuple graph together with the states it covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TupleVertex {
    pub id: TupleId,
    pub distance: usize,
    pub states: Vec<StateId>,
}

/// Tuple graph of one root state, layered by BFS distance.
///
/// Layer 0 holds the tuples already true in the root. A state is never its
/// own subgoal, so builders and the verifier start at layer 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TupleGraph {
    root: StateId,
    layers: Vec<Vec<TupleVertex>>,
}

impl TupleGraph {
    /// `layers[d]` lists, for every tuple at distance `d`, the states it covers.
    /// Vertex ids are assigned in layer order.
    pub fn new(root: StateId, layers: Vec<Vec<Vec<StateId>>>) -> Self {
        let mut next_id = 0;
        let layers = layers
            .into_iter()
            .enumerate()
            .map(|(distance, tuples)| {
                tuples
                    .into_iter()
                    .map(|states| {
                        let vertex = TupleVertex {
                            id: next_id,
                            distance,
                            states,
                        };
                        next_id += 1;
                        vertex
                    })
                    .collect()
            })
            .collect();
        Self { root, layers }
    }

    pub fn root(&self) -> StateId {
        self.root
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    pub fn layer(&self, distance: usize) -> &[TupleVertex] {
        self.layers.get(distance).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn vertices(&self) -> impl Iterator<Item = &TupleVertex> {
        self.layers.iter().flatten()
    }

    /// Distinct states covered at `distance`, in first-seen order.
    pub fn states_at(&self, distance: usize) -> Vec<StateId> {
        let mut seen = BTreeSet::new();
        self.layer(distance)
            .iter()
            .flat_map(|vertex| vertex.states.iter().copied())
            .filter(|s| seen.insert(*s))
            .collect()
    }

    /// Layers that can hold subgoals, i.e. everything past the root layer.
    pub fn subgoal_distances(&self) -> std::ops::Range<usize> {
        1..self.layers.len().max(1)
    }
}

/// An instance that survived preparation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceData {
    pub id: InstanceId,
    pub name: String,
    pub state_space: StateSpace,
    pub tuple_graphs: BTreeMap<StateId, TupleGraph>,
    /// States from which verification starts.
    pub roots: Vec<StateId>,
}

impl InstanceData {
    pub fn num_states(&self) -> usize {
        self.state_space.num_states()
    }

    pub fn tuple_graph(&self, state: StateId) -> Option<&TupleGraph> {
        self.tuple_graphs.get(&state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadends_are_states_that_cannot_reach_a_goal() {
        // 0 -> 1 -> 2 (goal), 0 -> 3 (trap)
        let space = StateSpace::new(4, vec![0], [2], &[(0, 1), (1, 2), (0, 3)])
            .expect("state space should build");
        assert!(space.is_deadend(3));
        assert!(!space.is_deadend(0));
        assert!(space.is_alive(1));
        assert!(!space.is_alive(2));
        assert_eq!(space.alive_states().collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(space.num_transitions(), 3);
    }

    #[test]
    fn out_of_range_transitions_are_rejected() {
        let err = StateSpace::new(2, vec![0], [1], &[(0, 5)]).expect_err("should fail");
        assert_eq!(
            err,
            IrError::StateOutOfRange {
                state: 5,
                num_states: 2
            }
        );
    }

    #[test]
    fn tuple_graph_assigns_ids_in_layer_order() {
        let graph = TupleGraph::new(0, vec![vec![vec![0]], vec![vec![1], vec![1, 2]]]);
        let ids: Vec<_> = graph.vertices().map(|v| (v.id, v.distance)).collect();
        assert_eq!(ids, vec![(0, 0), (1, 1), (2, 1)]);
        assert_eq!(graph.states_at(1), vec![1, 2]);
        assert_eq!(graph.subgoal_distances(), 1..2);
    }
}
