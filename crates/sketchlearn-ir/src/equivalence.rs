//! Per-root views of the tuple graph in class space.

use std::collections::{BTreeMap, BTreeSet};

use crate::class_table::ClassId;
use crate::instance::{StateId, TupleId};

/// Which class each subgoal candidate of one root state falls into.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatePairEquivalence {
    pub subgoal_state_to_class: BTreeMap<StateId, ClassId>,
    pub class_to_subgoal_states: BTreeMap<ClassId, BTreeSet<StateId>>,
    pub class_to_min_distance: BTreeMap<ClassId, usize>,
}

impl StatePairEquivalence {
    /// Record that `(root, state)` at `distance` falls into `class`.
    pub fn record(&mut self, state: StateId, class: ClassId, distance: usize) {
        self.subgoal_state_to_class.insert(state, class);
        self.class_to_subgoal_states
            .entry(class)
            .or_default()
            .insert(state);
        self.class_to_min_distance
            .entry(class)
            .and_modify(|d| *d = (*d).min(distance))
            .or_insert(distance);
    }

    pub fn class_of(&self, state: StateId) -> Option<ClassId> {
        self.subgoal_state_to_class.get(&state).copied()
    }

    pub fn classes(&self) -> impl Iterator<Item = ClassId> + '_ {
        self.class_to_subgoal_states.keys().copied()
    }
}

/// Tuples of one root's tuple graph, each lifted to the set of classes of
/// the states it covers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TupleGraphEquivalence {
    pub tuple_to_classes: BTreeMap<TupleId, BTreeSet<ClassId>>,
    pub tuple_to_distance: BTreeMap<TupleId, usize>,
    /// Smallest distance at which a state of the class is a dead end.
    pub class_to_deadend_distance: BTreeMap<ClassId, usize>,
}

impl TupleGraphEquivalence {
    pub fn num_tuples(&self) -> usize {
        self.tuple_to_classes.len()
    }

    pub fn classes_of(&self, tuple: TupleId) -> Option<&BTreeSet<ClassId>> {
        self.tuple_to_classes.get(&tuple)
    }

    pub fn distance_of(&self, tuple: TupleId) -> Option<usize> {
        self.tuple_to_distance.get(&tuple).copied()
    }

    /// Tuple ids grouped by distance, each group in ascending id order.
    pub fn tuples_by_distance(&self) -> BTreeMap<usize, Vec<TupleId>> {
        let mut layers: BTreeMap<usize, Vec<TupleId>> = BTreeMap::new();
        for (tuple, distance) in &self.tuple_to_distance {
            layers.entry(*distance).or_default().push(*tuple);
        }
        layers
    }

    /// Every class appearing in some kept tuple.
    pub fn classes(&self) -> BTreeSet<ClassId> {
        self.tuple_to_classes.values().flatten().copied().collect()
    }
}
