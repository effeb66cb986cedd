//! Class-space data of one outer iteration.
//!
//! State pairs `(root, subgoal candidate)` are grouped into classes by their
//! full-pool signature; tuple graphs are then lifted to sets of classes and
//! minimized layer by layer.

use std::collections::{BTreeMap, BTreeSet};

use sketchlearn_ir::class_table::{ClassId, ClassTable};
use sketchlearn_ir::equivalence::{StatePairEquivalence, TupleGraphEquivalence};
use sketchlearn_ir::instance::{InstanceData, StateId, StateSpace, TupleGraph};
use sketchlearn_ir::signature::Signature;
use sketchlearn_ir::valuation::ValuationTable;
use sketchlearn_ir::IrError;
use tracing::debug;

/// Per-instance equivalences, parallel to the training instances.
#[derive(Debug, Clone, Default)]
pub struct EquivalenceData {
    pub classes: ClassTable,
    pub state_pairs: Vec<BTreeMap<StateId, StatePairEquivalence>>,
    pub tuple_graphs: Vec<BTreeMap<StateId, TupleGraphEquivalence>>,
}

/// Build, lift and minimize the training instances with a fresh class table.
pub fn build_equivalences(
    training: &[&InstanceData],
    valuations: &[ValuationTable],
) -> Result<EquivalenceData, IrError> {
    let mut data = EquivalenceData::default();
    for (instance, table) in training.iter().zip(valuations) {
        let state_pairs = build_state_pair_equivalences(instance, table, &mut data.classes)?;
        let tuple_graphs = state_pairs
            .iter()
            .filter_map(|(root, spe)| {
                let graph = instance.tuple_graph(*root)?;
                let lifted = lift_tuple_graph(graph, spe, &instance.state_space);
                Some((*root, minimize(&lifted)))
            })
            .collect();
        data.state_pairs.push(state_pairs);
        data.tuple_graphs.push(tuple_graphs);
    }
    debug!(
        classes = data.classes.len(),
        instances = training.len(),
        "Built equivalence classes"
    );
    Ok(data)
}

/// Classes of every `(root, s)` where `s` lies past the root layer of an
/// alive root's tuple graph. Dead-end roots contribute nothing.
pub fn build_state_pair_equivalences(
    instance: &InstanceData,
    valuations: &ValuationTable,
    classes: &mut ClassTable,
) -> Result<BTreeMap<StateId, StatePairEquivalence>, IrError> {
    let mut result = BTreeMap::new();
    for (root, graph) in &instance.tuple_graphs {
        if !instance.state_space.is_alive(*root) {
            continue;
        }
        let mut spe = StatePairEquivalence::default();
        for distance in graph.subgoal_distances() {
            for target in graph.states_at(distance) {
                let class = classes.get_or_insert(Signature::of_pair(valuations, *root, target)?);
                spe.record(target, class, distance);
            }
        }
        result.insert(*root, spe);
    }
    Ok(result)
}

/// Replace every tuple by the classes of the states it covers.
///
/// Tuples that cover no classified state are left out, since they would
/// impose no requirement at all.
pub fn lift_tuple_graph(
    graph: &TupleGraph,
    spe: &StatePairEquivalence,
    space: &StateSpace,
) -> TupleGraphEquivalence {
    let mut tge = TupleGraphEquivalence::default();
    for distance in graph.subgoal_distances() {
        for vertex in graph.layer(distance) {
            let classes: BTreeSet<ClassId> =
                vertex.states.iter().filter_map(|s| spe.class_of(*s)).collect();
            if classes.is_empty() {
                continue;
            }
            tge.tuple_to_classes.insert(vertex.id, classes);
            tge.tuple_to_distance.insert(vertex.id, distance);
        }
        for state in graph.states_at(distance) {
            if !space.is_deadend(state) {
                continue;
            }
            if let Some(class) = spe.class_of(state) {
                tge.class_to_deadend_distance
                    .entry(class)
                    .and_modify(|d| *d = (*d).min(distance))
                    .or_insert(distance);
            }
        }
    }
    tge
}

/// Keep, per distance layer, one tuple for each inclusion-minimal class set.
///
/// A tuple whose classes strictly contain those of another tuple in the same
/// layer is dropped: satisfying it always satisfies the smaller one.
pub fn minimize(tge: &TupleGraphEquivalence) -> TupleGraphEquivalence {
    let mut kept = TupleGraphEquivalence {
        class_to_deadend_distance: tge.class_to_deadend_distance.clone(),
        ..TupleGraphEquivalence::default()
    };
    for (distance, tuples) in tge.tuples_by_distance() {
        let layer: Vec<(usize, &BTreeSet<ClassId>)> = tuples
            .iter()
            .filter_map(|t| tge.classes_of(*t).map(|classes| (*t, classes)))
            .collect();
        let mut representatives: BTreeSet<&BTreeSet<ClassId>> = BTreeSet::new();
        for (tuple, classes) in &layer {
            let dominated = layer
                .iter()
                .any(|(_, other)| other.len() < classes.len() && other.is_subset(classes));
            if dominated || !representatives.insert(*classes) {
                continue;
            }
            kept.tuple_to_classes.insert(*tuple, (*classes).clone());
            kept.tuple_to_distance.insert(*tuple, distance);
        }
    }
    kept
}
