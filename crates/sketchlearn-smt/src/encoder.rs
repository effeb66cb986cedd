//! Constraint encoding of one inner-loop query.
//!
//! [`ConstraintEncoder::encode`] flattens the current feature pool, class
//! table, lifted tuple graphs and refinement constraints of the training
//! instances into a [`FactSet`]. [`lower`] turns a fact set into the
//! optimization query handed to an SMT backend.

mod lowering;
pub(crate) mod variables;

use std::collections::BTreeMap;

use sketchlearn_ir::class_table::ClassTable;
use sketchlearn_ir::equivalence::{StatePairEquivalence, TupleGraphEquivalence};
use sketchlearn_ir::feature::FeaturePool;
use sketchlearn_ir::instance::{InstanceData, StateId};
use sketchlearn_ir::refinement::RefinementConstraintSet;
use sketchlearn_ir::valuation::ValuationTable;
use tracing::debug;

use crate::facts::{EncodingOptions, Fact, FactSet, StateRef};

pub use lowering::{lower, OptimizationQuery};
pub use variables::symbol_of;

/// Per-instance data of one training instance.
#[derive(Debug, Clone, Copy)]
pub struct EncodedInstance<'a> {
    pub instance: &'a InstanceData,
    pub valuations: &'a ValuationTable,
    pub state_pairs: &'a BTreeMap<StateId, StatePairEquivalence>,
    pub tuple_graphs: &'a BTreeMap<StateId, TupleGraphEquivalence>,
}

#[derive(Debug, Clone, Copy)]
pub struct EncodingInput<'a> {
    pub pool: &'a FeaturePool,
    pub classes: &'a ClassTable,
    pub instances: &'a [EncodedInstance<'a>],
    pub refinement: &'a RefinementConstraintSet,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConstraintEncoder {
    options: EncodingOptions,
}

impl ConstraintEncoder {
    pub fn new(options: EncodingOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &EncodingOptions {
        &self.options
    }

    pub fn encode(&self, input: &EncodingInput<'_>) -> FactSet {
        let mut facts = FactSet::new(self.options);

        for (feature, data) in input.pool.iter() {
            facts.push(Fact::Feature {
                feature,
                complexity: data.complexity,
                kind: data.kind,
            });
        }

        for encoded in input.instances {
            let instance = encoded.instance;
            let space = &instance.state_space;
            for state in space.states() {
                let state_ref = StateRef {
                    instance: instance.id,
                    state,
                };
                facts.push(Fact::State {
                    state: state_ref,
                    initial: instance.roots.contains(&state),
                    goal: space.is_goal(state),
                    solvable: !space.is_deadend(state),
                    alive: space.is_alive(state),
                });
                if self.options.goal_separation {
                    for feature in input.pool.ids() {
                        if let Some(value) = encoded.valuations.value(feature, state) {
                            facts.push(Fact::BooleanValue {
                                state: state_ref,
                                feature,
                                value: !value.is_zero(),
                            });
                        }
                    }
                }
            }
        }

        for (class, signature) in input.classes.iter() {
            facts.push(Fact::Class {
                class,
                conditions: signature.conditions.iter().map(|(f, c)| (*f, *c)).collect(),
                effects: signature.effects.iter().map(|(f, e)| (*f, *e)).collect(),
            });
        }

        for encoded in input.instances {
            for (root, tge) in encoded.tuple_graphs {
                let root_ref = StateRef {
                    instance: encoded.instance.id,
                    state: *root,
                };
                for (tuple, classes) in &tge.tuple_to_classes {
                    let Some(distance) = tge.distance_of(*tuple) else {
                        continue;
                    };
                    facts.push(Fact::Tuple {
                        root: root_ref,
                        tuple: *tuple,
                        distance,
                        classes: classes.iter().copied().collect(),
                    });
                }
                for (class, distance) in &tge.class_to_deadend_distance {
                    facts.push(Fact::DeadendDistance {
                        root: root_ref,
                        class: *class,
                        distance: *distance,
                    });
                }
                if let Some(spe) = encoded.state_pairs.get(root) {
                    for (class, distance) in &spe.class_to_min_distance {
                        facts.push(Fact::ClassDistance {
                            root: root_ref,
                            class: *class,
                            distance: *distance,
                        });
                    }
                    for (target, class) in &spe.subgoal_state_to_class {
                        facts.push(Fact::Subgoal {
                            root: root_ref,
                            target: StateRef {
                                instance: encoded.instance.id,
                                state: *target,
                            },
                            class: *class,
                        });
                    }
                }
            }
        }

        for (first, second) in input.refinement.separations() {
            facts.push(Fact::Separate {
                first: *first,
                second: *second,
            });
        }
        for exclusion in input.refinement.exclusions() {
            facts.push(Fact::Exclude {
                selected: exclusion.selected.iter().copied().collect(),
                good: exclusion.good.iter().copied().collect(),
            });
        }

        debug!(
            facts = facts.len(),
            features = input.pool.len(),
            classes = input.classes.len(),
            separations = input.refinement.separations().len(),
            "Encoded constraint facts"
        );
        facts
    }
}
