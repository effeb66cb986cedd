//! Lowering of a [`FactSet`] to an SMT optimization query.
//!
//! Both encodings share the decision variables `sel_f` and `good_c`, the
//! objective, and the width, goal-separation and exclusion constraints.
//! The D2 encoding adds one separation constraint per D2 pair; the explicit
//! encoding instead ties `good_c` to a bounded set of rule slots.
//!
//! When the initial states are a strict subset of the alive states, only
//! states reached from them through good subgoal pairs carry a width
//! obligation; `exp_i_s` variables track that reachability.

use std::collections::{BTreeMap, BTreeSet};

use sketchlearn_ir::class_table::ClassId;
use sketchlearn_ir::feature::{FeatureId, FeatureKind};
use sketchlearn_ir::signature::Signature;
use sketchlearn_ir::valuation::{Condition, Effect};

use super::variables::{
    active_var, expanded_var, good_var, select_var, slot_condition_var, slot_effect_var,
};
use crate::facts::{EncodingMode, Fact, FactSet, StateRef};
use crate::terms::{SmtSort, SmtTerm};

/// Boolean decision problem with a linear objective to minimize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimizationQuery {
    pub declarations: Vec<(String, SmtSort)>,
    pub assertions: Vec<SmtTerm>,
    pub objective: SmtTerm,
}

impl OptimizationQuery {
    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.declarations.iter().map(|(name, _)| name.as_str())
    }

    pub fn satisfied_by(&self, assignment: &dyn Fn(&str) -> bool) -> bool {
        self.assertions.iter().all(|a| a.eval_bool(assignment))
    }

    pub fn cost(&self, assignment: &dyn Fn(&str) -> bool) -> i64 {
        self.objective.eval_int(assignment)
    }
}

/// Facts regrouped by what the constraints need.
#[derive(Default)]
struct FactIndex<'a> {
    features: BTreeMap<FeatureId, (u32, FeatureKind)>,
    classes: BTreeMap<ClassId, Signature>,
    alive_roots: BTreeSet<StateRef>,
    initial: BTreeSet<StateRef>,
    goals: BTreeSet<StateRef>,
    tuples: BTreeMap<StateRef, Vec<(usize, &'a [ClassId])>>,
    deadend_distances: BTreeMap<StateRef, Vec<(ClassId, usize)>>,
    class_distances: BTreeMap<StateRef, Vec<(ClassId, usize)>>,
    subgoals: Vec<(StateRef, StateRef, ClassId)>,
    boolean_values: BTreeMap<StateRef, BTreeMap<FeatureId, bool>>,
    separations: Vec<(ClassId, ClassId)>,
    exclusions: Vec<(&'a [FeatureId], &'a [ClassId])>,
}

impl<'a> FactIndex<'a> {
    fn build(facts: &'a FactSet) -> Self {
        let mut index = FactIndex::default();
        for fact in facts.facts() {
            match fact {
                Fact::Feature {
                    feature,
                    complexity,
                    kind,
                } => {
                    index.features.insert(*feature, (*complexity, *kind));
                }
                Fact::State {
                    state,
                    initial,
                    goal,
                    alive,
                    ..
                } => {
                    if *alive {
                        index.alive_roots.insert(*state);
                    }
                    if *initial {
                        index.initial.insert(*state);
                    }
                    if *goal {
                        index.goals.insert(*state);
                    }
                }
                Fact::BooleanValue {
                    state,
                    feature,
                    value,
                } => {
                    index
                        .boolean_values
                        .entry(*state)
                        .or_default()
                        .insert(*feature, *value);
                }
                Fact::Class {
                    class,
                    conditions,
                    effects,
                } => {
                    let signature = Signature {
                        conditions: conditions.iter().copied().collect(),
                        effects: effects.iter().copied().collect(),
                    };
                    index.classes.insert(*class, signature);
                }
                Fact::Tuple {
                    root,
                    distance,
                    classes,
                    ..
                } => index
                    .tuples
                    .entry(*root)
                    .or_default()
                    .push((*distance, classes.as_slice())),
                Fact::ClassDistance {
                    root,
                    class,
                    distance,
                } => index
                    .class_distances
                    .entry(*root)
                    .or_default()
                    .push((*class, *distance)),
                Fact::Subgoal {
                    root,
                    target,
                    class,
                } => index.subgoals.push((*root, *target, *class)),
                Fact::DeadendDistance {
                    root,
                    class,
                    distance,
                } => index
                    .deadend_distances
                    .entry(*root)
                    .or_default()
                    .push((*class, *distance)),
                Fact::Separate { first, second } => index.separations.push((*first, *second)),
                Fact::Exclude { selected, good } => {
                    index.exclusions.push((selected.as_slice(), good.as_slice()))
                }
            }
        }
        index
    }

    /// Alive states that are not initial. Their width obligation only holds
    /// once they are reached.
    fn open_roots(&self) -> BTreeSet<StateRef> {
        self.alive_roots.difference(&self.initial).copied().collect()
    }
}

fn sel(feature: FeatureId) -> SmtTerm {
    SmtTerm::var(select_var(feature))
}

fn good(class: ClassId) -> SmtTerm {
    SmtTerm::var(good_var(class))
}

pub fn lower(facts: &FactSet) -> OptimizationQuery {
    let options = *facts.options();
    let index = FactIndex::build(facts);

    let mut declarations: Vec<(String, SmtSort)> = index
        .features
        .keys()
        .map(|f| (select_var(*f), SmtSort::Bool))
        .collect();
    declarations.extend(index.classes.keys().map(|c| (good_var(*c), SmtSort::Bool)));

    let objective = SmtTerm::sum(
        index
            .features
            .iter()
            .map(|(f, (complexity, _))| {
                sel(*f).ite(SmtTerm::int(i64::from(*complexity)), SmtTerm::int(0))
            })
            .collect(),
    );

    let mut assertions = Vec::new();
    let open_roots = index.open_roots();
    declarations.extend(open_roots.iter().map(|s| (expanded_var(*s), SmtSort::Bool)));
    width_constraints(&index, &open_roots, options.optimal_width, &mut assertions);
    reachability_constraints(&index, &open_roots, &mut assertions);
    separation_constraints(&index, &mut assertions);
    if options.goal_separation {
        goal_separation_constraints(&index, &mut assertions);
    }
    exclusion_constraints(&index, &mut assertions);
    if options.mode == EncodingMode::Explicit {
        explicit_rule_constraints(&index, options.max_num_rules, &mut declarations, &mut assertions);
    }

    OptimizationQuery {
        declarations,
        assertions,
        objective,
    }
}

/// Every alive root needs a kept tuple whose classes are all good while no
/// class reaching a dead end at or before that distance is good.
fn width_constraints(
    index: &FactIndex<'_>,
    open_roots: &BTreeSet<StateRef>,
    optimal_width: bool,
    out: &mut Vec<SmtTerm>,
) {
    let empty = Vec::new();
    for root in &index.alive_roots {
        let deadends = index.deadend_distances.get(root).unwrap_or(&empty);
        let witnessed = index.class_distances.get(root).unwrap_or(&empty);
        let admissible = index
            .tuples
            .get(root)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .map(|(distance, classes)| {
                let mut conjuncts: Vec<SmtTerm> = classes.iter().map(|c| good(*c)).collect();
                conjuncts.extend(
                    deadends
                        .iter()
                        .filter(|(_, d)| d <= distance)
                        .map(|(c, _)| good(*c).not()),
                );
                if optimal_width {
                    conjuncts.extend(
                        witnessed
                            .iter()
                            .filter(|(_, d)| d < distance)
                            .map(|(c, _)| good(*c).not()),
                    );
                }
                SmtTerm::and(conjuncts)
            })
            .collect();
        let obligation = SmtTerm::or(admissible);
        if open_roots.contains(root) {
            out.push(SmtTerm::var(expanded_var(*root)).implies(obligation));
        } else {
            out.push(obligation);
        }
    }
}

/// A good subgoal pair from a reached root reaches its target.
fn reachability_constraints(
    index: &FactIndex<'_>,
    open_roots: &BTreeSet<StateRef>,
    out: &mut Vec<SmtTerm>,
) {
    if open_roots.is_empty() {
        return;
    }
    for (root, target, class) in &index.subgoals {
        if !open_roots.contains(target) || !index.alive_roots.contains(root) {
            continue;
        }
        let step = if open_roots.contains(root) {
            SmtTerm::and(vec![SmtTerm::var(expanded_var(*root)), good(*class)])
        } else {
            good(*class)
        };
        out.push(step.implies(SmtTerm::var(expanded_var(*target))));
    }
}

/// A D2 pair with exactly one good class must be told apart by a selected
/// feature on which the two signatures differ.
fn separation_constraints(index: &FactIndex<'_>, out: &mut Vec<SmtTerm>) {
    for (a, b) in &index.separations {
        let (Some(sig_a), Some(sig_b)) = (index.classes.get(a), index.classes.get(b)) else {
            continue;
        };
        let distinguishing = sig_a
            .distinguishing_features(sig_b)
            .into_iter()
            .filter(|f| index.features.contains_key(f))
            .map(sel)
            .collect();
        let split = good(*a).eq(good(*b)).not();
        out.push(split.implies(SmtTerm::or(distinguishing)));
    }
}

fn goal_separation_constraints(index: &FactIndex<'_>, out: &mut Vec<SmtTerm>) {
    let mut goal_vectors = BTreeSet::new();
    let mut nongoal_vectors = BTreeSet::new();
    for (state, values) in &index.boolean_values {
        if index.goals.contains(state) {
            goal_vectors.insert(values);
        } else {
            nongoal_vectors.insert(values);
        }
    }
    for goal in &goal_vectors {
        for nongoal in &nongoal_vectors {
            let differing = goal
                .iter()
                .filter(|(f, v)| nongoal.get(f) != Some(v))
                .map(|(f, _)| sel(*f))
                .collect();
            out.push(SmtTerm::or(differing));
        }
    }
}

fn exclusion_constraints(index: &FactIndex<'_>, out: &mut Vec<SmtTerm>) {
    for (selected, good_classes) in &index.exclusions {
        let mut exact: Vec<SmtTerm> = index
            .features
            .keys()
            .map(|f| sel(*f).literal(selected.contains(f)))
            .collect();
        exact.extend(
            index
                .classes
                .keys()
                .map(|c| good(*c).literal(good_classes.contains(c))),
        );
        out.push(SmtTerm::and(exact).not());
    }
}

fn explicit_rule_constraints(
    index: &FactIndex<'_>,
    num_slots: usize,
    declarations: &mut Vec<(String, SmtSort)>,
    out: &mut Vec<SmtTerm>,
) {
    for slot in 0..num_slots {
        let active = SmtTerm::var(active_var(slot));
        declarations.push((active_var(slot), SmtSort::Bool));
        if slot > 0 {
            out.push(active.clone().implies(SmtTerm::var(active_var(slot - 1))));
        }
        for (f, (_, kind)) in &index.features {
            let conditions: Vec<String> = Condition::for_kind(*kind)
                .iter()
                .map(|c| slot_condition_var(slot, *f, *c))
                .collect();
            let effects: Vec<String> = Effect::for_kind(*kind)
                .iter()
                .map(|e| slot_effect_var(slot, *f, *e))
                .collect();
            for group in [&conditions, &effects] {
                for (i, name) in group.iter().enumerate() {
                    declarations.push((name.clone(), SmtSort::Bool));
                    let choice = SmtTerm::var(name.clone());
                    out.push(choice.clone().implies(sel(*f)));
                    out.push(choice.clone().implies(active.clone()));
                    for other in &group[i + 1..] {
                        out.push(SmtTerm::and(vec![choice.clone(), SmtTerm::var(other.clone())]).not());
                    }
                }
            }
        }
    }

    for (class, signature) in &index.classes {
        let matches = (0..num_slots)
            .map(|slot| slot_matches(index, slot, signature))
            .collect();
        out.push(good(*class).eq(SmtTerm::or(matches)));
    }
}

/// Slot `slot` is active and every requirement it picks agrees with `signature`.
fn slot_matches(index: &FactIndex<'_>, slot: usize, signature: &Signature) -> SmtTerm {
    let mut conjuncts = vec![SmtTerm::var(active_var(slot))];
    for (f, (_, kind)) in &index.features {
        let own_condition = signature.conditions.get(f);
        conjuncts.extend(
            Condition::for_kind(*kind)
                .iter()
                .filter(|c| own_condition != Some(*c))
                .map(|c| SmtTerm::var(slot_condition_var(slot, *f, *c)).not()),
        );
        let own_effect = signature.effects.get(f);
        conjuncts.extend(
            Effect::for_kind(*kind)
                .iter()
                .filter(|e| own_effect != Some(*e))
                .map(|e| SmtTerm::var(slot_effect_var(slot, *f, *e)).not()),
        );
    }
    SmtTerm::and(conjuncts)
}
