mod common;

use std::collections::{BTreeMap, BTreeSet};

use common::*;
use sketchlearn_engine::{LearnerOptions, RefinementLoop};
use sketchlearn_ir::signature::Signature;
use sketchlearn_ir::valuation::{Condition, Effect};
use sketchlearn_smt::backends::exhaustive::ExhaustiveSolver;
use sketchlearn_smt::facts::EncodingMode;

#[test]
fn d2_excludes_cycling_models_until_the_counter_must_decrease() {
    let options = LearnerOptions::default();
    let problem = problem(COUNTER_FEATURE, &[BACK_AND_FORTH]);
    let instances = prepared(&problem, &options);
    let mut learner = RefinementLoop::new(&problem, &problem, ExhaustiveSolver::new(), options);
    let outcome = learner.run(&instances).expect("accepted");

    let decreasing = Signature {
        conditions: BTreeMap::from([(0, Condition::NumGt)]),
        effects: BTreeMap::from([(0, Effect::NumDown)]),
    };
    assert_eq!(outcome.sketch.rules(), &BTreeSet::from([decreasing]));
    assert_eq!(outcome.statistics.num_equivalence_classes, 2);
    assert_eq!(outcome.statistics.num_solver_calls, 3);
    assert_eq!(outcome.statistics.num_outer_iterations, 1);
}

#[test]
fn explicit_rules_need_no_condition() {
    let options = LearnerOptions {
        encoding: EncodingMode::Explicit,
        max_num_rules: 1,
        ..LearnerOptions::default()
    };
    let problem = problem(COUNTER_FEATURE, &[BACK_AND_FORTH]);
    let instances = prepared(&problem, &options);
    let mut learner = RefinementLoop::new(&problem, &problem, ExhaustiveSolver::new(), options);
    let outcome = learner.run(&instances).expect("accepted");

    let decrement = Signature {
        conditions: BTreeMap::new(),
        effects: BTreeMap::from([(0, Effect::NumDown)]),
    };
    assert_eq!(outcome.sketch.selected_features(), BTreeSet::from([0]));
    assert_eq!(outcome.sketch.rules(), &BTreeSet::from([decrement]));
    assert_eq!(outcome.statistics.num_solver_calls, 3);
    assert!(outcome
        .sketch
        .to_policy_text()
        .contains("(:rule (:conditions) (:effects (:e_n_dec f0)))"));
}
