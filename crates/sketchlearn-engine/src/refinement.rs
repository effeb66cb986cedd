//! D2 pairs: the initial seed and the pairs a rejected model left unseparated.

use std::collections::BTreeSet;

use sketchlearn_ir::class_table::{ClassId, ClassTable};
use sketchlearn_ir::feature::FeatureId;

use crate::decode::{ClassVerdict, DecodedModel};
use crate::equivalence::EquivalenceData;

/// Every pair of distinct classes reachable from the same alive root.
pub fn initial_separations(data: &EquivalenceData) -> BTreeSet<(ClassId, ClassId)> {
    let mut pairs = BTreeSet::new();
    for state_pairs in &data.state_pairs {
        for spe in state_pairs.values() {
            let classes: Vec<ClassId> = spe.classes().collect();
            for (i, a) in classes.iter().enumerate() {
                for b in &classes[i + 1..] {
                    pairs.insert((*a.min(b), *a.max(b)));
                }
            }
        }
    }
    pairs
}

/// `(good, bad)` pairs that no selected feature tells apart.
pub fn unsatisfied_separations(
    classes: &ClassTable,
    decoded: &DecodedModel,
) -> Vec<(ClassId, ClassId)> {
    let bad: Vec<ClassId> = decoded
        .verdicts
        .iter()
        .filter(|(_, verdict)| **verdict == ClassVerdict::Bad)
        .map(|(class, _)| *class)
        .collect();
    let mut pairs = Vec::new();
    for good in &decoded.good {
        let Some(good_signature) = classes.get(*good) else {
            continue;
        };
        for bad_class in &bad {
            let Some(bad_signature) = classes.get(*bad_class) else {
                continue;
            };
            if !separated_by(
                &good_signature.distinguishing_features(bad_signature),
                &decoded.selected,
            ) {
                pairs.push((*good, *bad_class));
            }
        }
    }
    pairs
}

fn separated_by(distinguishing: &BTreeSet<FeatureId>, selected: &BTreeSet<FeatureId>) -> bool {
    !distinguishing.is_disjoint(selected)
}
