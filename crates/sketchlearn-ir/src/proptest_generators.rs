//! Proptest strategies for class-space structures.

use std::collections::BTreeSet;

use proptest::prelude::*;

use crate::equivalence::TupleGraphEquivalence;
use crate::feature::FeatureKind;
use crate::signature::Signature;
use crate::valuation::{Condition, Effect};

/// A tuple-graph equivalence with 1–10 tuples over classes `0..8`, spread
/// over distances 1–3. Every tuple covers at least one class.
pub fn arb_tuple_graph_equivalence() -> impl Strategy<Value = TupleGraphEquivalence> {
    proptest::collection::vec(
        (
            1..=3usize,
            proptest::collection::btree_set(0..8usize, 1..=4),
        ),
        1..=10,
    )
    .prop_map(|tuples| {
        let mut tge = TupleGraphEquivalence::default();
        for (tuple, (distance, classes)) in tuples.into_iter().enumerate() {
            tge.tuple_to_classes.insert(tuple, classes);
            tge.tuple_to_distance.insert(tuple, distance);
        }
        tge
    })
}

/// A full signature over features `0..kinds.len()`.
pub fn arb_signature(kinds: Vec<FeatureKind>) -> impl Strategy<Value = Signature> {
    let per_feature: Vec<_> = kinds
        .into_iter()
        .map(|kind| {
            let conditions = Condition::for_kind(kind).to_vec();
            let effects = Effect::for_kind(kind).to_vec();
            (
                proptest::sample::select(conditions),
                proptest::sample::select(effects),
            )
        })
        .collect();
    per_feature.prop_map(|choices| {
        let mut signature = Signature::default();
        for (f, (condition, effect)) in choices.into_iter().enumerate() {
            signature.conditions.insert(f, condition);
            signature.effects.insert(f, effect);
        }
        signature
    })
}

/// A non-empty subset of `0..n` features.
pub fn arb_feature_subset(n: usize) -> impl Strategy<Value = BTreeSet<usize>> {
    let n = n.max(1);
    proptest::sample::subsequence((0..n).collect::<Vec<_>>(), 1..=n)
        .prop_map(|ids| ids.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn generated_equivalences_are_well_formed(tge in arb_tuple_graph_equivalence()) {
            prop_assert_eq!(tge.tuple_to_classes.len(), tge.tuple_to_distance.len());
            for classes in tge.tuple_to_classes.values() {
                prop_assert!(!classes.is_empty());
            }
        }

        #[test]
        fn generated_signatures_match_their_kinds(
            signature in arb_signature(vec![FeatureKind::Boolean, FeatureKind::Numerical])
        ) {
            prop_assert_eq!(signature.conditions[&0].kind(), FeatureKind::Boolean);
            prop_assert_eq!(signature.effects[&1].kind(), FeatureKind::Numerical);
        }
    }
}
