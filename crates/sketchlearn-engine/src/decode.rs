//! Turning an optimal model into a candidate sketch.

use std::collections::{BTreeMap, BTreeSet};

use sketchlearn_ir::class_table::{ClassId, ClassTable};
use sketchlearn_ir::feature::{FeatureId, FeaturePool};
use sketchlearn_ir::signature::Signature;
use sketchlearn_ir::sketch::Sketch;
use sketchlearn_ir::IrError;
use sketchlearn_smt::facts::EncodingMode;
use sketchlearn_smt::solver::SolverModel;

/// The solver's judgement of one class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassVerdict {
    Good,
    Bad,
    /// Named by the model but unknown to the class table.
    Undetermined,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedModel {
    pub selected: BTreeSet<FeatureId>,
    /// Classes of the table judged good.
    pub good: BTreeSet<ClassId>,
    pub verdicts: BTreeMap<ClassId, ClassVerdict>,
    pub sketch: Sketch,
}

pub fn class_verdicts(model: &SolverModel, classes: &ClassTable) -> BTreeMap<ClassId, ClassVerdict> {
    let good = model.good_classes();
    let mut verdicts: BTreeMap<ClassId, ClassVerdict> = classes
        .ids()
        .map(|class| {
            let verdict = if good.contains(&class) {
                ClassVerdict::Good
            } else {
                ClassVerdict::Bad
            };
            (class, verdict)
        })
        .collect();
    for class in good {
        verdicts.entry(class).or_insert(ClassVerdict::Undetermined);
    }
    verdicts
}

/// Build the sketch of `model`. Rules mention selected features only and
/// identical rules collapse into one.
pub fn decode(
    model: &SolverModel,
    pool: &FeaturePool,
    classes: &ClassTable,
    mode: EncodingMode,
) -> Result<DecodedModel, IrError> {
    let selected: BTreeSet<FeatureId> = model
        .selected_features()
        .into_iter()
        .filter(|f| pool.get(*f).is_some())
        .collect();
    let verdicts = class_verdicts(model, classes);
    let good: BTreeSet<ClassId> = verdicts
        .iter()
        .filter(|(_, verdict)| **verdict == ClassVerdict::Good)
        .map(|(class, _)| *class)
        .collect();

    let rules: Vec<Signature> = match mode {
        EncodingMode::D2 => good
            .iter()
            .filter_map(|class| classes.get(*class).cloned())
            .collect(),
        EncodingMode::Explicit => model
            .active_slots()
            .into_values()
            .map(|slot| Signature {
                conditions: slot.conditions,
                effects: slot.effects,
            })
            .collect(),
    };
    let sketch = Sketch::new(pool, &selected, rules)?;
    Ok(DecodedModel {
        selected,
        good,
        verdicts,
        sketch,
    })
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use sketchlearn_ir::feature::{Feature, FeatureKind};
    use sketchlearn_ir::proptest_generators::{arb_feature_subset, arb_signature};
    use sketchlearn_ir::valuation::{Condition, Effect};
    use sketchlearn_smt::solver::Symbol;

    use super::*;

    fn pool() -> FeaturePool {
        [
            Feature::boolean("b0", 2),
            Feature::numerical("n0", 2),
            Feature::boolean("b1", 3),
        ]
        .into_iter()
        .collect()
    }

    fn kinds() -> Vec<FeatureKind> {
        vec![FeatureKind::Boolean, FeatureKind::Numerical, FeatureKind::Boolean]
    }

    #[test]
    fn verdicts_flag_unknown_good_classes() {
        let mut classes = ClassTable::new();
        classes.get_or_insert(Signature::default());
        let model = SolverModel::new(vec![Symbol::Good(0), Symbol::Good(7)]);
        let verdicts = class_verdicts(&model, &classes);
        assert_eq!(verdicts[&0], ClassVerdict::Good);
        assert_eq!(verdicts[&7], ClassVerdict::Undetermined);
    }

    #[test]
    fn explicit_slots_become_rules() {
        let classes = ClassTable::new();
        let model = SolverModel::new(vec![
            Symbol::Select(1),
            Symbol::RuleSlot(0),
            Symbol::SlotCondition {
                slot: 0,
                feature: 1,
                condition: Condition::NumGt,
            },
            Symbol::SlotEffect {
                slot: 0,
                feature: 1,
                effect: Effect::NumDown,
            },
            Symbol::RuleSlot(1),
            Symbol::SlotEffect {
                slot: 1,
                feature: 1,
                effect: Effect::NumDown,
            },
        ]);
        let decoded = decode(&model, &pool(), &classes, EncodingMode::Explicit).expect("decode");
        assert_eq!(decoded.sketch.num_rules(), 2);
        assert_eq!(decoded.sketch.selected_features(), BTreeSet::from([1]));
        assert!(decoded.good.is_empty());
    }

    proptest! {
        #[test]
        fn decoded_rules_only_mention_selected_features(
            signatures in proptest::collection::vec(arb_signature(kinds()), 1..6),
            selected in arb_feature_subset(3),
            good_mask in proptest::collection::vec(any::<bool>(), 6),
        ) {
            let mut classes = ClassTable::new();
            for signature in signatures {
                classes.get_or_insert(signature);
            }
            let mut symbols: Vec<Symbol> = selected.iter().map(|f| Symbol::Select(*f)).collect();
            symbols.extend(
                classes
                    .ids()
                    .filter(|c| good_mask[*c])
                    .map(Symbol::Good),
            );
            let model = SolverModel::new(symbols);
            let decoded = decode(&model, &pool(), &classes, EncodingMode::D2).expect("decode");
            let chosen = decoded.sketch.selected_features();
            prop_assert_eq!(&chosen, &selected);
            for rule in decoded.sketch.rules() {
                prop_assert!(rule.features().is_subset(&chosen));
            }
            prop_assert!(decoded.sketch.num_rules() <= decoded.good.len());
        }
    }
}
