//! Symbolic signatures of state pairs.
//!
//! A signature holds at most one [`Condition`] and at most one [`Effect`] per
//! feature. Equivalence classes carry a signature over the full pool; sketch
//! rules carry one restricted to the selected features, where a missing
//! entry means "don't care".

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::IrError;
use crate::feature::FeatureId;
use crate::instance::StateId;
use crate::valuation::{Condition, Effect, ValuationTable};

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Signature {
    pub conditions: BTreeMap<FeatureId, Condition>,
    pub effects: BTreeMap<FeatureId, Effect>,
}

impl Signature {
    /// Signature of `(source, target)` over every feature in `table`.
    pub fn of_pair(
        table: &ValuationTable,
        source: StateId,
        target: StateId,
    ) -> Result<Self, IrError> {
        let mut signature = Signature::default();
        for feature in table.features() {
            let s = table.try_value(feature, source)?;
            let t = table.try_value(feature, target)?;
            signature.conditions.insert(feature, Condition::of(s));
            signature.effects.insert(feature, Effect::of(s, t));
        }
        Ok(signature)
    }

    /// Drop every condition and effect over a feature outside `features`.
    pub fn restrict(&self, features: &BTreeSet<FeatureId>) -> Signature {
        Signature {
            conditions: self
                .conditions
                .iter()
                .filter(|(f, _)| features.contains(f))
                .map(|(f, c)| (*f, *c))
                .collect(),
            effects: self
                .effects
                .iter()
                .filter(|(f, _)| features.contains(f))
                .map(|(f, e)| (*f, *e))
                .collect(),
        }
    }

    pub fn features(&self) -> BTreeSet<FeatureId> {
        self.conditions
            .keys()
            .chain(self.effects.keys())
            .copied()
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty() && self.effects.is_empty()
    }

    /// Whether the pair `(source, target)` satisfies every condition and
    /// effect. Features without a valuation never match.
    pub fn matches(&self, table: &ValuationTable, source: StateId, target: StateId) -> bool {
        let conditions_hold = self.conditions.iter().all(|(f, condition)| {
            table
                .value(*f, source)
                .is_some_and(|value| condition.holds(value))
        });
        conditions_hold
            && self.effects.iter().all(|(f, effect)| {
                match (table.value(*f, source), table.value(*f, target)) {
                    (Some(s), Some(t)) => effect.holds(s, t),
                    _ => false,
                }
            })
    }

    /// Features on which the two signatures disagree, in condition or effect.
    pub fn distinguishing_features(&self, other: &Signature) -> BTreeSet<FeatureId> {
        let mut features = BTreeSet::new();
        for f in self.features().union(&other.features()) {
            if self.conditions.get(f) != other.conditions.get(f)
                || self.effects.get(f) != other.effects.get(f)
            {
                features.insert(*f);
            }
        }
        features
    }

    /// `self` is at least as general as `other`: every requirement of `self`
    /// is also a requirement of `other`.
    pub fn subsumes(&self, other: &Signature) -> bool {
        self.conditions
            .iter()
            .all(|(f, c)| other.conditions.get(f) == Some(c))
            && self
                .effects
                .iter()
                .all(|(f, e)| other.effects.get(f) == Some(e))
    }
}
