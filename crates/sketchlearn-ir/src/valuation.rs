//! Per-state feature valuations and the conditions and effects derived from them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::IrError;
use crate::feature::{FeatureId, FeatureKind, FeatureValue};
use crate::instance::StateId;

/// What one state says about one feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Condition {
    PosBool,
    NegBool,
    NumGt,
    NumEq,
}

impl Condition {
    pub const BOOLEAN: [Condition; 2] = [Condition::PosBool, Condition::NegBool];
    pub const NUMERICAL: [Condition; 2] = [Condition::NumGt, Condition::NumEq];

    pub fn of(value: FeatureValue) -> Self {
        match value {
            FeatureValue::Boolean(true) => Condition::PosBool,
            FeatureValue::Boolean(false) => Condition::NegBool,
            FeatureValue::Numerical(n) if n > 0 => Condition::NumGt,
            FeatureValue::Numerical(_) => Condition::NumEq,
        }
    }

    pub fn holds(self, value: FeatureValue) -> bool {
        Condition::of(value) == self
    }

    pub fn for_kind(kind: FeatureKind) -> &'static [Condition] {
        match kind {
            FeatureKind::Boolean => &Self::BOOLEAN,
            FeatureKind::Numerical => &Self::NUMERICAL,
        }
    }

    pub fn kind(self) -> FeatureKind {
        match self {
            Condition::PosBool | Condition::NegBool => FeatureKind::Boolean,
            Condition::NumGt | Condition::NumEq => FeatureKind::Numerical,
        }
    }

    /// The other condition on the same feature.
    pub fn complement(self) -> Self {
        match self {
            Condition::PosBool => Condition::NegBool,
            Condition::NegBool => Condition::PosBool,
            Condition::NumGt => Condition::NumEq,
            Condition::NumEq => Condition::NumGt,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Condition::PosBool => "c_b_pos",
            Condition::NegBool => "c_b_neg",
            Condition::NumGt => "c_n_gt",
            Condition::NumEq => "c_n_eq",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "c_b_pos" => Some(Condition::PosBool),
            "c_b_neg" => Some(Condition::NegBool),
            "c_n_gt" => Some(Condition::NumGt),
            "c_n_eq" => Some(Condition::NumEq),
            _ => None,
        }
    }
}

/// How one feature changes along an ordered state pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Effect {
    BoolUp,
    BoolDown,
    BoolSame,
    NumUp,
    NumDown,
    NumSame,
}

impl Effect {
    pub const BOOLEAN: [Effect; 3] = [Effect::BoolUp, Effect::BoolDown, Effect::BoolSame];
    pub const NUMERICAL: [Effect; 3] = [Effect::NumUp, Effect::NumDown, Effect::NumSame];

    /// The kind of `source` decides between the Boolean and numerical family.
    pub fn of(source: FeatureValue, target: FeatureValue) -> Self {
        let (s, t) = (source.as_i64(), target.as_i64());
        match source.kind() {
            FeatureKind::Boolean => match s.cmp(&t) {
                std::cmp::Ordering::Less => Effect::BoolUp,
                std::cmp::Ordering::Greater => Effect::BoolDown,
                std::cmp::Ordering::Equal => Effect::BoolSame,
            },
            FeatureKind::Numerical => match s.cmp(&t) {
                std::cmp::Ordering::Less => Effect::NumUp,
                std::cmp::Ordering::Greater => Effect::NumDown,
                std::cmp::Ordering::Equal => Effect::NumSame,
            },
        }
    }

    pub fn holds(self, source: FeatureValue, target: FeatureValue) -> bool {
        Effect::of(source, target) == self
    }

    pub fn for_kind(kind: FeatureKind) -> &'static [Effect] {
        match kind {
            FeatureKind::Boolean => &Self::BOOLEAN,
            FeatureKind::Numerical => &Self::NUMERICAL,
        }
    }

    pub fn kind(self) -> FeatureKind {
        match self {
            Effect::BoolUp | Effect::BoolDown | Effect::BoolSame => FeatureKind::Boolean,
            Effect::NumUp | Effect::NumDown | Effect::NumSame => FeatureKind::Numerical,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Effect::BoolUp => "e_b_pos",
            Effect::BoolDown => "e_b_neg",
            Effect::BoolSame => "e_b_bot",
            Effect::NumUp => "e_n_inc",
            Effect::NumDown => "e_n_dec",
            Effect::NumSame => "e_n_bot",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "e_b_pos" => Some(Effect::BoolUp),
            "e_b_neg" => Some(Effect::BoolDown),
            "e_b_bot" => Some(Effect::BoolSame),
            "e_n_inc" => Some(Effect::NumUp),
            "e_n_dec" => Some(Effect::NumDown),
            "e_n_bot" => Some(Effect::NumSame),
            _ => None,
        }
    }
}

/// Column-oriented feature values of one instance: one column per feature,
/// one entry per state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValuationTable {
    num_states: usize,
    columns: BTreeMap<FeatureId, Vec<FeatureValue>>,
}

impl ValuationTable {
    pub fn new(num_states: usize) -> Self {
        Self {
            num_states,
            columns: BTreeMap::new(),
        }
    }

    pub fn num_states(&self) -> usize {
        self.num_states
    }

    /// Store the column of `feature`. Its length must match the state count.
    pub fn insert_column(
        &mut self,
        feature: FeatureId,
        values: Vec<FeatureValue>,
    ) -> Result<(), IrError> {
        if values.len() != self.num_states {
            return Err(IrError::MissingValuation {
                feature,
                state: values.len().min(self.num_states),
            });
        }
        self.columns.insert(feature, values);
        Ok(())
    }

    pub fn contains(&self, feature: FeatureId) -> bool {
        self.columns.contains_key(&feature)
    }

    pub fn features(&self) -> impl Iterator<Item = FeatureId> + '_ {
        self.columns.keys().copied()
    }

    pub fn column(&self, feature: FeatureId) -> Option<&[FeatureValue]> {
        self.columns.get(&feature).map(Vec::as_slice)
    }

    pub fn value(&self, feature: FeatureId, state: StateId) -> Option<FeatureValue> {
        self.columns.get(&feature)?.get(state).copied()
    }

    pub fn try_value(&self, feature: FeatureId, state: StateId) -> Result<FeatureValue, IrError> {
        self.value(feature, state)
            .ok_or(IrError::MissingValuation { feature, state })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conditions_follow_sign_of_value() {
        assert_eq!(Condition::of(FeatureValue::Boolean(true)), Condition::PosBool);
        assert_eq!(Condition::of(FeatureValue::Numerical(0)), Condition::NumEq);
        assert_eq!(Condition::of(FeatureValue::Numerical(7)), Condition::NumGt);
        assert_eq!(Condition::NumGt.complement(), Condition::NumEq);
    }

    #[test]
    fn effects_follow_value_delta() {
        let up = Effect::of(FeatureValue::Boolean(false), FeatureValue::Boolean(true));
        let dec = Effect::of(FeatureValue::Numerical(2), FeatureValue::Numerical(1));
        let same = Effect::of(FeatureValue::Numerical(3), FeatureValue::Numerical(3));
        assert_eq!((up, dec, same), (Effect::BoolUp, Effect::NumDown, Effect::NumSame));
    }

    #[test]
    fn tags_parse_back() {
        for condition in Condition::BOOLEAN.iter().chain(Condition::NUMERICAL.iter()) {
            assert_eq!(Condition::from_tag(condition.tag()), Some(*condition));
        }
        for effect in Effect::BOOLEAN.iter().chain(Effect::NUMERICAL.iter()) {
            assert_eq!(Effect::from_tag(effect.tag()), Some(*effect));
        }
        assert_eq!(Effect::from_tag("e_x"), None);
    }

    #[test]
    fn table_rejects_short_columns() {
        let mut table = ValuationTable::new(3);
        let err = table
            .insert_column(0, vec![FeatureValue::Numerical(1)])
            .expect_err("short column should be rejected");
        assert!(matches!(err, IrError::MissingValuation { feature: 0, .. }));
        table
            .insert_column(1, vec![FeatureValue::Numerical(1); 3])
            .expect("full column should be accepted");
        assert_eq!(table.value(1, 2), Some(FeatureValue::Numerical(1)));
        assert_eq!(table.value(1, 3), None);
    }
}
