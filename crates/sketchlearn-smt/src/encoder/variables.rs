//! Variable naming conventions for the sketch encodings.

use sketchlearn_ir::class_table::ClassId;
use sketchlearn_ir::feature::FeatureId;
use sketchlearn_ir::valuation::{Condition, Effect};

use crate::facts::StateRef;
use crate::solver::Symbol;

/// Variable naming conventions:
/// - `sel_f`: feature f is selected
/// - `good_c`: class c is a good transition class
/// - `active_k`: rule slot k is in use (explicit mode)
/// - `cond_k_f_tag`: slot k requires condition `tag` on feature f
/// - `eff_k_f_tag`: slot k requires effect `tag` on feature f
/// - `exp_i_s`: state s of instance i is reached from the initial states
pub(crate) fn select_var(feature: FeatureId) -> String {
    format!("sel_{feature}")
}

pub(crate) fn good_var(class: ClassId) -> String {
    format!("good_{class}")
}

pub(crate) fn active_var(slot: usize) -> String {
    format!("active_{slot}")
}

pub(crate) fn slot_condition_var(slot: usize, feature: FeatureId, condition: Condition) -> String {
    format!("cond_{slot}_{feature}_{}", condition.tag())
}

pub(crate) fn slot_effect_var(slot: usize, feature: FeatureId, effect: Effect) -> String {
    format!("eff_{slot}_{feature}_{}", effect.tag())
}

pub(crate) fn expanded_var(state: StateRef) -> String {
    format!("exp_{}_{}", state.instance, state.state)
}

/// Inverse of the naming functions above. Reachability variables carry no
/// symbol.
pub fn symbol_of(name: &str) -> Option<Symbol> {
    if let Some(rest) = name.strip_prefix("sel_") {
        return rest.parse().ok().map(Symbol::Select);
    }
    if let Some(rest) = name.strip_prefix("good_") {
        return rest.parse().ok().map(Symbol::Good);
    }
    if let Some(rest) = name.strip_prefix("active_") {
        return rest.parse().ok().map(Symbol::RuleSlot);
    }
    if let Some(rest) = name.strip_prefix("cond_") {
        let (slot, feature, tag) = split_slot_var(rest)?;
        return Some(Symbol::SlotCondition {
            slot,
            feature,
            condition: Condition::from_tag(tag)?,
        });
    }
    if let Some(rest) = name.strip_prefix("eff_") {
        let (slot, feature, tag) = split_slot_var(rest)?;
        return Some(Symbol::SlotEffect {
            slot,
            feature,
            effect: Effect::from_tag(tag)?,
        });
    }
    None
}

fn split_slot_var(rest: &str) -> Option<(usize, FeatureId, &str)> {
    let mut parts = rest.splitn(3, '_');
    let slot = parts.next()?.parse().ok()?;
    let feature = parts.next()?.parse().ok()?;
    Some((slot, feature, parts.next()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_parse_back_to_symbols() {
        assert_eq!(symbol_of(&select_var(3)), Some(Symbol::Select(3)));
        assert_eq!(symbol_of(&good_var(12)), Some(Symbol::Good(12)));
        assert_eq!(symbol_of(&active_var(1)), Some(Symbol::RuleSlot(1)));
        assert_eq!(
            symbol_of(&slot_condition_var(1, 4, Condition::NumGt)),
            Some(Symbol::SlotCondition {
                slot: 1,
                feature: 4,
                condition: Condition::NumGt
            })
        );
        assert_eq!(
            symbol_of(&slot_effect_var(0, 2, Effect::BoolSame)),
            Some(Symbol::SlotEffect {
                slot: 0,
                feature: 2,
                effect: Effect::BoolSame
            })
        );
        assert_eq!(
            symbol_of(&expanded_var(StateRef {
                instance: 1,
                state: 2
            })),
            None
        );
        assert_eq!(symbol_of("kappa_0_1"), None);
        assert_eq!(symbol_of("cond_0_1_c_x"), None);
    }
}
