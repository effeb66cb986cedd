//! Sketches and their policy text format.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::IrError;
use crate::feature::{Feature, FeatureId, FeatureKind, FeaturePool};
use crate::instance::StateId;
use crate::sexpr::{self, SExpr};
use crate::signature::Signature;
use crate::valuation::{Condition, Effect, ValuationTable};

/// Selected features plus rules over them.
///
/// Rules are restricted to the selected features on construction and kept
/// in a set, so structurally identical rules collapse into one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sketch {
    features: BTreeMap<FeatureId, Feature>,
    rules: BTreeSet<Signature>,
}

impl Sketch {
    pub fn new(
        pool: &FeaturePool,
        selected: &BTreeSet<FeatureId>,
        rules: impl IntoIterator<Item = Signature>,
    ) -> Result<Self, IrError> {
        let features = selected
            .iter()
            .map(|id| {
                pool.get(*id)
                    .map(|feature| (*id, feature.clone()))
                    .ok_or(IrError::FeatureIdOutOfRange(*id))
            })
            .collect::<Result<BTreeMap<_, _>, _>>()?;
        let rules = rules.into_iter().map(|rule| rule.restrict(selected)).collect();
        Ok(Self { features, rules })
    }

    /// Same features, different rules.
    pub fn with_rules(&self, rules: impl IntoIterator<Item = Signature>) -> Self {
        let selected = self.selected_features();
        Self {
            features: self.features.clone(),
            rules: rules.into_iter().map(|rule| rule.restrict(&selected)).collect(),
        }
    }

    pub fn selected_features(&self) -> BTreeSet<FeatureId> {
        self.features.keys().copied().collect()
    }

    pub fn features(&self) -> &BTreeMap<FeatureId, Feature> {
        &self.features
    }

    pub fn rules(&self) -> &BTreeSet<Signature> {
        &self.rules
    }

    pub fn num_rules(&self) -> usize {
        self.rules.len()
    }

    pub fn complexity(&self) -> u32 {
        self.features.values().map(|f| f.complexity).sum()
    }

    pub fn features_of_kind(&self, kind: FeatureKind) -> impl Iterator<Item = FeatureId> + '_ {
        self.features
            .iter()
            .filter(move |(_, feature)| feature.kind == kind)
            .map(|(id, _)| *id)
    }

    /// Some rule matches the pair `(source, target)`.
    pub fn is_compatible(&self, table: &ValuationTable, source: StateId, target: StateId) -> bool {
        self.rules
            .iter()
            .any(|rule| rule.matches(table, source, target))
    }

    pub fn to_policy_text(&self) -> String {
        let mut out = String::from("(:policy\n");
        for (kind, keyword) in [
            (FeatureKind::Boolean, ":booleans"),
            (FeatureKind::Numerical, ":numericals"),
        ] {
            out.push('(');
            out.push_str(keyword);
            for id in self.features_of_kind(kind) {
                let repr = self.features.get(&id).map(|f| f.repr.as_str()).unwrap_or_default();
                out.push_str(&format!(" (f{id} {})", sexpr::quote(repr)));
            }
            out.push_str(")\n");
        }
        for rule in &self.rules {
            out.push_str("(:rule (:conditions");
            for (f, condition) in &rule.conditions {
                out.push_str(&format!(" (:{} f{f})", condition.tag()));
            }
            out.push_str(") (:effects");
            for (f, effect) in &rule.effects {
                out.push_str(&format!(" (:{} f{f})", effect.tag()));
            }
            out.push_str("))\n");
        }
        out.push_str(")\n");
        out
    }

    /// Read policy text back. Feature names in the text are mapped to pool
    /// ids through their representation.
    pub fn parse_policy_text(text: &str, pool: &FeaturePool) -> Result<Self, IrError> {
        let parsed = sexpr::parse(text)?;
        let policy = match parsed.as_slice() {
            [policy] if policy.head() == Some(":policy") => policy,
            _ => return Err(IrError::PolicyParse("expected a single (:policy ...)".into())),
        };
        let sections = policy.as_list().unwrap_or_default();

        let mut names: BTreeMap<String, FeatureId> = BTreeMap::new();
        let mut selected = BTreeSet::new();
        let mut rules = Vec::new();
        for section in sections.iter().skip(1) {
            match section.head() {
                Some(keyword @ (":booleans" | ":numericals")) => {
                    let kind = if keyword == ":booleans" {
                        FeatureKind::Boolean
                    } else {
                        FeatureKind::Numerical
                    };
                    for decl in section.as_list().unwrap_or_default().iter().skip(1) {
                        let (name, repr) = match decl.as_list() {
                            Some([SExpr::Atom(name), SExpr::Str(repr)]) => (name, repr),
                            _ => return Err(IrError::PolicyParse(format!("bad feature declaration {decl:?}"))),
                        };
                        let id = pool.id_of(repr).ok_or_else(|| {
                            IrError::PolicyParse(format!("feature `{repr}` is not in the pool"))
                        })?;
                        if pool.kind_of(id) != Some(kind) {
                            return Err(IrError::PolicyParse(format!(
                                "feature `{repr}` is not {}",
                                kind.tag()
                            )));
                        }
                        names.insert(name.clone(), id);
                        selected.insert(id);
                    }
                }
                Some(":rule") => rules.push(parse_rule(section, &names)?),
                _ => return Err(IrError::PolicyParse(format!("unexpected section {section:?}"))),
            }
        }
        Sketch::new(pool, &selected, rules)
    }
}

fn parse_rule(section: &SExpr, names: &BTreeMap<String, FeatureId>) -> Result<Signature, IrError> {
    let mut rule = Signature::default();
    for part in section.as_list().unwrap_or_default().iter().skip(1) {
        let is_conditions = match part.head() {
            Some(":conditions") => true,
            Some(":effects") => false,
            _ => return Err(IrError::PolicyParse(format!("unexpected rule part {part:?}"))),
        };
        for literal in part.as_list().unwrap_or_default().iter().skip(1) {
            let (tag, name) = match literal.as_list() {
                Some([SExpr::Atom(tag), SExpr::Atom(name)]) => (tag.trim_start_matches(':'), name),
                _ => return Err(IrError::PolicyParse(format!("bad literal {literal:?}"))),
            };
            let feature = *names
                .get(name)
                .ok_or_else(|| IrError::PolicyParse(format!("undeclared feature `{name}`")))?;
            if is_conditions {
                let condition = Condition::from_tag(tag)
                    .ok_or_else(|| IrError::PolicyParse(format!("unknown condition `{tag}`")))?;
                rule.conditions.insert(feature, condition);
            } else {
                let effect = Effect::from_tag(tag)
                    .ok_or_else(|| IrError::PolicyParse(format!("unknown effect `{tag}`")))?;
                rule.effects.insert(feature, effect);
            }
        }
    }
    Ok(rule)
}

impl std::fmt::Display for Sketch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_policy_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> FeaturePool {
        [
            Feature::boolean("holding", 2),
            Feature::numerical("count(on_g!=on)", 4),
            Feature::numerical("unused", 1),
        ]
        .into_iter()
        .collect()
    }

    fn rule(b0: Condition, n0: Condition, e0: Effect, e1: Effect) -> Signature {
        let mut rule = Signature::default();
        rule.conditions.insert(0, b0);
        rule.conditions.insert(1, n0);
        rule.effects.insert(0, e0);
        rule.effects.insert(1, e1);
        rule.effects.insert(2, Effect::NumSame);
        rule
    }

    #[test]
    fn construction_restricts_and_deduplicates_rules() {
        let pool = pool();
        let a = rule(Condition::NegBool, Condition::NumGt, Effect::BoolUp, Effect::NumDown);
        let sketch = Sketch::new(&pool, &BTreeSet::from([0, 1]), [a.clone(), a])
            .expect("sketch should build");
        assert_eq!(sketch.num_rules(), 1);
        assert!(sketch
            .rules()
            .iter()
            .all(|r| r.features().is_subset(&sketch.selected_features())));
        assert_eq!(sketch.complexity(), 6);
    }

    #[test]
    fn policy_text_survives_a_parse() {
        let pool = pool();
        let sketch = Sketch::new(
            &pool,
            &BTreeSet::from([0, 1]),
            [
                rule(Condition::NegBool, Condition::NumGt, Effect::BoolUp, Effect::NumDown),
                rule(Condition::PosBool, Condition::NumGt, Effect::BoolDown, Effect::NumDown),
            ],
        )
        .expect("sketch should build");
        let text = sketch.to_policy_text();
        assert!(text.starts_with("(:policy\n(:booleans (f0 \"holding\"))"));
        assert!(text.contains("(:c_b_neg f0)"));
        let parsed = Sketch::parse_policy_text(&text, &pool).expect("text should parse");
        assert_eq!(parsed, sketch);
    }

    #[test]
    fn parse_rejects_unknown_features() {
        let pool = pool();
        let text = "(:policy (:booleans (f0 \"missing\")))";
        let err = Sketch::parse_policy_text(text, &pool).expect_err("unknown feature");
        assert!(matches!(err, IrError::PolicyParse(_)));
    }
}
