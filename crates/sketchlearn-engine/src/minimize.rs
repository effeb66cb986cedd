//! Rule-level simplification of an accepted sketch.

use std::collections::BTreeSet;

use sketchlearn_ir::signature::Signature;
use sketchlearn_ir::sketch::Sketch;

/// Same features, fewer rules.
pub fn minimize_sketch(sketch: &Sketch) -> Sketch {
    sketch.with_rules(minimize_rules(sketch.rules()))
}

/// Drop subsumed rules and merge complementary pairs until nothing changes.
/// Every step removes at least one rule.
pub fn minimize_rules(rules: &BTreeSet<Signature>) -> BTreeSet<Signature> {
    let mut current = rules.clone();
    while let Some(next) = drop_subsumed(&current).or_else(|| merge_complementary(&current)) {
        current = next;
    }
    current
}

fn drop_subsumed(rules: &BTreeSet<Signature>) -> Option<BTreeSet<Signature>> {
    let redundant = rules
        .iter()
        .find(|rule| rules.iter().any(|other| other != *rule && other.subsumes(rule)))?
        .clone();
    let mut next = rules.clone();
    next.remove(&redundant);
    Some(next)
}

fn merge_complementary(rules: &BTreeSet<Signature>) -> Option<BTreeSet<Signature>> {
    for a in rules {
        for b in rules.range(a..).skip(1) {
            if let Some(merged) = merged_pair(a, b) {
                let mut next = rules.clone();
                next.remove(a);
                next.remove(b);
                next.insert(merged);
                return Some(next);
            }
        }
    }
    None
}

/// `a` without its condition on `f`, when `b` differs from it only by the
/// complementary condition on `f`.
fn merged_pair(a: &Signature, b: &Signature) -> Option<Signature> {
    if a.effects != b.effects || a.conditions.len() != b.conditions.len() {
        return None;
    }
    let mut differing = a
        .conditions
        .iter()
        .filter(|(f, condition)| b.conditions.get(*f) != Some(*condition));
    let (feature, condition) = differing.next()?;
    if differing.next().is_some() || b.conditions.get(feature) != Some(&condition.complement()) {
        return None;
    }
    let mut merged = a.clone();
    merged.conditions.remove(feature);
    Some(merged)
}
