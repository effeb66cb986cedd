//! Constraints accumulated by the refinement loop within one outer iteration.

use std::collections::BTreeSet;

use crate::class_table::ClassId;
use crate::feature::FeatureId;

/// A solver assignment that must not be produced again.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelExclusion {
    pub selected: BTreeSet<FeatureId>,
    pub good: BTreeSet<ClassId>,
}

/// Growing set of D2 separation pairs plus blocked assignments.
///
/// Pairs are unordered and stored as `(smaller, larger)`; a pair of a class
/// with itself is never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefinementConstraintSet {
    separations: BTreeSet<(ClassId, ClassId)>,
    exclusions: BTreeSet<ModelExclusion>,
}

impl RefinementConstraintSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether the pair was new.
    pub fn insert_separation(&mut self, a: ClassId, b: ClassId) -> bool {
        if a == b {
            return false;
        }
        self.separations.insert((a.min(b), a.max(b)))
    }

    /// Returns the number of pairs that were new.
    pub fn extend_separations(
        &mut self,
        pairs: impl IntoIterator<Item = (ClassId, ClassId)>,
    ) -> usize {
        pairs
            .into_iter()
            .filter(|(a, b)| self.insert_separation(*a, *b))
            .count()
    }

    pub fn exclude(&mut self, exclusion: ModelExclusion) -> bool {
        self.exclusions.insert(exclusion)
    }

    pub fn separations(&self) -> &BTreeSet<(ClassId, ClassId)> {
        &self.separations
    }

    pub fn exclusions(&self) -> &BTreeSet<ModelExclusion> {
        &self.exclusions
    }

    pub fn contains_separation(&self, a: ClassId, b: ClassId) -> bool {
        self.separations.contains(&(a.min(b), a.max(b)))
    }

    pub fn len(&self) -> usize {
        self.separations.len() + self.exclusions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.separations.is_empty() && self.exclusions.is_empty()
    }

    pub fn clear(&mut self) {
        self.separations.clear();
        self.exclusions.clear();
    }
}
