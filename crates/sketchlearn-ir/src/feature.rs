//! Typed features and the deduplicated feature pool.

use indexmap::map::Entry;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Dense index of a feature inside a [`FeaturePool`].
pub type FeatureId = usize;

/// Value that distance-like numerical features take on unreachable targets.
pub const INFINITE_VALUE: i64 = 2_147_483_647;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    Boolean,
    Numerical,
}

impl FeatureKind {
    pub fn tag(self) -> &'static str {
        match self {
            FeatureKind::Boolean => "boolean",
            FeatureKind::Numerical => "numerical",
        }
    }
}

impl std::fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// A feature as handed over by the feature generator.
///
/// `repr` is the structural representation used for deduplication; the
/// evaluator is looked up by it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Feature {
    pub repr: String,
    pub kind: FeatureKind,
    #[serde(default)]
    pub complexity: u32,
}

impl Feature {
    pub fn boolean(repr: impl Into<String>, complexity: u32) -> Self {
        Self {
            repr: repr.into(),
            kind: FeatureKind::Boolean,
            complexity,
        }
    }

    pub fn numerical(repr: impl Into<String>, complexity: u32) -> Self {
        Self {
            repr: repr.into(),
            kind: FeatureKind::Numerical,
            complexity,
        }
    }
}

/// Value of one feature in one state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Boolean(bool),
    Numerical(i64),
}

impl FeatureValue {
    pub fn kind(self) -> FeatureKind {
        match self {
            FeatureValue::Boolean(_) => FeatureKind::Boolean,
            FeatureValue::Numerical(_) => FeatureKind::Numerical,
        }
    }

    /// `false` for Booleans, `0` for numericals.
    pub fn is_zero(self) -> bool {
        self.as_i64() == 0
    }

    pub fn as_i64(self) -> i64 {
        match self {
            FeatureValue::Boolean(b) => i64::from(b),
            FeatureValue::Numerical(n) => n,
        }
    }
}

/// Ordered, deduplicated collection of features.
///
/// Insertion order defines the [`FeatureId`] of each feature and is never
/// changed afterwards. Inserting a feature whose `repr` is already present
/// returns the existing id and keeps the lower complexity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeaturePool {
    features: IndexMap<String, Feature>,
}

impl FeaturePool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, feature: Feature) -> FeatureId {
        match self.features.entry(feature.repr.clone()) {
            Entry::Occupied(mut entry) => {
                let existing = entry.get_mut();
                existing.complexity = existing.complexity.min(feature.complexity);
                entry.index()
            }
            Entry::Vacant(entry) => {
                let id = entry.index();
                entry.insert(feature);
                id
            }
        }
    }

    pub fn get(&self, id: FeatureId) -> Option<&Feature> {
        self.features.get_index(id).map(|(_, feature)| feature)
    }

    pub fn id_of(&self, repr: &str) -> Option<FeatureId> {
        self.features.get_index_of(repr)
    }

    pub fn kind_of(&self, id: FeatureId) -> Option<FeatureKind> {
        self.get(id).map(|feature| feature.kind)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn ids(&self) -> std::ops::Range<FeatureId> {
        0..self.features.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FeatureId, &Feature)> {
        self.features.values().enumerate()
    }
}

impl FromIterator<Feature> for FeaturePool {
    fn from_iter<I: IntoIterator<Item = Feature>>(iter: I) -> Self {
        let mut pool = FeaturePool::new();
        for feature in iter {
            pool.insert(feature);
        }
        pool
    }
}
