//! Deduplicating table of equivalence classes.

use indexmap::IndexSet;

use crate::signature::Signature;

/// Dense id of an equivalence class, valid for one outer iteration.
pub type ClassId = usize;

/// Append-only mapping between class signatures and dense ids.
///
/// Ids follow first-insertion order, so building the same state pairs in the
/// same order always yields the same ids. [`ClassTable::get_or_insert`] is
/// the only way to add a class.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassTable {
    classes: IndexSet<Signature>,
}

impl ClassTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_insert(&mut self, key: Signature) -> ClassId {
        self.classes.insert_full(key).0
    }

    pub fn get(&self, id: ClassId) -> Option<&Signature> {
        self.classes.get_index(id)
    }

    pub fn id_of(&self, signature: &Signature) -> Option<ClassId> {
        self.classes.get_index_of(signature)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn ids(&self) -> std::ops::Range<ClassId> {
        0..self.classes.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ClassId, &Signature)> {
        self.classes.iter().enumerate()
    }
}
