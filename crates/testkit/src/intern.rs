//! Simulated intern table

use preinit_core::{InternTable, ObjectRef};
use rustc_hash::FxHashSet;

/// Intern table with separate strong and weak membership sets
///
/// Operations are raw: nothing here talks to a transaction.
#[derive(Debug, Clone, Default)]
pub struct SimInternTable {
    strong: FxHashSet<ObjectRef>,
    weak: FxHashSet<ObjectRef>,
}

impl SimInternTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `string` is strongly interned
    pub fn contains_strong(&self, string: ObjectRef) -> bool {
        self.strong.contains(&string)
    }

    /// Whether `string` is weakly interned
    pub fn contains_weak(&self, string: ObjectRef) -> bool {
        self.weak.contains(&string)
    }

    /// Total membership across both sets
    pub fn len(&self) -> usize {
        self.strong.len() + self.weak.len()
    }

    /// Whether both sets are empty
    pub fn is_empty(&self) -> bool {
        self.strong.is_empty() && self.weak.is_empty()
    }

    /// Follow a moved string
    pub fn relocate(&mut self, old: ObjectRef, new: ObjectRef) {
        if self.strong.remove(&old) {
            self.strong.insert(new);
        }
        if self.weak.remove(&old) {
            self.weak.insert(new);
        }
    }
}

impl InternTable for SimInternTable {
    fn insert_strong(&mut self, string: ObjectRef) {
        self.strong.insert(string);
    }

    fn insert_weak(&mut self, string: ObjectRef) {
        self.weak.insert(string);
    }

    fn remove_strong(&mut self, string: ObjectRef) {
        self.strong.remove(&string);
    }

    fn remove_weak(&mut self, string: ObjectRef) {
        self.weak.remove(&string);
    }
}
