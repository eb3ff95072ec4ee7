//! Root visitor that applies a forwarding table
//!
//! Stands in for the reference-updating phase of a moving collector: every
//! visited root whose address has a forwarding entry is rewritten in place.
//! Forwarding is applied once per visit, never chained, so swapping two
//! addresses is expressible.

use preinit_core::{ObjectRef, RootInfo, RootVisitor};
use rustc_hash::FxHashMap;

/// Forwarding root visitor
#[derive(Debug, Clone, Default)]
pub struct Relocator {
    forwarding: FxHashMap<ObjectRef, ObjectRef>,
    visited: usize,
    forwarded: usize,
}

impl Relocator {
    /// Create a relocator with an empty forwarding table
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a relocator from `(old, new)` pairs
    pub fn from_moves(moves: impl IntoIterator<Item = (ObjectRef, ObjectRef)>) -> Self {
        let mut relocator = Self::new();
        for (old, new) in moves {
            relocator.forward(old, new);
        }
        relocator
    }

    /// Forward `old` to `new`
    pub fn forward(&mut self, old: ObjectRef, new: ObjectRef) {
        self.forwarding.insert(old, new);
    }

    /// Number of roots seen
    pub fn visited(&self) -> usize {
        self.visited
    }

    /// Number of roots rewritten
    pub fn forwarded(&self) -> usize {
        self.forwarded
    }
}

impl RootVisitor for Relocator {
    fn visit_root(&mut self, root: &mut ObjectRef, _info: RootInfo) {
        self.visited += 1;
        if let Some(&new) = self.forwarding.get(root) {
            *root = new;
            self.forwarded += 1;
        }
    }
}
