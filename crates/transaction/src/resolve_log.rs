//! String-constant cache undo log

use preinit_core::{ObjectRef, RootInfo, RootVisitor, StringCache, StringIndex};

/// A slot of a string-constant cache that was resolved during the transaction
///
/// Undo clears the slot back to unresolved, so duplicate entries for the same
/// slot are harmless and entries may be undone in any order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveStringLog {
    cache: ObjectRef,
    index: StringIndex,
}

impl ResolveStringLog {
    /// Create an entry
    pub fn new(cache: ObjectRef, index: StringIndex) -> Self {
        Self { cache, index }
    }

    /// Logged cache
    pub fn cache(&self) -> ObjectRef {
        self.cache
    }

    /// Logged slot
    pub fn index(&self) -> StringIndex {
        self.index
    }

    /// Clear the logged slot
    pub fn undo<C: StringCache + ?Sized>(&self, caches: &mut C) {
        caches.clear_string(self.cache, self.index);
    }

    /// Report the cache to the collector
    pub fn visit_roots(&mut self, visitor: &mut dyn RootVisitor) {
        visitor.visit_root(&mut self.cache, RootInfo::VmInternal);
    }
}
