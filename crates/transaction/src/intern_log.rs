//! Interned-string table undo log
//!
//! Each entry records one membership change of the intern table. Undo
//! applies the inverse operation on the same strength: an insertion is
//! undone by a removal and vice versa. Entries only make sense when undone
//! newest first, which the owning transaction guarantees.

use preinit_core::{InternTable, ObjectRef, RootInfo, RootVisitor};

/// Which membership set of the intern table was touched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StringKind {
    /// Strongly interned
    Strong,
    /// Weakly interned
    Weak,
}

/// What happened to the string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StringOp {
    /// Added to the table
    Insert,
    /// Removed from the table
    Remove,
}

/// One logged intern table operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternStringLog {
    string: ObjectRef,
    kind: StringKind,
    op: StringOp,
}

impl InternStringLog {
    /// Create an entry
    pub fn new(string: ObjectRef, kind: StringKind, op: StringOp) -> Self {
        Self { string, kind, op }
    }

    /// Logged string
    pub fn string(&self) -> ObjectRef {
        self.string
    }

    /// Logged membership set
    pub fn kind(&self) -> StringKind {
        self.kind
    }

    /// Logged operation
    pub fn op(&self) -> StringOp {
        self.op
    }

    /// Apply the inverse operation to `table`
    pub fn undo<T: InternTable + ?Sized>(&self, table: &mut T) {
        match (self.op, self.kind) {
            (StringOp::Insert, StringKind::Strong) => table.remove_strong(self.string),
            (StringOp::Insert, StringKind::Weak) => table.remove_weak(self.string),
            (StringOp::Remove, StringKind::Strong) => table.insert_strong(self.string),
            (StringOp::Remove, StringKind::Weak) => table.insert_weak(self.string),
        }
    }

    /// Report the logged string to the collector
    pub fn visit_roots(&mut self, visitor: &mut dyn RootVisitor) {
        visitor.visit_root(&mut self.string, RootInfo::InternedString);
    }
}
