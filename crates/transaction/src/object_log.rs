//! Per-object undo log
//!
//! An [`ObjectLog`] remembers, for every field offset written during the
//! transaction, the value the field held before the first write. Later
//! writes to the same offset are ignored so the log always holds the
//! pre-transaction value.

use preinit_core::{FieldValue, MemberOffset, ObjectModel, ObjectRef, RootInfo, RootVisitor};
use std::collections::BTreeMap;

/// One captured field value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueLogEntry {
    value: FieldValue,
    is_volatile: bool,
}

impl ValueLogEntry {
    /// Create an entry
    pub fn new(value: FieldValue, is_volatile: bool) -> Self {
        Self { value, is_volatile }
    }

    /// Captured value
    pub fn value(&self) -> FieldValue {
        self.value
    }

    /// Whether the field was written with volatile semantics
    pub fn is_volatile(&self) -> bool {
        self.is_volatile
    }
}

/// Captured field values of a single object
#[derive(Debug, Clone, Default)]
pub struct ObjectLog {
    field_values: BTreeMap<u32, ValueLogEntry>,
}

impl ObjectLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture `value` for `offset` unless the offset was already captured
    ///
    /// Returns `true` if a new entry was created.
    pub fn log_value(
        &mut self,
        offset: MemberOffset,
        value: FieldValue,
        is_volatile: bool,
    ) -> bool {
        match self.field_values.entry(offset.value()) {
            std::collections::btree_map::Entry::Occupied(_) => false,
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(ValueLogEntry::new(value, is_volatile));
                true
            }
        }
    }

    /// Captured entry for `offset`
    pub fn get(&self, offset: MemberOffset) -> Option<&ValueLogEntry> {
        self.field_values.get(&offset.value())
    }

    /// Number of captured fields
    pub fn len(&self) -> usize {
        self.field_values.len()
    }

    /// Whether nothing was captured
    pub fn is_empty(&self) -> bool {
        self.field_values.is_empty()
    }

    /// Restore every captured field of `obj`
    ///
    /// The class-identity field and, for arrays, the length field are never
    /// restored: the collector reads both while the heap is being unwound.
    pub fn undo<H: ObjectModel + ?Sized>(&self, obj: ObjectRef, heap: &mut H) {
        let class_offset = heap.class_offset();
        let length_offset = heap.is_array(obj).then(|| heap.array_length_offset());

        for (&offset, entry) in &self.field_values {
            let offset = MemberOffset::new(offset);
            if offset == class_offset {
                continue;
            }
            if Some(offset) == length_offset {
                continue;
            }
            heap.store_field(obj, offset, entry.value, entry.is_volatile);
        }
    }

    /// Report captured references to the collector
    pub fn visit_roots(&mut self, visitor: &mut dyn RootVisitor) {
        for entry in self.field_values.values_mut() {
            if let FieldValue::Reference(reference) = &mut entry.value {
                visitor.visit_root_if_non_null(reference, RootInfo::Unknown);
            }
        }
    }
}
