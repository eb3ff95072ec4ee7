//! Per-array undo log
//!
//! Captures pre-write bit patterns of primitive array elements. Element
//! types are not stored: an array's component type cannot change, so undo
//! reads it once from the array's class.

use preinit_core::{ArrayElement, ObjectModel, ObjectRef, PrimitiveType};
use std::collections::BTreeMap;

/// Captured element values of a single primitive array
#[derive(Debug, Clone, Default)]
pub struct ArrayLog {
    array_values: BTreeMap<usize, u64>,
}

impl ArrayLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture `value` for `index` unless the index was already captured
    ///
    /// Returns `true` if a new entry was created.
    pub fn log_value(&mut self, index: usize, value: u64) -> bool {
        match self.array_values.entry(index) {
            std::collections::btree_map::Entry::Occupied(_) => false,
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(value);
                true
            }
        }
    }

    /// Captured raw value for `index`
    pub fn get(&self, index: usize) -> Option<u64> {
        self.array_values.get(&index).copied()
    }

    /// Number of captured elements
    pub fn len(&self) -> usize {
        self.array_values.len()
    }

    /// Whether nothing was captured
    pub fn is_empty(&self) -> bool {
        self.array_values.is_empty()
    }

    /// Restore every captured element of `array`
    ///
    /// # Panics
    ///
    /// Panics if `array` is an object array. Object array stores are logged
    /// as object field writes and must never reach an array log.
    pub fn undo<H: ObjectModel + ?Sized>(&self, array: ObjectRef, heap: &mut H) {
        debug_assert!(heap.is_array(array), "{array} is not an array");
        let component = heap.component_type(array);
        for (&index, &raw) in &self.array_values {
            heap.store_element(array, index, decode_element(component, raw));
        }
    }
}

fn decode_element(component: PrimitiveType, raw: u64) -> ArrayElement {
    match ArrayElement::from_raw(component, raw) {
        Some(element) => element,
        None if component == PrimitiveType::Not => {
            panic!("object array should be logged as an object")
        }
        None => panic!("unsupported array component type {component}"),
    }
}
