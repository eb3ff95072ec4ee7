//! Property-based test generators using proptest.
//!
//! Reference values are never generated: a reference is only meaningful
//! against a concrete heap, so tests allocate those themselves.

use preinit_core::{ArrayElement, FieldKind, FieldValue, PrimitiveType};
use proptest::prelude::*;

/// Strategy for the six non-reference field kinds.
pub fn primitive_kind_strategy() -> impl Strategy<Value = FieldKind> {
    prop::sample::select(
        FieldKind::ALL
            .iter()
            .copied()
            .filter(|kind| *kind != FieldKind::Reference)
            .collect::<Vec<_>>(),
    )
}

/// Strategy for values of `kind`. References are always null.
pub fn field_value_strategy(kind: FieldKind) -> BoxedStrategy<FieldValue> {
    match kind {
        FieldKind::Boolean => (0u8..=1).prop_map(FieldValue::Boolean).boxed(),
        FieldKind::Byte => any::<i8>().prop_map(FieldValue::Byte).boxed(),
        FieldKind::Char => any::<u16>().prop_map(FieldValue::Char).boxed(),
        FieldKind::Short => any::<i16>().prop_map(FieldValue::Short).boxed(),
        FieldKind::Bits32 => any::<u32>().prop_map(FieldValue::Bits32).boxed(),
        FieldKind::Bits64 => any::<u64>().prop_map(FieldValue::Bits64).boxed(),
        FieldKind::Reference => Just(FieldValue::Reference(None)).boxed(),
    }
}

/// Strategy for the eight primitive array component types.
pub fn array_component_strategy() -> impl Strategy<Value = PrimitiveType> {
    prop::sample::select(PrimitiveType::ARRAY_COMPONENTS.to_vec())
}

/// Strategy for elements of a `component` array.
///
/// Floating-point elements are never NaN so generated values compare equal
/// to themselves.
///
/// # Panics
///
/// Panics if `component` is not a primitive array component type.
pub fn array_element_strategy(component: PrimitiveType) -> BoxedStrategy<ArrayElement> {
    match component {
        PrimitiveType::Boolean => (0u8..=1).prop_map(ArrayElement::Boolean).boxed(),
        PrimitiveType::Byte => any::<i8>().prop_map(ArrayElement::Byte).boxed(),
        PrimitiveType::Char => any::<u16>().prop_map(ArrayElement::Char).boxed(),
        PrimitiveType::Short => any::<i16>().prop_map(ArrayElement::Short).boxed(),
        PrimitiveType::Int => any::<i32>().prop_map(ArrayElement::Int).boxed(),
        PrimitiveType::Long => any::<i64>().prop_map(ArrayElement::Long).boxed(),
        PrimitiveType::Float => (prop::num::f32::NORMAL
            | prop::num::f32::SUBNORMAL
            | prop::num::f32::ZERO
            | prop::num::f32::INFINITE)
            .prop_map(ArrayElement::Float)
            .boxed(),
        PrimitiveType::Double => (prop::num::f64::NORMAL
            | prop::num::f64::SUBNORMAL
            | prop::num::f64::ZERO
            | prop::num::f64::INFINITE)
            .prop_map(ArrayElement::Double)
            .boxed(),
        PrimitiveType::Not | PrimitiveType::Void => {
            panic!("{component} is not a primitive array component")
        }
    }
}

/// Strategy for a sequence of writes to a fixed set of field slots.
///
/// Each item is `(slot index, value)` where the value has the slot's kind.
pub fn field_writes_strategy(
    slots: Vec<FieldKind>,
    max_writes: usize,
) -> impl Strategy<Value = Vec<(usize, FieldValue)>> {
    assert!(!slots.is_empty(), "at least one slot is required");
    let write = (0..slots.len()).prop_flat_map(move |slot| {
        field_value_strategy(slots[slot]).prop_map(move |value| (slot, value))
    });
    prop::collection::vec(write, 0..=max_writes)
}

/// Strategy for a sequence of writes to a `length`-element array.
pub fn element_writes_strategy(
    component: PrimitiveType,
    length: usize,
    max_writes: usize,
) -> impl Strategy<Value = Vec<(usize, ArrayElement)>> {
    assert!(length > 0, "array must not be empty");
    prop::collection::vec(
        (0..length, array_element_strategy(component)),
        0..=max_writes,
    )
}
