//! Rollback Tests
//!
//! Field restoration, first-write-wins capture, header fields, object array
//! elements and string-cache resolutions.

use crate::*;
use preinit_core::CLASS_OFFSET;

// =============================================================================
// FIELD RESTORATION
// =============================================================================

#[test]
fn test_rollback_restores_every_field_kind() {
    let mut fx = Fixture::new();
    let obj = fx.instance();
    let target = fx.heap.alloc_string("before");

    let originals = [
        FieldValue::Boolean(1),
        FieldValue::Byte(-128),
        FieldValue::Char(0xffff),
        FieldValue::Short(i16::MIN),
        FieldValue::Bits32(0x8000_0001),
        FieldValue::Bits64(0x0123_4567_89ab_cdef),
        FieldValue::Reference(Some(target)),
    ];
    for (i, value) in originals.iter().enumerate() {
        let offset = MemberOffset::new(16 + 8 * i as u32);
        fx.heap.store_field(obj, offset, *value, false);
    }

    fx.begin(false);
    for (i, value) in originals.iter().enumerate() {
        let offset = MemberOffset::new(16 + 8 * i as u32);
        fx.set(obj, offset, FieldValue::from_raw(value.kind(), 0x5a5a));
    }
    fx.rollback();

    for (i, value) in originals.iter().enumerate() {
        let offset = MemberOffset::new(16 + 8 * i as u32);
        assert_eq!(fx.get(obj, offset, value.kind()), *value);
    }
}

#[test]
fn test_first_write_wins() {
    let mut fx = Fixture::new();
    let obj = fx.instance();
    fx.heap.store_field(obj, FIELD, FieldValue::Bits32(5), false);

    let txn = fx.begin(false);
    fx.set(obj, FIELD, FieldValue::Bits32(6));
    fx.set(obj, FIELD, FieldValue::Bits32(7));
    fx.set(obj, FIELD, FieldValue::Bits32(8));

    assert_eq!(txn.logged_field(obj, FIELD), Some(FieldValue::Bits32(5)));
    assert_eq!(txn.stats().field_values_count, 1);

    fx.rollback();
    assert_eq!(fx.get(obj, FIELD, FieldKind::Bits32), FieldValue::Bits32(5));
}

#[test]
fn test_rollback_restores_static_fields_of_root() {
    let mut fx = Fixture::new();
    let root = fx.root;
    let offset = MemberOffset::new(64);

    fx.begin(true);
    fx.runtime
        .transaction_write_constraint(&fx.heap, root)
        .unwrap();
    fx.set(root, offset, FieldValue::Bits64(42));
    fx.rollback();

    assert_eq!(fx.get(root, offset, FieldKind::Bits64), FieldValue::Bits64(0));
}

#[test]
fn test_volatile_field_restored_with_volatile_store() {
    let mut fx = Fixture::new();
    let obj = fx.instance();

    fx.begin(false);
    fx.runtime
        .set_field(&mut fx.heap, obj, FIELD, FieldValue::Bits32(1), true);
    let before = fx.heap.volatile_stores();
    fx.rollback();

    assert_eq!(fx.heap.volatile_stores(), before + 1);
    assert_eq!(fx.get(obj, FIELD, FieldKind::Bits32), FieldValue::Bits32(0));
}

#[test]
fn test_exit_keeps_changes() {
    let mut fx = Fixture::new();
    let obj = fx.instance();

    fx.begin(false);
    fx.set(obj, FIELD, FieldValue::Short(-2));
    fx.runtime.exit_transaction_mode();

    assert_eq!(fx.get(obj, FIELD, FieldKind::Short), FieldValue::Short(-2));
}

#[test]
fn test_rollback_clears_logs() {
    let mut fx = Fixture::new();
    let obj = fx.instance();

    let txn = fx.begin(false);
    fx.set(obj, FIELD, FieldValue::Byte(3));
    assert!(!txn.stats().is_empty());
    fx.rollback();

    assert!(txn.stats().is_empty());
    assert!(!txn.is_rolling_back());
}

// =============================================================================
// HEADER FIELDS
// =============================================================================

#[test]
fn test_class_field_survives_rollback() {
    let mut fx = Fixture::new();
    let obj = fx.instance();
    let other = fx.heap.alloc_class("LOther;");

    let txn = fx.begin(false);
    txn.record_write_field_reference(obj, CLASS_OFFSET, Some(other), false);
    fx.rollback();

    assert_eq!(fx.heap.class_of(obj), fx.root);
}

#[test]
fn test_array_length_survives_rollback() {
    let mut fx = Fixture::new();
    let array = fx.heap.alloc_primitive_array(PrimitiveType::Long, 3);
    let length_offset = fx.heap.array_length_offset();

    let txn = fx.begin(false);
    txn.record_write_field_32(array, length_offset, 0, false);
    fx.rollback();

    assert_eq!(fx.heap.array_length(array), 3);
}

// =============================================================================
// OBJECT ARRAYS
// =============================================================================

#[test]
fn test_object_array_elements_roll_back_as_fields() {
    let mut fx = Fixture::new();
    let root = fx.root;
    let array = fx.heap.alloc_object_array(root, 4);
    let kept = fx.heap.alloc_string("kept");
    let replacement = fx.heap.alloc_string("replacement");
    let slot = SimHeap::element_offset(2);
    fx.heap
        .store_field(array, slot, FieldValue::Reference(Some(kept)), false);

    let txn = fx.begin(false);
    fx.set(array, slot, FieldValue::Reference(Some(replacement)));
    fx.set(
        array,
        SimHeap::element_offset(0),
        FieldValue::Reference(Some(replacement)),
    );
    assert_eq!(txn.stats().array_count, 0);
    assert_eq!(txn.stats().objects_count, 1);
    fx.rollback();

    assert_eq!(
        fx.get(array, slot, FieldKind::Reference),
        FieldValue::Reference(Some(kept))
    );
    assert_eq!(
        fx.get(array, SimHeap::element_offset(0), FieldKind::Reference),
        FieldValue::Reference(None)
    );
}

// =============================================================================
// STRING RESOLUTION
// =============================================================================

#[test]
fn test_resolved_strings_are_cleared() {
    let mut fx = Fixture::new();
    let cache = fx.heap.alloc_string_cache(4);
    let early = fx.heap.alloc_string("early");
    let late = fx.heap.alloc_string("late");
    fx.heap
        .set_resolved_string(cache, StringIndex::new(0), early);

    let txn = fx.begin(false);
    fx.runtime
        .resolve_string(&mut fx.heap, cache, StringIndex::new(3), late);
    assert_eq!(txn.stats().resolve_string_count, 1);
    fx.rollback();

    assert_eq!(fx.heap.resolved_string(cache, StringIndex::new(3)), None);
    assert_eq!(
        fx.heap.resolved_string(cache, StringIndex::new(0)),
        Some(early)
    );
}
