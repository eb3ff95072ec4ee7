//! Concurrent Recording Tests
//!
//! Worker threads share the active transaction through its `Arc`. Every
//! record is serialized by the log lock, so concurrent first writes to the
//! same location still leave exactly one entry holding the original value.

use crate::*;
use std::thread;

const THREADS: usize = 8;
const RECORDS_PER_THREAD: usize = 1000;
const OFFSETS: usize = 50;

fn offset(slot: usize) -> MemberOffset {
    MemberOffset::new(16 + 4 * slot as u32)
}

fn original(slot: usize) -> u32 {
    0x1000 + slot as u32
}

#[test]
fn test_concurrent_field_records_keep_one_entry_per_offset() {
    let mut fx = Fixture::new();
    let obj = fx.instance();
    for slot in 0..OFFSETS {
        fx.heap
            .store_field(obj, offset(slot), FieldValue::Bits32(original(slot)), false);
    }

    let txn = fx.begin(false);
    thread::scope(|s| {
        for worker in 0..THREADS {
            let txn = &txn;
            let heap = &fx.heap;
            s.spawn(move || {
                for i in 0..RECORDS_PER_THREAD {
                    let slot = (worker + i) % OFFSETS;
                    let previous = heap.load_field(obj, offset(slot), FieldKind::Bits32, false);
                    match previous {
                        FieldValue::Bits32(value) => {
                            txn.record_write_field_32(obj, offset(slot), value, false)
                        }
                        other => panic!("unexpected field value {other:?}"),
                    }
                }
            });
        }
    });

    let stats = txn.stats();
    assert_eq!(stats.objects_count, 1);
    assert_eq!(stats.field_values_count, OFFSETS);
    for slot in 0..OFFSETS {
        assert_eq!(
            txn.logged_field(obj, offset(slot)),
            Some(FieldValue::Bits32(original(slot)))
        );
    }

    // The stores the workers were guarding land after their records.
    for slot in 0..OFFSETS {
        fx.set(obj, offset(slot), FieldValue::Bits32(0xdead));
    }
    assert_eq!(txn.stats().field_values_count, OFFSETS);

    fx.rollback();
    for slot in 0..OFFSETS {
        assert_eq!(
            fx.get(obj, offset(slot), FieldKind::Bits32),
            FieldValue::Bits32(original(slot))
        );
    }
}

#[test]
fn test_concurrent_records_across_logs() {
    let mut fx = Fixture::new();
    let objects: Vec<ObjectRef> = (0..THREADS).map(|_| fx.instance()).collect();
    let array = fx.heap.alloc_primitive_array(PrimitiveType::Long, THREADS);
    let strings: Vec<ObjectRef> = (0..THREADS)
        .map(|i| fx.heap.alloc_string(&format!("s{i}")))
        .collect();

    let txn = fx.begin(false);
    thread::scope(|s| {
        for worker in 0..THREADS {
            let txn = &txn;
            let heap = &fx.heap;
            let obj = objects[worker];
            let string = strings[worker];
            s.spawn(move || {
                for i in 0..RECORDS_PER_THREAD {
                    txn.record_write_field_64(obj, FIELD, i as u64, false);
                    txn.record_write_array(heap, array, worker, i as u64);
                }
                txn.record_strong_string_insertion(string);
            });
        }
    });

    let stats = txn.stats();
    assert_eq!(stats.objects_count, THREADS);
    assert_eq!(stats.field_values_count, THREADS);
    assert_eq!(stats.array_count, 1);
    assert_eq!(stats.array_values_count, THREADS);
    assert_eq!(stats.intern_string_count, THREADS);
    for (worker, obj) in objects.iter().enumerate() {
        assert_eq!(txn.logged_field(*obj, FIELD), Some(FieldValue::Bits64(0)));
        assert_eq!(txn.logged_element(array, worker), Some(0));
    }
    fx.runtime.exit_transaction_mode();
}
