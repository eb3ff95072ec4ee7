//! No-New-Records Guard Tests

use crate::*;

#[test]
fn test_constraints_allowed_under_guard() {
    let mut fx = Fixture::new();
    let obj = fx.instance();
    let txn = fx.begin(true);

    let _guard = NoNewRecordsGuard::new(&fx.runtime, "image writer walk");
    assert!(txn.write_constraint(&fx.heap, obj).is_ok());
    assert!(txn.read_constraint(&fx.heap, fx.root).is_ok());
    assert!(txn.stats().is_empty());
}

#[test]
fn test_root_scan_allowed_under_guard() {
    let mut fx = Fixture::new();
    let obj = fx.instance();
    fx.begin(false);
    fx.set(obj, FIELD, FieldValue::Bits32(1));

    let mut relocator = Relocator::new();
    {
        let _guard = NoNewRecordsGuard::new(&fx.runtime, "root scan");
        fx.runtime.visit_roots(&mut relocator);
    }
    assert_eq!(relocator.visited(), 2);
}

#[test]
fn test_recording_resumes_after_guard() {
    let mut fx = Fixture::new();
    let obj = fx.instance();
    let txn = fx.begin(false);

    drop(NoNewRecordsGuard::new(&fx.runtime, "short walk"));
    fx.set(obj, FIELD, FieldValue::Bits32(1));

    assert_eq!(txn.stats().field_values_count, 1);
}

#[test]
#[cfg(debug_assertions)]
#[should_panic(expected = "new transaction record while forbidden: image writer walk")]
fn test_recording_store_under_guard_is_fatal() {
    let mut fx = Fixture::new();
    let obj = fx.instance();
    fx.begin(false);

    let runtime = &fx.runtime;
    let _guard = NoNewRecordsGuard::new(runtime, "image writer walk");
    runtime.set_field(&mut fx.heap, obj, FIELD, FieldValue::Bits32(1), false);
}

#[test]
#[cfg(debug_assertions)]
#[should_panic(expected = "active transaction changed while records were forbidden")]
fn test_exiting_under_guard_is_fatal() {
    let fx = Fixture::new();
    fx.begin(false);

    let _guard = NoNewRecordsGuard::new(&fx.runtime, "walk");
    fx.runtime.exit_transaction_mode();
}
