//! Policy Tests
//!
//! Write, value and read constraints across strict and non-strict
//! transactions, with and without a published base image.

use crate::*;

struct PolicyFixture {
    fx: Fixture,
    other_class: ObjectRef,
    other_instance: ObjectRef,
    root_instance: ObjectRef,
}

/// Root class plus an unrelated class and instances of both
fn setup(publish_base_image: bool) -> PolicyFixture {
    let mut fx = Fixture::new();
    let other_class = fx.heap.alloc_class("LOther;");
    let other_instance = fx.heap.alloc_instance(other_class);
    let root_instance = fx.instance();
    if publish_base_image {
        fx.heap.publish_base_image();
    }
    PolicyFixture {
        fx,
        other_class,
        other_instance,
        root_instance,
    }
}

// =============================================================================
// WRITE CONSTRAINT
// =============================================================================

#[test]
fn test_non_strict_writes_anything_outside_base_image() {
    let p = setup(false);
    let txn = p.fx.begin(false);

    for obj in [p.fx.root, p.other_class, p.other_instance, p.root_instance] {
        assert!(txn.write_constraint(&p.fx.heap, obj).is_ok(), "write to {obj}");
    }
}

#[test]
fn test_strict_rejects_foreign_class_writes() {
    let p = setup(false);
    let txn = p.fx.begin(true);

    let err = txn.write_constraint(&p.fx.heap, p.other_class).unwrap_err();
    assert!(err.is_constraint_violation());
    assert_eq!(
        err,
        Error::ConstraintViolation(Violation::ForeignClassWrite {
            class: p.other_class,
            root: p.fx.root,
        })
    );
    assert!(!txn.is_aborted());
}

#[test]
fn test_strict_allows_root_and_instances() {
    let p = setup(false);
    let txn = p.fx.begin(true);

    assert!(txn.write_constraint(&p.fx.heap, p.fx.root).is_ok());
    assert!(txn.write_constraint(&p.fx.heap, p.other_instance).is_ok());
    assert!(txn.write_constraint(&p.fx.heap, p.root_instance).is_ok());
}

#[test]
fn test_base_image_objects_are_never_writable() {
    for strict in [false, true] {
        let mut p = setup(true);
        let fresh = p.fx.heap.alloc_instance(p.other_class);
        let txn = p.fx.begin(strict);

        for obj in [p.fx.root, p.other_instance, p.root_instance] {
            let err = txn.write_constraint(&p.fx.heap, obj).unwrap_err();
            assert_eq!(
                err,
                Error::ConstraintViolation(Violation::BaseImageWrite { object: obj })
            );
        }
        assert!(txn.write_constraint(&p.fx.heap, fresh).is_ok());
    }
}

#[test]
fn test_violation_message_names_object() {
    let p = setup(true);
    let txn = p.fx.begin(false);

    let err = txn
        .write_constraint(&p.fx.heap, p.other_instance)
        .unwrap_err();
    let message = err.to_string();
    assert!(message.contains("base image"), "{message}");
    assert!(message.contains(&p.other_instance.to_string()), "{message}");
}

// =============================================================================
// WRITE VALUE CONSTRAINT
// =============================================================================

#[test]
fn test_null_value_always_allowed() {
    for strict in [false, true] {
        let mut p = setup(true);
        p.fx.heap.forbid_in_extension(p.other_class);
        let txn = p.fx.begin(strict);
        assert!(txn.write_value_constraint(&p.fx.heap, None).is_ok());
    }
}

#[test]
fn test_extension_rejects_forbidden_instances() {
    let mut p = setup(true);
    p.fx.heap.forbid_in_extension(p.other_class);
    let txn = p.fx.begin(false);

    let err = txn
        .write_value_constraint(&p.fx.heap, Some(p.other_instance))
        .unwrap_err();
    assert_eq!(
        err,
        Error::ConstraintViolation(Violation::ExtensionValue {
            class: p.other_class
        })
    );
    assert!(txn
        .write_value_constraint(&p.fx.heap, Some(p.root_instance))
        .is_ok());
}

#[test]
fn test_extension_checks_class_values_directly() {
    let mut p = setup(true);
    p.fx.heap.forbid_in_extension(p.other_class);
    let txn = p.fx.begin(false);

    assert!(txn
        .write_value_constraint(&p.fx.heap, Some(p.other_class))
        .is_err());
    assert!(txn
        .write_value_constraint(&p.fx.heap, Some(p.fx.root))
        .is_ok());
}

#[test]
fn test_value_constraint_inactive_without_base_image() {
    let mut p = setup(false);
    p.fx.heap.forbid_in_extension(p.other_class);
    let txn = p.fx.begin(false);

    assert!(txn
        .write_value_constraint(&p.fx.heap, Some(p.other_instance))
        .is_ok());
}

#[test]
fn test_strict_value_constraint_is_permissive() {
    let mut p = setup(true);
    p.fx.heap.forbid_in_extension(p.other_class);
    let txn = p.fx.begin(true);

    assert!(txn
        .write_value_constraint(&p.fx.heap, Some(p.other_instance))
        .is_ok());
}

// =============================================================================
// READ CONSTRAINT
// =============================================================================

#[test]
fn test_strict_reads_only_root_statics() {
    let p = setup(false);
    let txn = p.fx.begin(true);

    assert!(txn.read_constraint(&p.fx.heap, p.fx.root).is_ok());
    let err = txn.read_constraint(&p.fx.heap, p.other_class).unwrap_err();
    assert_eq!(
        err,
        Error::ConstraintViolation(Violation::ForeignClassRead {
            class: p.other_class,
            root: p.fx.root,
        })
    );
}

#[test]
fn test_non_strict_reads_anything() {
    for publish in [false, true] {
        let p = setup(publish);
        let txn = p.fx.begin(false);
        assert!(txn.read_constraint(&p.fx.heap, p.other_class).is_ok());
        assert!(txn.read_constraint(&p.fx.heap, p.fx.root).is_ok());
    }
}

// =============================================================================
// RUNTIME FORWARDING
// =============================================================================

#[test]
fn test_runtime_without_transaction_allows_everything() {
    let mut p = setup(true);
    p.fx.heap.forbid_in_extension(p.other_class);
    let runtime = &p.fx.runtime;

    assert!(runtime
        .transaction_write_constraint(&p.fx.heap, p.fx.root)
        .is_ok());
    assert!(runtime
        .transaction_write_value_constraint(&p.fx.heap, Some(p.other_instance))
        .is_ok());
    assert!(runtime
        .transaction_read_constraint(&p.fx.heap, p.other_class)
        .is_ok());
}

#[test]
fn test_violation_can_abort_transaction() {
    let p = setup(false);
    p.fx.begin(true);

    let violation = p
        .fx
        .runtime
        .transaction_read_constraint(&p.fx.heap, p.other_class)
        .unwrap_err();
    let thrown = p
        .fx
        .runtime
        .abort_transaction_and_throw_abort_error(&violation.abort_message());

    assert!(thrown.is_aborted());
    assert!(p.fx.runtime.is_transaction_aborted());
    assert!(thrown.abort_message().contains("read static fields"));
}
