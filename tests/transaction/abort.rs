//! Abort Tests
//!
//! Abort is idempotent, keeps the first message, and the rethrown error
//! carries the managed abort descriptor.

use crate::*;
use preinit_core::ABORT_ERROR_DESCRIPTOR;

#[test]
fn test_first_abort_message_wins() {
    let fx = Fixture::new();
    let txn = fx.begin(false);

    txn.abort("a");
    txn.abort("b");
    txn.abort("a");

    assert!(txn.is_aborted());
    assert_eq!(txn.abort_message(), "a");
}

#[test]
fn test_rethrow_carries_stored_message() {
    let fx = Fixture::new();
    fx.begin(false);

    fx.runtime
        .abort_transaction_and_throw_abort_error("unsupported native call");
    let rethrown = fx.runtime.throw_transaction_abort_error();

    assert_eq!(
        rethrown,
        Error::TransactionAborted {
            message: "unsupported native call".to_string()
        }
    );
    assert_eq!(
        rethrown.to_string(),
        format!("{ABORT_ERROR_DESCRIPTOR}: unsupported native call")
    );
}

#[test]
fn test_caught_abort_rethrows_original_reason() {
    let fx = Fixture::new();
    fx.begin(false);

    fx.runtime.abort_transaction_and_throw_abort_error("first failure");
    // The initializer caught the error and failed again for another reason.
    let second = fx
        .runtime
        .abort_transaction_and_throw_abort_error("second failure");

    assert_eq!(second.abort_message(), "second failure");
    assert_eq!(
        fx.runtime.throw_transaction_abort_error().abort_message(),
        "first failure"
    );
}

#[test]
fn test_aborted_transaction_still_records_and_rolls_back() {
    let mut fx = Fixture::new();
    let obj = fx.instance();

    let txn = fx.begin(false);
    txn.abort("stop");
    fx.set(obj, FIELD, FieldValue::Byte(9));
    assert!(fx.runtime.is_transaction_aborted());
    fx.rollback();

    assert_eq!(fx.get(obj, FIELD, FieldKind::Byte), FieldValue::Byte(0));
    assert!(!fx.runtime.is_transaction_aborted());
}

#[test]
fn test_not_aborted_without_transaction() {
    let fx = Fixture::new();
    assert!(!fx.runtime.is_transaction_aborted());
}

#[test]
#[cfg(debug_assertions)]
#[should_panic(expected = "while transaction is not aborted")]
fn test_rethrow_before_abort_is_fatal() {
    let fx = Fixture::new();
    fx.begin(false);
    fx.runtime.throw_transaction_abort_error();
}
