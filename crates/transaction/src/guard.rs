//! Scoped assertion that no new transaction records are made
//!
//! Some runtime paths must not touch transactional state at all, for
//! example while the collector or the image writer walks the heap. Wrapping
//! them in a [`NoNewRecordsGuard`] turns any stray `record_*` call into an
//! immediate assertion failure in debug builds.
//!
//! ```ignore
//! {
//!     let _guard = NoNewRecordsGuard::new(&runtime, "visiting class roots");
//!     // any record_* call on the active transaction panics here
//! }
//! // guard removed, recording allowed again
//! ```

use crate::runtime::TransactionRuntime;
use crate::transaction::Transaction;
use std::sync::Arc;

/// RAII guard forbidding new records on the active transaction
///
/// Inert in release builds and when no transaction is active.
#[must_use = "the assertion is removed as soon as the guard is dropped"]
pub struct NoNewRecordsGuard<'a> {
    runtime: &'a TransactionRuntime,
    transaction: Option<Arc<Transaction>>,
}

impl<'a> NoNewRecordsGuard<'a> {
    /// Install the assertion with the given reason
    ///
    /// # Panics
    ///
    /// Panics in debug builds if another guard is already installed.
    pub fn new(runtime: &'a TransactionRuntime, reason: &'static str) -> Self {
        let transaction = if cfg!(debug_assertions) {
            runtime.active_transaction()
        } else {
            None
        };
        if let Some(transaction) = &transaction {
            transaction.install_no_new_records(reason);
        }
        NoNewRecordsGuard {
            runtime,
            transaction,
        }
    }

    /// Reason installed on the guarded transaction, if the guard is armed
    pub fn reason(&self) -> Option<&'static str> {
        self.transaction
            .as_ref()
            .and_then(|transaction| transaction.no_new_records_reason())
    }
}

impl Drop for NoNewRecordsGuard<'_> {
    fn drop(&mut self) {
        let Some(transaction) = self.transaction.take() else {
            return;
        };
        let still_active = self
            .runtime
            .active_transaction()
            .is_some_and(|active| Arc::ptr_eq(&active, &transaction));
        if !std::thread::panicking() {
            assert!(
                still_active,
                "active transaction changed while records were forbidden"
            );
        }
        transaction.remove_no_new_records();
    }
}
