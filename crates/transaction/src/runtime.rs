//! The compiler runtime's transaction slot
//!
//! [`TransactionRuntime`] owns the single active transaction. It is passed
//! explicitly to every piece of code that stores into the heap, interns
//! strings or resolves string constants, so those paths can record into the
//! active transaction without a process-wide lookup.
//!
//! ## Lifecycle
//!
//! ```text
//! enter_transaction_mode(strict, root)
//!   ├── initializer succeeds ──> exit_transaction_mode()                 (commit)
//!   └── initializer fails ─────> rollback_and_exit_transaction_mode(..)  (undo)
//! ```
//!
//! The store helpers ([`set_field`](TransactionRuntime::set_field),
//! [`set_element`](TransactionRuntime::set_element), the intern and resolve
//! helpers) load the current value, record it, then perform the store. They
//! behave as plain stores when no transaction is active.

use crate::options::TransactionOptions;
use crate::transaction::Transaction;
use parking_lot::{Mutex, RwLock};
use preinit_core::{
    ArrayElement, Error, ExtensionPolicy, FieldValue, ImageSpaces, InternTable, MemberOffset,
    ObjectModel, ObjectRef, Result, RootVisitor, StringCache, StringIndex,
};
use std::sync::Arc;
use tracing::{info, warn};

/// Ownership slot for the active transaction
#[derive(Debug, Default)]
pub struct TransactionRuntime {
    transaction: RwLock<Option<Arc<Transaction>>>,
}

impl TransactionRuntime {
    /// Create a runtime with no active transaction
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Start a transaction for initializing `root`
    ///
    /// # Panics
    ///
    /// Panics if a transaction is already active.
    pub fn enter_transaction_mode(&self, strict: bool, root: ObjectRef) -> Arc<Transaction> {
        let options = TransactionOptions {
            strict,
            ..Default::default()
        };
        self.enter_transaction_mode_with(options, root)
    }

    /// Start a transaction with explicit options
    ///
    /// # Panics
    ///
    /// Panics if a transaction is already active.
    pub fn enter_transaction_mode_with(
        &self,
        options: TransactionOptions,
        root: ObjectRef,
    ) -> Arc<Transaction> {
        let mut slot = self.transaction.write();
        assert!(slot.is_none(), "nested transactions are not supported");
        let transaction = Arc::new(Transaction::with_options(options, root));
        *slot = Some(Arc::clone(&transaction));
        info!(root = %root, strict = options.strict, "entered transaction mode");
        transaction
    }

    /// Commit: drop the active transaction and its logs
    ///
    /// # Panics
    ///
    /// Panics if no transaction is active.
    pub fn exit_transaction_mode(&self) {
        let transaction = self.take_transaction();
        info!(root = %transaction.root(), "exited transaction mode");
    }

    /// Deactivate the transaction, undo its modifications, and drop it
    ///
    /// # Panics
    ///
    /// Panics if no transaction is active.
    pub fn rollback_and_exit_transaction_mode<H, T>(&self, heap: &mut H, intern_table: &Mutex<T>)
    where
        H: ObjectModel + StringCache + ?Sized,
        T: InternTable + ?Sized,
    {
        let transaction = self.take_transaction();
        transaction.rollback(self, heap, intern_table);
        info!(
            root = %transaction.root(),
            aborted = transaction.is_aborted(),
            "rolled back and exited transaction mode"
        );
    }

    fn take_transaction(&self) -> Arc<Transaction> {
        match self.transaction.write().take() {
            Some(transaction) => transaction,
            None => panic!("no active transaction"),
        }
    }

    /// Whether a transaction is active
    pub fn is_active_transaction(&self) -> bool {
        self.transaction.read().is_some()
    }

    /// The active transaction, if any
    pub fn active_transaction(&self) -> Option<Arc<Transaction>> {
        self.transaction.read().clone()
    }

    fn with_transaction<R>(&self, f: impl FnOnce(&Transaction) -> R) -> Option<R> {
        self.transaction.read().as_deref().map(f)
    }

    // ========================================================================
    // Abort
    // ========================================================================

    /// Whether the active transaction is aborted
    pub fn is_transaction_aborted(&self) -> bool {
        self.with_transaction(Transaction::is_aborted)
            .unwrap_or(false)
    }

    /// Abort the active transaction and build the error thrown into the initializer
    ///
    /// # Panics
    ///
    /// Panics if no transaction is active.
    pub fn abort_transaction_and_throw_abort_error(&self, message: &str) -> Error {
        let transaction = match self.active_transaction() {
            Some(transaction) => transaction,
            None => panic!("abort without an active transaction"),
        };
        warn!(reason = message, "aborting transaction");
        transaction.abort(message);
        transaction.throw_abort_error(Some(message))
    }

    /// Rethrow the stored abort message of the active transaction
    ///
    /// # Panics
    ///
    /// Panics if no transaction is active.
    pub fn throw_transaction_abort_error(&self) -> Error {
        match self.with_transaction(|t| t.throw_abort_error(None)) {
            Some(err) => err,
            None => panic!("rethrow without an active transaction"),
        }
    }

    // ========================================================================
    // Policy
    // ========================================================================

    /// Write policy of the active transaction; everything is allowed without one
    pub fn transaction_write_constraint<H>(&self, heap: &H, obj: ObjectRef) -> Result<()>
    where
        H: ObjectModel + ImageSpaces + ?Sized,
    {
        self.with_transaction(|t| t.write_constraint(heap, obj))
            .unwrap_or(Ok(()))
    }

    /// Value policy of the active transaction; everything is allowed without one
    pub fn transaction_write_value_constraint<H>(
        &self,
        heap: &H,
        value: Option<ObjectRef>,
    ) -> Result<()>
    where
        H: ObjectModel + ImageSpaces + ExtensionPolicy + ?Sized,
    {
        self.with_transaction(|t| t.write_value_constraint(heap, value))
            .unwrap_or(Ok(()))
    }

    /// Read policy of the active transaction; everything is allowed without one
    pub fn transaction_read_constraint<H>(&self, heap: &H, class: ObjectRef) -> Result<()>
    where
        H: ObjectModel + ?Sized,
    {
        self.with_transaction(|t| t.read_constraint(heap, class))
            .unwrap_or(Ok(()))
    }

    // ========================================================================
    // Recording
    // ========================================================================

    /// Record a field's pre-write value in the active transaction, if any
    pub fn record_write_field(
        &self,
        obj: ObjectRef,
        offset: MemberOffset,
        value: FieldValue,
        is_volatile: bool,
    ) {
        self.with_transaction(|t| t.record_write_field(obj, offset, value, is_volatile));
    }

    /// Record a boolean field's pre-write value
    pub fn record_write_field_boolean(
        &self,
        obj: ObjectRef,
        offset: MemberOffset,
        value: u8,
        is_volatile: bool,
    ) {
        self.with_transaction(|t| t.record_write_field_boolean(obj, offset, value, is_volatile));
    }

    /// Record a byte field's pre-write value
    pub fn record_write_field_byte(
        &self,
        obj: ObjectRef,
        offset: MemberOffset,
        value: i8,
        is_volatile: bool,
    ) {
        self.with_transaction(|t| t.record_write_field_byte(obj, offset, value, is_volatile));
    }

    /// Record a char field's pre-write value
    pub fn record_write_field_char(
        &self,
        obj: ObjectRef,
        offset: MemberOffset,
        value: u16,
        is_volatile: bool,
    ) {
        self.with_transaction(|t| t.record_write_field_char(obj, offset, value, is_volatile));
    }

    /// Record a short field's pre-write value
    pub fn record_write_field_short(
        &self,
        obj: ObjectRef,
        offset: MemberOffset,
        value: i16,
        is_volatile: bool,
    ) {
        self.with_transaction(|t| t.record_write_field_short(obj, offset, value, is_volatile));
    }

    /// Record a 32-bit field's pre-write value
    pub fn record_write_field_32(
        &self,
        obj: ObjectRef,
        offset: MemberOffset,
        value: u32,
        is_volatile: bool,
    ) {
        self.with_transaction(|t| t.record_write_field_32(obj, offset, value, is_volatile));
    }

    /// Record a 64-bit field's pre-write value
    pub fn record_write_field_64(
        &self,
        obj: ObjectRef,
        offset: MemberOffset,
        value: u64,
        is_volatile: bool,
    ) {
        self.with_transaction(|t| t.record_write_field_64(obj, offset, value, is_volatile));
    }

    /// Record a reference field's pre-write value
    pub fn record_write_field_reference(
        &self,
        obj: ObjectRef,
        offset: MemberOffset,
        value: Option<ObjectRef>,
        is_volatile: bool,
    ) {
        self.with_transaction(|t| t.record_write_field_reference(obj, offset, value, is_volatile));
    }

    /// Record a primitive array element's pre-write raw value
    pub fn record_write_array<H: ObjectModel + ?Sized>(
        &self,
        heap: &H,
        array: ObjectRef,
        index: usize,
        value: u64,
    ) {
        self.with_transaction(|t| t.record_write_array(heap, array, index, value));
    }

    /// Record a string-constant resolution
    pub fn record_resolve_string<C: StringCache + ?Sized>(
        &self,
        caches: &C,
        cache: ObjectRef,
        index: StringIndex,
    ) {
        self.with_transaction(|t| t.record_resolve_string(caches, cache, index));
    }

    /// Record a strong intern table insertion
    pub fn record_strong_string_insertion(&self, string: ObjectRef) {
        self.with_transaction(|t| t.record_strong_string_insertion(string));
    }

    /// Record a weak intern table insertion
    pub fn record_weak_string_insertion(&self, string: ObjectRef) {
        self.with_transaction(|t| t.record_weak_string_insertion(string));
    }

    /// Record a strong intern table removal
    pub fn record_strong_string_removal(&self, string: ObjectRef) {
        self.with_transaction(|t| t.record_strong_string_removal(string));
    }

    /// Record a weak intern table removal
    pub fn record_weak_string_removal(&self, string: ObjectRef) {
        self.with_transaction(|t| t.record_weak_string_removal(string));
    }

    // ========================================================================
    // Recording stores
    // ========================================================================

    /// Store a field, recording its previous value first
    pub fn set_field<H: ObjectModel + ?Sized>(
        &self,
        heap: &mut H,
        obj: ObjectRef,
        offset: MemberOffset,
        value: FieldValue,
        is_volatile: bool,
    ) {
        if self.is_active_transaction() {
            let previous = heap.load_field(obj, offset, value.kind(), is_volatile);
            self.record_write_field(obj, offset, previous, is_volatile);
        }
        heap.store_field(obj, offset, value, is_volatile);
    }

    /// Store a primitive array element, recording its previous value first
    pub fn set_element<H: ObjectModel + ?Sized>(
        &self,
        heap: &mut H,
        array: ObjectRef,
        index: usize,
        value: ArrayElement,
    ) {
        if self.is_active_transaction() {
            let previous = heap.load_element(array, index);
            self.record_write_array(&*heap, array, index, previous.to_raw());
        }
        heap.store_element(array, index, value);
    }

    /// Publish a resolved string into a cache slot, recording the resolution
    pub fn resolve_string<C: StringCache + ?Sized>(
        &self,
        caches: &mut C,
        cache: ObjectRef,
        index: StringIndex,
        string: ObjectRef,
    ) {
        self.record_resolve_string(&*caches, cache, index);
        caches.set_resolved_string(cache, index, string);
    }

    /// Strongly intern `string`, recording the insertion
    ///
    /// `table` is the locked intern table.
    pub fn intern_strong<T: InternTable + ?Sized>(&self, table: &mut T, string: ObjectRef) {
        self.record_strong_string_insertion(string);
        table.insert_strong(string);
    }

    /// Weakly intern `string`, recording the insertion
    pub fn intern_weak<T: InternTable + ?Sized>(&self, table: &mut T, string: ObjectRef) {
        self.record_weak_string_insertion(string);
        table.insert_weak(string);
    }

    /// Remove a strongly interned `string`, recording the removal
    pub fn remove_strong<T: InternTable + ?Sized>(&self, table: &mut T, string: ObjectRef) {
        self.record_strong_string_removal(string);
        table.remove_strong(string);
    }

    /// Remove a weakly interned `string`, recording the removal
    pub fn remove_weak<T: InternTable + ?Sized>(&self, table: &mut T, string: ObjectRef) {
        self.record_weak_string_removal(string);
        table.remove_weak(string);
    }

    // ========================================================================
    // Root scanning
    // ========================================================================

    /// Forward the collector's root scan to the active transaction
    pub fn visit_roots(&self, visitor: &mut dyn RootVisitor) {
        self.with_transaction(|t| t.visit_roots(visitor));
    }
}
