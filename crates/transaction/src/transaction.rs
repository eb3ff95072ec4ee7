//! The undo-logging transaction
//!
//! A [`Transaction`] wraps the speculative execution of one class
//! initializer. Every store the initializer makes is preceded by a
//! `record_*` call capturing the value the location held before its first
//! write. If the initializer fails, [`Transaction::rollback`] replays the
//! captured values and the heap is back to its pre-transaction state.
//!
//! ## Rollback Sequence
//!
//! ```text
//! 1. Lock the intern table, then the transaction log
//! 2. Check no transaction is active in the runtime
//! 3. Undo object logs
//! 4. Undo array logs
//! 5. Undo intern table operations, newest first
//! 6. Clear resolved string slots
//! 7. Clear all logs
//! ```
//!
//! ## Policy
//!
//! | Mode | Writes | Stored values | Static reads |
//! |------|--------|---------------|--------------|
//! | strict | root class, instances, arrays | any | root class only |
//! | base image | anything | any | any |
//! | extension | outside the base image | extension-referenceable classes | any |
//!
//! Base-image objects are never writable, whatever the mode.

use crate::array_log::ArrayLog;
use crate::intern_log::{InternStringLog, StringKind, StringOp};
use crate::object_log::ObjectLog;
use crate::options::TransactionOptions;
use crate::resolve_log::ResolveStringLog;
use crate::runtime::TransactionRuntime;
use crate::stats::TransactionStats;
use parking_lot::Mutex;
use preinit_core::{
    Error, ExtensionPolicy, FieldValue, ImageSpaces, InternTable, MemberOffset, ObjectModel,
    ObjectRef, PrimitiveType, Result, RootInfo, RootVisitor, StringCache, StringIndex, Violation,
};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::collections::VecDeque;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

/// Log state guarded by the transaction's log lock
#[derive(Debug)]
struct TransactionLogs {
    /// Class being initialized
    ///
    /// Lives under the lock because root scanning may relocate it.
    root: ObjectRef,
    aborted: bool,
    abort_message: String,
    object_logs: FxHashMap<ObjectRef, ObjectLog>,
    array_logs: FxHashMap<ObjectRef, ArrayLog>,
    /// Newest entry first
    intern_string_logs: VecDeque<InternStringLog>,
    resolve_string_logs: Vec<ResolveStringLog>,
    assert_no_new_records_reason: Option<&'static str>,
}

impl TransactionLogs {
    fn new(root: ObjectRef) -> Self {
        TransactionLogs {
            root,
            aborted: false,
            abort_message: String::new(),
            object_logs: FxHashMap::default(),
            array_logs: FxHashMap::default(),
            intern_string_logs: VecDeque::new(),
            resolve_string_logs: Vec::new(),
            assert_no_new_records_reason: None,
        }
    }

    fn assert_can_record(&self) {
        debug_assert!(
            self.assert_no_new_records_reason.is_none(),
            "new transaction record while forbidden: {}",
            self.assert_no_new_records_reason.unwrap_or_default()
        );
    }

    fn stats(&self) -> TransactionStats {
        TransactionStats {
            objects_count: self.object_logs.len(),
            field_values_count: self.object_logs.values().map(ObjectLog::len).sum(),
            array_count: self.array_logs.len(),
            array_values_count: self.array_logs.values().map(ArrayLog::len).sum(),
            intern_string_count: self.intern_string_logs.len(),
            resolve_string_count: self.resolve_string_logs.len(),
        }
    }
}

/// Undo log for one speculative class initialization
///
/// # Thread Safety
///
/// Recording, policy checks and abort state are serialized by a single log
/// lock, so worker threads executing the initializer may share the
/// transaction through an `Arc`.
pub struct Transaction {
    options: TransactionOptions,
    rolling_back: AtomicBool,
    logs: Mutex<TransactionLogs>,
}

impl Transaction {
    /// Create a transaction initializing `root`
    pub fn new(strict: bool, root: ObjectRef) -> Self {
        let options = TransactionOptions {
            strict,
            ..Default::default()
        };
        Self::with_options(options, root)
    }

    /// Create a transaction with explicit options
    pub fn with_options(options: TransactionOptions, root: ObjectRef) -> Self {
        Transaction {
            options,
            rolling_back: AtomicBool::new(false),
            logs: Mutex::new(TransactionLogs::new(root)),
        }
    }

    /// Whether this transaction runs in strict mode
    pub fn is_strict(&self) -> bool {
        self.options.strict
    }

    /// Options this transaction was created with
    pub fn options(&self) -> TransactionOptions {
        self.options
    }

    /// Class being initialized (current address)
    pub fn root(&self) -> ObjectRef {
        self.logs.lock().root
    }

    // ========================================================================
    // Abort
    // ========================================================================

    /// Mark the transaction as aborted
    ///
    /// An initializer may catch the abort error and fail again later, so this
    /// can be called more than once. Only the first message is kept.
    pub fn abort(&self, message: impl Into<String>) {
        let mut logs = self.logs.lock();
        if !logs.aborted {
            logs.aborted = true;
            logs.abort_message = message.into();
            debug!(reason = %logs.abort_message, "transaction aborted");
        }
    }

    /// Whether [`abort`](Self::abort) has been called
    pub fn is_aborted(&self) -> bool {
        self.logs.lock().aborted
    }

    /// First abort message, empty if not aborted
    pub fn abort_message(&self) -> String {
        self.logs.lock().abort_message.clone()
    }

    /// Whether a rollback is in progress
    pub fn is_rolling_back(&self) -> bool {
        self.rolling_back.load(Ordering::Acquire)
    }

    /// Build the error thrown into the initializer
    ///
    /// With `Some(message)` the error carries that message. With `None` the
    /// stored abort message is rethrown; the transaction must already be
    /// aborted in that case.
    pub fn throw_abort_error(&self, message: Option<&str>) -> Error {
        let message = match message {
            Some(message) => message.to_string(),
            None => {
                let logs = self.logs.lock();
                debug_assert!(
                    logs.aborted,
                    "rethrow {} while transaction is not aborted",
                    preinit_core::ABORT_ERROR_DESCRIPTOR
                );
                logs.abort_message.clone()
            }
        };
        Error::TransactionAborted { message }
    }

    // ========================================================================
    // Policy
    // ========================================================================

    /// Check whether writing to `obj` is allowed
    pub fn write_constraint<H>(&self, heap: &H, obj: ObjectRef) -> Result<()>
    where
        H: ObjectModel + ImageSpaces + ?Sized,
    {
        let logs = self.logs.lock();

        // For the base image itself there are no base image spaces.
        if heap.is_in_base_image(obj) {
            return Err(Violation::BaseImageWrite { object: obj }.into());
        }

        let root = logs.root;
        if self.is_strict() && heap.is_class(obj) && obj != root {
            return Err(Violation::ForeignClassWrite { class: obj, root }.into());
        }
        Ok(())
    }

    /// Check whether storing `value` into a field is allowed
    pub fn write_value_constraint<H>(&self, heap: &H, value: Option<ObjectRef>) -> Result<()>
    where
        H: ObjectModel + ImageSpaces + ExtensionPolicy + ?Sized,
    {
        let Some(value) = value else {
            return Ok(());
        };
        let _logs = self.logs.lock();

        // TODO: decide whether strict transactions should apply the extension restriction.
        if self.is_strict() || !heap.has_base_image() {
            return Ok(());
        }

        let class = if heap.is_class(value) {
            value
        } else {
            heap.class_of(value)
        };
        if heap.can_reference_in_extension(class) {
            Ok(())
        } else {
            Err(Violation::ExtensionValue { class }.into())
        }
    }

    /// Check whether reading a static field of `class` is allowed
    ///
    /// Instance fields and array elements are always readable.
    pub fn read_constraint<H>(&self, heap: &H, class: ObjectRef) -> Result<()>
    where
        H: ObjectModel + ?Sized,
    {
        debug_assert!(heap.is_class(class), "{class} is not a class");
        let logs = self.logs.lock();
        let root = logs.root;
        if self.is_strict() && class != root {
            return Err(Violation::ForeignClassRead { class, root }.into());
        }
        Ok(())
    }

    // ========================================================================
    // Recording
    // ========================================================================

    /// Record the pre-write value of a field of `obj`
    ///
    /// Only the first record per (object, offset) is kept.
    pub fn record_write_field(
        &self,
        obj: ObjectRef,
        offset: MemberOffset,
        value: FieldValue,
        is_volatile: bool,
    ) {
        let mut logs = self.logs.lock();
        logs.assert_can_record();
        logs.object_logs
            .entry(obj)
            .or_default()
            .log_value(offset, value, is_volatile);
    }

    /// Record the pre-write value of a boolean field
    pub fn record_write_field_boolean(
        &self,
        obj: ObjectRef,
        offset: MemberOffset,
        value: u8,
        is_volatile: bool,
    ) {
        self.record_write_field(obj, offset, FieldValue::Boolean(value), is_volatile);
    }

    /// Record the pre-write value of a byte field
    pub fn record_write_field_byte(
        &self,
        obj: ObjectRef,
        offset: MemberOffset,
        value: i8,
        is_volatile: bool,
    ) {
        self.record_write_field(obj, offset, FieldValue::Byte(value), is_volatile);
    }

    /// Record the pre-write value of a char field
    pub fn record_write_field_char(
        &self,
        obj: ObjectRef,
        offset: MemberOffset,
        value: u16,
        is_volatile: bool,
    ) {
        self.record_write_field(obj, offset, FieldValue::Char(value), is_volatile);
    }

    /// Record the pre-write value of a short field
    pub fn record_write_field_short(
        &self,
        obj: ObjectRef,
        offset: MemberOffset,
        value: i16,
        is_volatile: bool,
    ) {
        self.record_write_field(obj, offset, FieldValue::Short(value), is_volatile);
    }

    /// Record the pre-write value of a 32-bit field
    pub fn record_write_field_32(
        &self,
        obj: ObjectRef,
        offset: MemberOffset,
        value: u32,
        is_volatile: bool,
    ) {
        self.record_write_field(obj, offset, FieldValue::Bits32(value), is_volatile);
    }

    /// Record the pre-write value of a 64-bit field
    pub fn record_write_field_64(
        &self,
        obj: ObjectRef,
        offset: MemberOffset,
        value: u64,
        is_volatile: bool,
    ) {
        self.record_write_field(obj, offset, FieldValue::Bits64(value), is_volatile);
    }

    /// Record the pre-write value of a reference field
    pub fn record_write_field_reference(
        &self,
        obj: ObjectRef,
        offset: MemberOffset,
        value: Option<ObjectRef>,
        is_volatile: bool,
    ) {
        self.record_write_field(obj, offset, FieldValue::Reference(value), is_volatile);
    }

    /// Record the pre-write raw value of a primitive array element
    ///
    /// Object array stores are field writes and go through
    /// [`record_write_field_reference`](Self::record_write_field_reference).
    pub fn record_write_array<H: ObjectModel + ?Sized>(
        &self,
        heap: &H,
        array: ObjectRef,
        index: usize,
        value: u64,
    ) {
        debug_assert!(heap.is_array(array), "{array} is not an array");
        debug_assert_ne!(
            heap.component_type(array),
            PrimitiveType::Not,
            "object array {array} should be logged as an object"
        );
        let mut logs = self.logs.lock();
        logs.assert_can_record();
        logs.array_logs
            .entry(array)
            .or_default()
            .log_value(index, value);
    }

    /// Record that `index` of `cache` was resolved
    pub fn record_resolve_string<C: StringCache + ?Sized>(
        &self,
        caches: &C,
        cache: ObjectRef,
        index: StringIndex,
    ) {
        debug_assert!(
            index.value() < caches.num_strings(cache),
            "{index} out of range for cache {cache}"
        );
        let mut logs = self.logs.lock();
        logs.assert_can_record();
        logs.resolve_string_logs
            .push(ResolveStringLog::new(cache, index));
    }

    /// Record a strong insertion into the intern table
    ///
    /// Callers hold the intern table lock.
    pub fn record_strong_string_insertion(&self, string: ObjectRef) {
        self.log_interned_string(InternStringLog::new(
            string,
            StringKind::Strong,
            StringOp::Insert,
        ));
    }

    /// Record a weak insertion into the intern table
    pub fn record_weak_string_insertion(&self, string: ObjectRef) {
        self.log_interned_string(InternStringLog::new(
            string,
            StringKind::Weak,
            StringOp::Insert,
        ));
    }

    /// Record a strong removal from the intern table
    pub fn record_strong_string_removal(&self, string: ObjectRef) {
        self.log_interned_string(InternStringLog::new(
            string,
            StringKind::Strong,
            StringOp::Remove,
        ));
    }

    /// Record a weak removal from the intern table
    pub fn record_weak_string_removal(&self, string: ObjectRef) {
        self.log_interned_string(InternStringLog::new(
            string,
            StringKind::Weak,
            StringOp::Remove,
        ));
    }

    fn log_interned_string(&self, log: InternStringLog) {
        let mut logs = self.logs.lock();
        logs.assert_can_record();
        logs.intern_string_logs.push_front(log);
    }

    // ========================================================================
    // Rollback
    // ========================================================================

    /// Undo every recorded modification and clear the logs
    ///
    /// The transaction must already be deactivated in `runtime`. The intern
    /// table lock is taken before the log lock.
    ///
    /// # Panics
    ///
    /// Panics if `runtime` still has an active transaction.
    pub fn rollback<H, T>(
        &self,
        runtime: &TransactionRuntime,
        heap: &mut H,
        intern_table: &Mutex<T>,
    )
    where
        H: ObjectModel + StringCache + ?Sized,
        T: InternTable + ?Sized,
    {
        let mut table = intern_table.lock();
        let mut logs = self.logs.lock();
        self.rolling_back.store(true, Ordering::Release);
        assert!(
            !runtime.is_active_transaction(),
            "rollback while a transaction is still active"
        );

        let stats = logs.stats();
        info!(
            objects = stats.objects_count,
            arrays = stats.array_count,
            intern_strings = stats.intern_string_count,
            resolved_strings = stats.resolve_string_count,
            "rolling back transaction"
        );

        for (&obj, log) in &logs.object_logs {
            log.undo(obj, heap);
        }
        logs.object_logs.clear();

        for (&array, log) in &logs.array_logs {
            log.undo(array, heap);
        }
        logs.array_logs.clear();

        // Front of the deque is the most recent operation.
        for log in &logs.intern_string_logs {
            log.undo(&mut *table);
        }
        logs.intern_string_logs.clear();

        for log in &logs.resolve_string_logs {
            log.undo(heap);
        }
        logs.resolve_string_logs.clear();

        self.rolling_back.store(false, Ordering::Release);
    }

    // ========================================================================
    // Root scanning
    // ========================================================================

    /// Report every held reference to the collector and follow relocations
    pub fn visit_roots(&self, visitor: &mut dyn RootVisitor) {
        let mut logs = self.logs.lock();
        let logs = &mut *logs;

        visitor.visit_root(&mut logs.root, RootInfo::Unknown);

        let moved_objects = collect_moved_keys(&mut logs.object_logs, visitor, |log, visitor| {
            log.visit_roots(visitor)
        });
        rekey(&mut logs.object_logs, moved_objects);

        let moved_arrays = collect_moved_keys(&mut logs.array_logs, visitor, |_, _| {});
        rekey(&mut logs.array_logs, moved_arrays);

        for log in logs.intern_string_logs.iter_mut() {
            log.visit_roots(visitor);
        }
        for log in logs.resolve_string_logs.iter_mut() {
            log.visit_roots(visitor);
        }
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    /// Current log sizes
    pub fn stats(&self) -> TransactionStats {
        self.logs.lock().stats()
    }

    /// Captured value for a field, if any
    pub fn logged_field(&self, obj: ObjectRef, offset: MemberOffset) -> Option<FieldValue> {
        let logs = self.logs.lock();
        logs.object_logs
            .get(&obj)
            .and_then(|log| log.get(offset))
            .map(|entry| entry.value())
    }

    /// Captured raw value for an array element, if any
    pub fn logged_element(&self, array: ObjectRef, index: usize) -> Option<u64> {
        let logs = self.logs.lock();
        logs.array_logs.get(&array).and_then(|log| log.get(index))
    }

    /// Logged intern table operations, newest first
    pub fn intern_string_logs(&self) -> Vec<InternStringLog> {
        self.logs.lock().intern_string_logs.iter().cloned().collect()
    }

    pub(crate) fn install_no_new_records(&self, reason: &'static str) {
        let mut logs = self.logs.lock();
        assert!(
            logs.assert_no_new_records_reason.is_none(),
            "old: {} new: {}",
            logs.assert_no_new_records_reason.unwrap_or_default(),
            reason
        );
        logs.assert_no_new_records_reason = Some(reason);
    }

    pub(crate) fn remove_no_new_records(&self) {
        let mut logs = self.logs.lock();
        assert!(
            logs.assert_no_new_records_reason.is_some(),
            "no-new-records assertion is not installed"
        );
        logs.assert_no_new_records_reason = None;
    }

    pub(crate) fn no_new_records_reason(&self) -> Option<&'static str> {
        self.logs.lock().assert_no_new_records_reason
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if self.options.log_stats {
            let stats = self.logs.get_mut().stats();
            debug!(summary = %stats.summary(), "transaction dropped");
        }
    }
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("options", &self.options)
            .field("rolling_back", &self.is_rolling_back())
            .finish_non_exhaustive()
    }
}

type MovedKeys = SmallVec<[(ObjectRef, ObjectRef); 8]>;

/// First pass of key relocation: visit every key, remember the ones that moved
fn collect_moved_keys<V>(
    map: &mut FxHashMap<ObjectRef, V>,
    visitor: &mut dyn RootVisitor,
    mut visit_value: impl FnMut(&mut V, &mut dyn RootVisitor),
) -> MovedKeys {
    let mut moved = MovedKeys::new();
    for (&old_root, value) in map.iter_mut() {
        visit_value(value, &mut *visitor);
        let mut new_root = old_root;
        visitor.visit_root(&mut new_root, RootInfo::Unknown);
        if new_root != old_root {
            moved.push((old_root, new_root));
        }
    }
    moved
}

/// Second pass of key relocation: move entries to their new keys
///
/// Removes every moved entry before reinserting any, so objects swapping
/// addresses within one pass do not collide with each other.
fn rekey<K: Eq + Hash + Copy + std::fmt::Display, V>(
    map: &mut FxHashMap<K, V>,
    moved: SmallVec<[(K, K); 8]>,
) {
    if moved.is_empty() {
        return;
    }
    debug!(count = moved.len(), "re-keying relocated transaction logs");

    let mut detached: SmallVec<[(K, V); 8]> = SmallVec::with_capacity(moved.len());
    for (old_root, new_root) in moved {
        match map.remove(&old_root) {
            Some(value) => detached.push((new_root, value)),
            None => panic!("relocated key {old_root} is missing from its log"),
        }
    }
    for (new_root, value) in detached {
        assert!(
            !map.contains_key(&new_root),
            "relocation collides with existing log for {new_root}"
        );
        map.insert(new_root, value);
    }
}
