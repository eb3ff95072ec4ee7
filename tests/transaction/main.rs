//! Transaction Integration Test Suite
//!
//! Drives the transaction runtime against the simulated heap the way a
//! compiler pre-initializing classes would: enter a transaction, mutate the
//! heap through recording stores, then either commit by exiting or roll back.
//!
//! ## Running Tests
//!
//! ```bash
//! # Run all transaction tests
//! cargo test --test transaction
//!
//! # Run relocation tests only
//! cargo test --test transaction relocation::
//! ```

use std::sync::Arc;

use parking_lot::Mutex;
use preinit::prelude::*;
use preinit_testkit::{Relocator, SimHeap, SimInternTable};

// Test modules
pub mod abort;
pub mod concurrency;
pub mod guard;
pub mod policy;
pub mod rollback;

// =============================================================================
// SHARED TEST UTILITIES
// =============================================================================

/// First instance field offset past the object header
pub const FIELD: MemberOffset = MemberOffset::new(16);

/// Install a test-writer subscriber once per process
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Runtime, heap and intern table wired together around one root class
pub struct Fixture {
    pub runtime: TransactionRuntime,
    pub heap: SimHeap,
    pub interns: Mutex<SimInternTable>,
    pub root: ObjectRef,
}

impl Fixture {
    /// Fresh heap holding only the root class
    pub fn new() -> Self {
        init_tracing();
        let mut heap = SimHeap::new();
        let root = heap.alloc_class("LRoot;");
        Fixture {
            runtime: TransactionRuntime::new(),
            heap,
            interns: Mutex::new(SimInternTable::new()),
            root,
        }
    }

    /// Enter a transaction initializing the root class
    pub fn begin(&self, strict: bool) -> Arc<Transaction> {
        self.runtime.enter_transaction_mode(strict, self.root)
    }

    /// Roll back and leave the active transaction
    pub fn rollback(&mut self) {
        self.runtime
            .rollback_and_exit_transaction_mode(&mut self.heap, &self.interns);
    }

    /// Allocate an instance of the root class
    pub fn instance(&mut self) -> ObjectRef {
        let root = self.root;
        self.heap.alloc_instance(root)
    }

    /// Store a field through the runtime
    pub fn set(&mut self, obj: ObjectRef, offset: MemberOffset, value: FieldValue) {
        self.runtime
            .set_field(&mut self.heap, obj, offset, value, false);
    }

    /// Load a field of the given kind
    pub fn get(&self, obj: ObjectRef, offset: MemberOffset, kind: FieldKind) -> FieldValue {
        self.heap.load_field(obj, offset, kind, false)
    }

    /// Move `obj` and scan the runtime's roots with the matching forwarding
    pub fn move_and_scan(&mut self, obj: ObjectRef) -> ObjectRef {
        let moved = self.heap.move_object(obj);
        self.interns.lock().relocate(obj, moved);
        let mut relocator = Relocator::new();
        relocator.forward(obj, moved);
        self.runtime.visit_roots(&mut relocator);
        moved
    }
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}
