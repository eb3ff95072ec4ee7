//! Convenient imports for preinit.
//!
//! ```ignore
//! use preinit::prelude::*;
//!
//! let runtime = TransactionRuntime::new();
//! let txn = runtime.enter_transaction_mode(false, class);
//! ```

// Transactions
pub use preinit_transaction::{
    NoNewRecordsGuard, Transaction, TransactionOptions, TransactionRuntime, TransactionStats,
};

// Error handling
pub use preinit_core::{Error, Result, Violation};

// Core types
pub use preinit_core::{
    ArrayElement, FieldKind, FieldValue, MemberOffset, ObjectRef, PrimitiveType, StringIndex,
};

// Heap interfaces
pub use preinit_core::{
    ExtensionPolicy, ImageSpaces, InternTable, ObjectModel, RootInfo, RootVisitor, StringCache,
};
