//! # Preinit
//!
//! Undo-logging transactions for speculative class pre-initialization.
//!
//! While an ahead-of-time compiler runs class initializers to bake their
//! results into a boot image, every heap mutation is recorded in a
//! [`Transaction`]. If the initializer does something the image cannot
//! capture, the transaction is aborted and rolled back, restoring fields,
//! array elements, the intern table and string caches to their state before
//! the transaction began.
//!
//! ## Quick Start
//!
//! ```ignore
//! use preinit::prelude::*;
//!
//! let runtime = TransactionRuntime::new();
//! runtime.enter_transaction_mode(true, class);
//!
//! runtime.transaction_write_constraint(&heap, obj)?;
//! runtime.set_field(&mut heap, obj, offset, FieldValue::Bits32(7), false);
//!
//! if runtime.is_transaction_aborted() {
//!     runtime.rollback_and_exit_transaction_mode(&mut heap, &intern_table);
//! } else {
//!     runtime.exit_transaction_mode();
//! }
//! ```
//!
//! ## Crates
//!
//! - `preinit-core` - references, field values, heap traits and errors
//! - `preinit-transaction` - undo logs, the transaction and its runtime slot

#![warn(missing_docs)]

pub mod prelude;

pub use preinit_core::{Error, Result, Violation};
pub use preinit_transaction::{
    NoNewRecordsGuard, Transaction, TransactionOptions, TransactionRuntime, TransactionStats,
};
