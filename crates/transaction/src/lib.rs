//! Transaction layer for preinit
//!
//! This crate implements undo logging for speculative class initialization:
//! - Transaction: record pre-write values, enforce read/write policy, roll back
//! - ObjectLog / ArrayLog: first-write-wins capture per field and element
//! - InternStringLog / ResolveStringLog: intern table and string cache undo
//! - TransactionRuntime: the single active-transaction slot and recording stores
//! - NoNewRecordsGuard: scoped debug assertion against new records
//!
//! Every log participates in root scanning so a moving collector can run
//! while a transaction is open.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod array_log;
pub mod guard;
pub mod intern_log;
pub mod object_log;
pub mod options;
pub mod resolve_log;
pub mod runtime;
pub mod stats;
pub mod transaction;

pub use array_log::ArrayLog;
pub use guard::NoNewRecordsGuard;
pub use intern_log::{InternStringLog, StringKind, StringOp};
pub use object_log::{ObjectLog, ValueLogEntry};
pub use options::TransactionOptions;
pub use resolve_log::ResolveStringLog;
pub use runtime::TransactionRuntime;
pub use stats::TransactionStats;
pub use transaction::Transaction;
