//! Error types for transactional class pre-initialization
//!
//! Only conditions a class initializer can cause are errors. Defects in the
//! surrounding runtime (unknown element types, colliding relocations,
//! recording while records are forbidden) are assertions, not variants here.

use crate::types::ObjectRef;
use thiserror::Error;

/// Descriptor of the managed error thrown into an aborted initializer
pub const ABORT_ERROR_DESCRIPTOR: &str = "Ldalvik/system/TransactionAbortError;";

/// A read or write the active transaction refuses
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    /// Target lives in a published base image
    #[error("can't write to {object}: it belongs to a base image")]
    BaseImageWrite {
        /// Written object
        object: ObjectRef,
    },

    /// Strict transaction writing static state of another class
    #[error("can't set static fields of class {class} while initializing {root}")]
    ForeignClassWrite {
        /// Written class
        class: ObjectRef,
        /// Class being initialized
        root: ObjectRef,
    },

    /// Extension storing a reference to an instance of a forbidden class
    #[error("can't store a reference to an instance of class {class} in an image extension")]
    ExtensionValue {
        /// Class of the stored value
        class: ObjectRef,
    },

    /// Strict transaction reading static state of another class
    #[error("can't read static fields of class {class} while initializing {root}")]
    ForeignClassRead {
        /// Read class
        class: ObjectRef,
        /// Class being initialized
        root: ObjectRef,
    },
}

/// Errors surfaced to the executing initializer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The transaction was aborted; carries the abort message
    #[error("{descriptor}: {message}", descriptor = ABORT_ERROR_DESCRIPTOR)]
    TransactionAborted {
        /// Abort message
        message: String,
    },

    /// A read or write was refused by the transaction policy
    #[error("transaction constraint violated: {0}")]
    ConstraintViolation(#[from] Violation),
}

/// Result type for transactional operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this is an abort error
    pub fn is_aborted(&self) -> bool {
        matches!(self, Error::TransactionAborted { .. })
    }

    /// Check if this is a constraint violation
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, Error::ConstraintViolation(_))
    }

    /// Message suitable for aborting the transaction with
    pub fn abort_message(&self) -> String {
        match self {
            Error::TransactionAborted { message } => message.clone(),
            Error::ConstraintViolation(violation) => violation.to_string(),
        }
    }
}
