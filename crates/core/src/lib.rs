//! Core types for preinit
//!
//! This crate defines the vocabulary shared by the transaction layer and the
//! runtime it plugs into:
//! - Heap handles: [`ObjectRef`], [`MemberOffset`], [`StringIndex`]
//! - Typed values: [`FieldValue`], [`ArrayElement`], [`PrimitiveType`]
//! - Collaborator traits: object model, image spaces, intern table, root visitor
//! - Error types: [`Error`], [`Violation`]

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod heap;
pub mod primitive;
pub mod types;
pub mod value;

pub use error::{Error, Result, Violation, ABORT_ERROR_DESCRIPTOR};
pub use heap::{
    CountingVisitor, ExtensionPolicy, ImageSpaces, InternTable, NullVisitor, ObjectModel,
    RootInfo, RootVisitor, StringCache, ARRAY_LENGTH_OFFSET, CLASS_OFFSET,
};
pub use primitive::{ArrayElement, PrimitiveType};
pub use types::{MemberOffset, ObjectRef, StringIndex};
pub use value::{FieldKind, FieldValue};
