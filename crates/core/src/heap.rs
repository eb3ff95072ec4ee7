//! Collaborator interfaces
//!
//! The transaction layer never owns heap storage. Everything it needs from
//! the surrounding runtime is expressed through the traits in this module:
//!
//! | Trait | Provided by | Used for |
//! |-------|-------------|----------|
//! | [`ObjectModel`] | object model | typed loads/stores, class introspection |
//! | [`StringCache`] | object model | clearing resolved string slots |
//! | [`ImageSpaces`] | heap | base-image membership |
//! | [`ExtensionPolicy`] | class linker | extension reference policy |
//! | [`InternTable`] | intern table | undoing intern operations |
//! | [`RootVisitor`] | collector | relocating held references |
//!
//! Stores made through these traits never record into a transaction. The
//! recording side lives in the transaction crate.

use crate::primitive::{ArrayElement, PrimitiveType};
use crate::types::{MemberOffset, ObjectRef, StringIndex};
use crate::value::{FieldKind, FieldValue};

/// Offset of the class-identity field in every object
pub const CLASS_OFFSET: MemberOffset = MemberOffset::new(0);

/// Offset of the length field in every array
pub const ARRAY_LENGTH_OFFSET: MemberOffset = MemberOffset::new(8);

/// Typed access to managed objects
pub trait ObjectModel {
    /// Whether `obj` is a class-metadata object
    fn is_class(&self, obj: ObjectRef) -> bool;

    /// Whether `obj` is an array instance
    fn is_array(&self, obj: ObjectRef) -> bool;

    /// Class of `obj`
    fn class_of(&self, obj: ObjectRef) -> ObjectRef;

    /// Primitive type of the component of `array`'s class
    ///
    /// [`PrimitiveType::Not`] for object arrays.
    fn component_type(&self, array: ObjectRef) -> PrimitiveType;

    /// Offset of the class-identity field
    fn class_offset(&self) -> MemberOffset {
        CLASS_OFFSET
    }

    /// Offset of the array length field
    fn array_length_offset(&self) -> MemberOffset {
        ARRAY_LENGTH_OFFSET
    }

    /// Load a field of the given kind
    fn load_field(
        &self,
        obj: ObjectRef,
        offset: MemberOffset,
        kind: FieldKind,
        is_volatile: bool,
    ) -> FieldValue;

    /// Store a field; the value's variant selects the store width
    fn store_field(
        &mut self,
        obj: ObjectRef,
        offset: MemberOffset,
        value: FieldValue,
        is_volatile: bool,
    );

    /// Load an element of a primitive array
    fn load_element(&self, array: ObjectRef, index: usize) -> ArrayElement;

    /// Store an element of a primitive array without bounds or transaction checks
    fn store_element(&mut self, array: ObjectRef, index: usize, value: ArrayElement);
}

/// Per-compilation-unit string-constant caches
pub trait StringCache {
    /// Number of string constants the cache covers
    fn num_strings(&self, cache: ObjectRef) -> u32;

    /// Resolved string at `index`, if any
    fn resolved_string(&self, cache: ObjectRef, index: StringIndex) -> Option<ObjectRef>;

    /// Publish a resolved string into `index`
    fn set_resolved_string(&mut self, cache: ObjectRef, index: StringIndex, string: ObjectRef);

    /// Reset `index` to unresolved
    fn clear_string(&mut self, cache: ObjectRef, index: StringIndex);
}

/// Image space queries
pub trait ImageSpaces {
    /// Whether `obj` lives in an already-published, immutable base image
    fn is_in_base_image(&self, obj: ObjectRef) -> bool;

    /// Whether any base image exists (false while building the base image itself)
    fn has_base_image(&self) -> bool;
}

/// Class-resolution policy for image extensions
pub trait ExtensionPolicy {
    /// Whether instances of `class` may be referenced from an image extension
    fn can_reference_in_extension(&self, class: ObjectRef) -> bool;
}

/// Raw membership operations on the interned-string table
///
/// These never record into a transaction; they are what rollback uses to
/// invert logged operations.
pub trait InternTable {
    /// Add `string` to the strong set
    fn insert_strong(&mut self, string: ObjectRef);

    /// Add `string` to the weak set
    fn insert_weak(&mut self, string: ObjectRef);

    /// Remove `string` from the strong set
    fn remove_strong(&mut self, string: ObjectRef);

    /// Remove `string` from the weak set
    fn remove_weak(&mut self, string: ObjectRef);
}

/// Why a reference is held, reported to the collector with each root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RootInfo {
    /// No specific category
    Unknown,
    /// An interned string
    InternedString,
    /// Runtime-internal structure (caches)
    VmInternal,
}

/// Collector callback for root scanning
///
/// The visitor may overwrite the reference in place when the object moved.
pub trait RootVisitor {
    /// Visit a non-null root
    fn visit_root(&mut self, root: &mut ObjectRef, info: RootInfo);

    /// Visit a nullable root, skipping null
    fn visit_root_if_non_null(&mut self, root: &mut Option<ObjectRef>, info: RootInfo) {
        if let Some(obj) = root.as_mut() {
            self.visit_root(obj, info);
        }
    }
}

/// A visitor that does nothing (for testing)
pub struct NullVisitor;

impl RootVisitor for NullVisitor {
    #[inline]
    fn visit_root(&mut self, _root: &mut ObjectRef, _info: RootInfo) {}
}

/// A visitor that counts roots per category
#[derive(Debug, Default)]
pub struct CountingVisitor {
    /// Roots reported as [`RootInfo::Unknown`]
    pub unknown: usize,
    /// Roots reported as [`RootInfo::InternedString`]
    pub interned_strings: usize,
    /// Roots reported as [`RootInfo::VmInternal`]
    pub vm_internal: usize,
}

impl CountingVisitor {
    /// Create a new counting visitor
    pub fn new() -> Self {
        Self::default()
    }

    /// Total roots visited
    pub fn total(&self) -> usize {
        self.unknown + self.interned_strings + self.vm_internal
    }
}

impl RootVisitor for CountingVisitor {
    fn visit_root(&mut self, _root: &mut ObjectRef, info: RootInfo) {
        match info {
            RootInfo::Unknown => self.unknown += 1,
            RootInfo::InternedString => self.interned_strings += 1,
            RootInfo::VmInternal => self.vm_internal += 1,
        }
    }
}
