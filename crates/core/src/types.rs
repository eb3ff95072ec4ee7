//! Core types for heap references
//!
//! This module defines the handles the transaction layer uses to name
//! locations in the managed heap:
//! - [`ObjectRef`]: Address token of a live heap object
//! - [`MemberOffset`]: Byte offset of a field inside an object
//! - [`StringIndex`]: Slot index inside a string-constant cache

use serde::{Deserialize, Serialize};
use std::num::NonZeroU64;

/// Address token of a managed heap object
///
/// ObjectRef is never null. Nullable references are spelled
/// `Option<ObjectRef>`, which has the same size thanks to the niche in
/// `NonZeroU64`, and encode to the raw token `0`.
///
/// The token is only valid until the next collection: a moving collector may
/// hand out a different token for the same object during root scanning.
///
/// # Examples
///
/// ```
/// use preinit_core::types::ObjectRef;
///
/// let obj = ObjectRef::new(0x1000).unwrap();
/// assert_eq!(obj.addr(), 0x1000);
/// assert!(ObjectRef::new(0).is_none());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectRef(NonZeroU64);

impl ObjectRef {
    /// Create a reference from a raw address, `None` for the null address
    pub fn new(addr: u64) -> Option<Self> {
        NonZeroU64::new(addr).map(ObjectRef)
    }

    /// Raw address of the referenced object
    pub fn addr(self) -> u64 {
        self.0.get()
    }

    /// Encode a nullable reference as a raw token (`0` for null)
    ///
    /// # Examples
    ///
    /// ```
    /// use preinit_core::types::ObjectRef;
    ///
    /// let obj = ObjectRef::new(0x20);
    /// assert_eq!(ObjectRef::to_raw(obj), 0x20);
    /// assert_eq!(ObjectRef::to_raw(None), 0);
    /// assert_eq!(ObjectRef::new(ObjectRef::to_raw(obj)), obj);
    /// ```
    pub fn to_raw(reference: Option<ObjectRef>) -> u64 {
        reference.map_or(0, ObjectRef::addr)
    }
}

impl std::fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Byte offset of a field inside an object
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MemberOffset(u32);

impl MemberOffset {
    /// Create an offset
    pub const fn new(offset: u32) -> Self {
        MemberOffset(offset)
    }

    /// Raw offset value
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for MemberOffset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "+{}", self.0)
    }
}

/// Index of a string constant inside a string-constant cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StringIndex(u32);

impl StringIndex {
    /// Create a string index
    pub const fn new(index: u32) -> Self {
        StringIndex(index)
    }

    /// Raw index value
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for StringIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "string@{}", self.0)
    }
}
