//! Typed field values
//!
//! [`FieldValue`] is the payload of every field load and store in the object
//! model. It doubles as the captured pre-write value inside an object log, so
//! each variant carries exactly the width the store primitive expects.
//!
//! ## Raw Encoding
//!
//! Every value has a 64-bit raw bit pattern. Narrow kinds are zero-extended
//! from their unsigned representation; references use the address token with
//! `0` for null. Decoding truncates, so sign-extended input decodes to the
//! same value.

use crate::types::ObjectRef;
use serde::{Deserialize, Serialize};

/// The seven field kinds an object log distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldKind {
    /// 8-bit boolean
    Boolean,
    /// Signed 8-bit integer
    Byte,
    /// Unsigned 16-bit character
    Char,
    /// Signed 16-bit integer
    Short,
    /// Any 32-bit field (int, float)
    Bits32,
    /// Any 64-bit field (long, double)
    Bits64,
    /// Object reference
    Reference,
}

impl FieldKind {
    /// All field kinds (for iteration)
    pub const ALL: [FieldKind; 7] = [
        FieldKind::Boolean,
        FieldKind::Byte,
        FieldKind::Char,
        FieldKind::Short,
        FieldKind::Bits32,
        FieldKind::Bits64,
        FieldKind::Reference,
    ];

    /// Human-readable name
    pub const fn name(&self) -> &'static str {
        match self {
            FieldKind::Boolean => "boolean",
            FieldKind::Byte => "byte",
            FieldKind::Char => "char",
            FieldKind::Short => "short",
            FieldKind::Bits32 => "32-bit",
            FieldKind::Bits64 => "64-bit",
            FieldKind::Reference => "reference",
        }
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A typed field value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldValue {
    /// Boolean stored as a byte
    Boolean(u8),
    /// Signed byte
    Byte(i8),
    /// UTF-16 code unit
    Char(u16),
    /// Signed short
    Short(i16),
    /// 32-bit pattern
    Bits32(u32),
    /// 64-bit pattern
    Bits64(u64),
    /// Nullable reference
    Reference(Option<ObjectRef>),
}

impl FieldValue {
    /// Kind tag of this value
    pub const fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Boolean(_) => FieldKind::Boolean,
            FieldValue::Byte(_) => FieldKind::Byte,
            FieldValue::Char(_) => FieldKind::Char,
            FieldValue::Short(_) => FieldKind::Short,
            FieldValue::Bits32(_) => FieldKind::Bits32,
            FieldValue::Bits64(_) => FieldKind::Bits64,
            FieldValue::Reference(_) => FieldKind::Reference,
        }
    }

    /// Raw 64-bit bit pattern
    pub fn raw(&self) -> u64 {
        match *self {
            FieldValue::Boolean(v) => u64::from(v),
            FieldValue::Byte(v) => u64::from(v as u8),
            FieldValue::Char(v) => u64::from(v),
            FieldValue::Short(v) => u64::from(v as u16),
            FieldValue::Bits32(v) => u64::from(v),
            FieldValue::Bits64(v) => v,
            FieldValue::Reference(r) => ObjectRef::to_raw(r),
        }
    }

    /// Decode a raw bit pattern as a value of the given kind
    ///
    /// # Examples
    ///
    /// ```
    /// use preinit_core::value::{FieldKind, FieldValue};
    ///
    /// let v = FieldValue::from_raw(FieldKind::Byte, (-3i64) as u64);
    /// assert_eq!(v, FieldValue::Byte(-3));
    /// ```
    pub fn from_raw(kind: FieldKind, raw: u64) -> Self {
        match kind {
            FieldKind::Boolean => FieldValue::Boolean(raw as u8),
            FieldKind::Byte => FieldValue::Byte(raw as i8),
            FieldKind::Char => FieldValue::Char(raw as u16),
            FieldKind::Short => FieldValue::Short(raw as i16),
            FieldKind::Bits32 => FieldValue::Bits32(raw as u32),
            FieldKind::Bits64 => FieldValue::Bits64(raw),
            FieldKind::Reference => FieldValue::Reference(ObjectRef::new(raw)),
        }
    }
}
