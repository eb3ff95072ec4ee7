//! Array component types and typed array elements
//!
//! An array log stores untyped 64-bit patterns. The element type is recovered
//! from the array's class at undo time through [`PrimitiveType`], and
//! [`ArrayElement`] carries the value into the matching element accessor.

use serde::{Deserialize, Serialize};

/// Primitive type of an array component (or of a class)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimitiveType {
    /// Not a primitive: the component is an object reference
    Not,
    /// boolean
    Boolean,
    /// byte
    Byte,
    /// char
    Char,
    /// short
    Short,
    /// int
    Int,
    /// long
    Long,
    /// float
    Float,
    /// double
    Double,
    /// void (never an array component)
    Void,
}

impl PrimitiveType {
    /// The eight types that may appear as a primitive array component
    pub const ARRAY_COMPONENTS: [PrimitiveType; 8] = [
        PrimitiveType::Boolean,
        PrimitiveType::Byte,
        PrimitiveType::Char,
        PrimitiveType::Short,
        PrimitiveType::Int,
        PrimitiveType::Long,
        PrimitiveType::Float,
        PrimitiveType::Double,
    ];

    /// Whether this is a real primitive (not a reference and not void)
    pub const fn is_primitive(&self) -> bool {
        !matches!(self, PrimitiveType::Not | PrimitiveType::Void)
    }

    /// Java descriptor character
    pub const fn descriptor(&self) -> char {
        match self {
            PrimitiveType::Not => 'L',
            PrimitiveType::Boolean => 'Z',
            PrimitiveType::Byte => 'B',
            PrimitiveType::Char => 'C',
            PrimitiveType::Short => 'S',
            PrimitiveType::Int => 'I',
            PrimitiveType::Long => 'J',
            PrimitiveType::Float => 'F',
            PrimitiveType::Double => 'D',
            PrimitiveType::Void => 'V',
        }
    }
}

impl std::fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.descriptor())
    }
}

/// A typed element of a primitive array
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ArrayElement {
    /// boolean[]
    Boolean(u8),
    /// byte[]
    Byte(i8),
    /// char[]
    Char(u16),
    /// short[]
    Short(i16),
    /// int[]
    Int(i32),
    /// long[]
    Long(i64),
    /// float[]
    Float(f32),
    /// double[]
    Double(f64),
}

impl ArrayElement {
    /// Component type this element belongs to
    pub const fn primitive_type(&self) -> PrimitiveType {
        match self {
            ArrayElement::Boolean(_) => PrimitiveType::Boolean,
            ArrayElement::Byte(_) => PrimitiveType::Byte,
            ArrayElement::Char(_) => PrimitiveType::Char,
            ArrayElement::Short(_) => PrimitiveType::Short,
            ArrayElement::Int(_) => PrimitiveType::Int,
            ArrayElement::Long(_) => PrimitiveType::Long,
            ArrayElement::Float(_) => PrimitiveType::Float,
            ArrayElement::Double(_) => PrimitiveType::Double,
        }
    }

    /// Raw 64-bit bit pattern (floats keep their IEEE bits)
    pub fn to_raw(&self) -> u64 {
        match *self {
            ArrayElement::Boolean(v) => u64::from(v),
            ArrayElement::Byte(v) => u64::from(v as u8),
            ArrayElement::Char(v) => u64::from(v),
            ArrayElement::Short(v) => u64::from(v as u16),
            ArrayElement::Int(v) => u64::from(v as u32),
            ArrayElement::Long(v) => v as u64,
            ArrayElement::Float(v) => u64::from(v.to_bits()),
            ArrayElement::Double(v) => v.to_bits(),
        }
    }

    /// Decode a raw bit pattern for the given component type
    ///
    /// Returns `None` for [`PrimitiveType::Not`] and [`PrimitiveType::Void`].
    ///
    /// # Examples
    ///
    /// ```
    /// use preinit_core::primitive::{ArrayElement, PrimitiveType};
    ///
    /// let raw = ArrayElement::Float(1.5).to_raw();
    /// assert_eq!(ArrayElement::from_raw(PrimitiveType::Float, raw), Some(ArrayElement::Float(1.5)));
    /// assert_eq!(ArrayElement::from_raw(PrimitiveType::Not, raw), None);
    /// ```
    pub fn from_raw(component: PrimitiveType, raw: u64) -> Option<Self> {
        let element = match component {
            PrimitiveType::Boolean => ArrayElement::Boolean(raw as u8),
            PrimitiveType::Byte => ArrayElement::Byte(raw as i8),
            PrimitiveType::Char => ArrayElement::Char(raw as u16),
            PrimitiveType::Short => ArrayElement::Short(raw as i16),
            PrimitiveType::Int => ArrayElement::Int(raw as i32),
            PrimitiveType::Long => ArrayElement::Long(raw as i64),
            PrimitiveType::Float => ArrayElement::Float(f32::from_bits(raw as u32)),
            PrimitiveType::Double => ArrayElement::Double(f64::from_bits(raw)),
            PrimitiveType::Not | PrimitiveType::Void => return None,
        };
        Some(element)
    }

    /// Zero value for a component type
    pub fn zero(component: PrimitiveType) -> Option<Self> {
        Self::from_raw(component, 0)
    }
}
