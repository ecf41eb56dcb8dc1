//! Structure, type and binary format codes of fields and subfields

use strum::{Display, EnumString, IntoStaticStr};

/// Structure class of a field, from the first byte of its field controls
#[derive(Display, IntoStaticStr, EnumString, PartialEq, Eq, Debug, Copy, Clone, Default)]
#[strum(serialize_all = "snake_case")]
pub enum DataStructCode {
    /// Single value without subfields
    #[default]
    Elementary,
    /// One-dimensional group of subfields
    Vector,
    /// Repeating group of subfields
    Array,
    /// Concatenation of other structures
    Concatenated,
}

impl DataStructCode {
    /// Decodes a field control byte, `None` for unknown codes
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            b' ' | b'0' => Some(Self::Elementary),
            b'1' => Some(Self::Vector),
            b'2' => Some(Self::Array),
            b'3' => Some(Self::Concatenated),
            _ => None,
        }
    }

    /// Field control byte written for this class
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Elementary => b'0',
            Self::Vector => b'1',
            Self::Array => b'2',
            Self::Concatenated => b'3',
        }
    }

    /// Name of the structure class
    #[must_use]
    pub fn as_str(self) -> &'static str {
        Into::<&'static str>::into(self)
    }
}

/// Data type class of a field, from the second byte of its field controls
#[derive(Display, IntoStaticStr, EnumString, PartialEq, Eq, Debug, Copy, Clone, Default)]
#[strum(serialize_all = "snake_case")]
pub enum DataTypeCode {
    /// Character data
    #[default]
    CharString,
    /// Implicit point
    ImplicitPoint,
    /// Explicit point
    ExplicitPoint,
    /// Explicit point, scaled
    ExplicitPointScaled,
    /// Character mode bit string
    CharBitString,
    /// Bit string
    BitString,
    /// Mixed data types
    Mixed,
}

impl DataTypeCode {
    /// Decodes a field control byte, `None` for unknown codes
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            b' ' | b'0' => Some(Self::CharString),
            b'1' => Some(Self::ImplicitPoint),
            b'2' => Some(Self::ExplicitPoint),
            b'3' => Some(Self::ExplicitPointScaled),
            b'4' => Some(Self::CharBitString),
            b'5' => Some(Self::BitString),
            b'6' => Some(Self::Mixed),
            _ => None,
        }
    }

    /// Field control byte written for this class
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::CharString => b'0',
            Self::ImplicitPoint => b'1',
            Self::ExplicitPoint => b'2',
            Self::ExplicitPointScaled => b'3',
            Self::CharBitString => b'4',
            Self::BitString => b'5',
            Self::Mixed => b'6',
        }
    }

    /// Name of the data type class
    #[must_use]
    pub fn as_str(self) -> &'static str {
        Into::<&'static str>::into(self)
    }
}

/// Logical type of a subfield value
#[derive(Display, IntoStaticStr, PartialEq, Eq, Debug, Copy, Clone, Default)]
pub enum SubfieldType {
    /// Integer, textual or binary
    Int,
    /// Real number, textual or binary
    Float,
    /// Character data
    #[default]
    String,
    /// Raw bytes
    BinaryString,
}

/// Encoding of a binary subfield, selected by the digit following `b` or `B`
#[derive(Display, IntoStaticStr, PartialEq, Eq, Debug, Copy, Clone, Default)]
pub enum BinaryFormat {
    /// Textual subfield
    #[default]
    NotBinary,
    /// Unsigned integer (`1`)
    UInt,
    /// Signed integer (`2`)
    SInt,
    /// Fixed point real (`3`)
    FpReal,
    /// Floating point real (`4`)
    FloatReal,
    /// Floating point complex (`5`)
    FloatComplex,
}

impl BinaryFormat {
    pub(crate) const fn from_digit(digit: u8) -> Option<Self> {
        match digit {
            b'1' => Some(Self::UInt),
            b'2' => Some(Self::SInt),
            b'3' => Some(Self::FpReal),
            b'4' => Some(Self::FloatReal),
            b'5' => Some(Self::FloatComplex),
            _ => None,
        }
    }
}
