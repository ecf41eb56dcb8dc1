use tracing::warn;

use super::codes::{BinaryFormat, SubfieldType};
use crate::{
    error::{Error, Result},
    scan::{scan_float, scan_int, scan_usize},
    FIELD_TERMINATOR, UNIT_TERMINATOR,
};

/// Definition of one named, typed component of a field
///
/// Subfields are either fixed width, or variable width and terminated by a unit
/// terminator (or the field terminator for the last subfield of a field).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubfieldDefn {
    name: String,
    format: String,
    subfield_type: SubfieldType,
    binary_format: BinaryFormat,
    big_endian: bool,
    variable: bool,
    width: usize,
}

impl Default for SubfieldDefn {
    fn default() -> Self {
        Self {
            name: String::new(),
            format: String::new(),
            subfield_type: SubfieldType::String,
            binary_format: BinaryFormat::NotBinary,
            big_endian: false,
            variable: true,
            width: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Number {
    Int(i64),
    Float(f64),
}

fn take_array<const N: usize>(bytes: &[u8]) -> Option<[u8; N]> {
    bytes.get(..N)?.try_into().ok()
}

macro_rules! decode {
    ($ty:ty, $bytes:expr, $big_endian:expr) => {{
        let raw = take_array::<{ std::mem::size_of::<$ty>() }>($bytes)?;
        if $big_endian {
            <$ty>::from_be_bytes(raw)
        } else {
            <$ty>::from_le_bytes(raw)
        }
    }};
}

macro_rules! encode {
    ($value:expr, $big_endian:expr) => {{
        let value = $value;
        if $big_endian {
            value.to_be_bytes().to_vec()
        } else {
            value.to_le_bytes().to_vec()
        }
    }};
}

impl SubfieldDefn {
    /// Creates a subfield definition from a name and a format token such as `A(12)`
    ///
    /// # Errors
    ///
    /// See [`Self::set_format`]
    pub fn new(name: &str, format: &str) -> Result<Self> {
        let mut defn = Self::default();
        defn.set_name(name);
        defn.set_format(format)?;
        Ok(defn)
    }

    /// Sets the subfield mnemonic, dropping trailing blanks
    pub fn set_name(&mut self, name: &str) {
        self.name = name.trim_end_matches(' ').to_owned();
    }

    /// Parses a format token of the form `[A|C|S|I|R|B|b][(width)]`
    ///
    /// `A`, `C` and `S` are character data, `I` integers and `R` reals, all variable width
    /// unless a width is given. `B(n)` is a bit string of `n` bits. `B` or `b` followed by
    /// a digit from 1 to 5 is a binary number whose byte width follows the digit, stored
    /// most significant byte first for `B` and least significant byte first for `b`.
    ///
    /// # Errors
    ///
    /// This function errors with [`Error::SubfieldFormat`] on an unknown leading type
    /// character, on the unsupported `X` format, or on a malformed binary width
    pub fn set_format(&mut self, format: &str) -> Result<()> {
        self.format = format.to_owned();
        self.binary_format = BinaryFormat::NotBinary;
        self.big_endian = false;

        let bytes = format.as_bytes();
        if bytes.get(1) == Some(&b'(') {
            self.width = scan_usize(&bytes[2..], bytes.len() - 2);
            self.variable = self.width == 0;
        } else {
            self.width = 0;
            self.variable = true;
        }

        match bytes.first() {
            Some(b'A' | b'C' | b'S') => self.subfield_type = SubfieldType::String,
            Some(b'R') => self.subfield_type = SubfieldType::Float,
            Some(b'I') => self.subfield_type = SubfieldType::Int,
            Some(&lead @ (b'B' | b'b')) => self.set_binary_format(lead == b'B', &bytes[1..])?,
            _ => return Err(self.unsupported()),
        }
        Ok(())
    }

    fn set_binary_format(&mut self, big_endian: bool, code: &[u8]) -> Result<()> {
        self.variable = false;
        self.big_endian = big_endian;
        match code.first() {
            Some(b'(') => {
                let bits = scan_usize(&code[1..], code.len() - 1);
                if bits == 0 || bits % 8 != 0 {
                    return Err(self.unsupported());
                }
                self.width = bits / 8;
                self.binary_format = BinaryFormat::SInt;
                self.subfield_type = if self.width < 5 {
                    SubfieldType::Int
                } else {
                    SubfieldType::BinaryString
                };
            }
            Some(&digit) => {
                let binary_format =
                    BinaryFormat::from_digit(digit).ok_or_else(|| self.unsupported())?;
                self.width = scan_usize(&code[1..], code.len() - 1);
                if self.width == 0 {
                    return Err(self.unsupported());
                }
                self.binary_format = binary_format;
                self.subfield_type = match binary_format {
                    BinaryFormat::UInt | BinaryFormat::SInt => SubfieldType::Int,
                    _ => SubfieldType::Float,
                };
            }
            None => return Err(self.unsupported()),
        }
        Ok(())
    }

    fn unsupported(&self) -> Error {
        Error::SubfieldFormat {
            name: self.name.clone(),
            format: self.format.clone(),
        }
    }

    /// Subfield mnemonic
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Format token, as found in the expanded format controls
    #[must_use]
    pub fn format(&self) -> &str {
        &self.format
    }

    /// Logical value type
    #[must_use]
    pub const fn subfield_type(&self) -> SubfieldType {
        self.subfield_type
    }

    /// Binary encoding, [`BinaryFormat::NotBinary`] for textual subfields
    #[must_use]
    pub const fn binary_format(&self) -> BinaryFormat {
        self.binary_format
    }

    /// Whether binary values are stored most significant byte first
    #[must_use]
    pub const fn is_big_endian(&self) -> bool {
        self.big_endian
    }

    /// Whether the subfield is delimiter terminated rather than fixed width
    #[must_use]
    pub const fn is_variable(&self) -> bool {
        self.variable
    }

    /// Fixed byte width, 0 for variable subfields
    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Locates the value at the start of `data` without decoding it
    ///
    /// Returns the value length and the number of bytes consumed, which includes the
    /// terminating delimiter of variable subfields. A variable subfield in a field that
    /// ends with a delimiter followed by a NUL byte is treated as double-byte text.
    #[must_use]
    pub fn data_length(&self, data: &[u8]) -> (usize, usize) {
        let max = data.len();
        if !self.variable {
            if self.width > max {
                warn!(
                    "Only {max} bytes available for subfield {} with format {}",
                    self.name, self.format
                );
                return (max, max);
            }
            return (self.width, self.width);
        }

        let is_delimiter = |b: u8| b == UNIT_TERMINATOR || b == FIELD_TERMINATOR;
        let double_byte = max > 1 && is_delimiter(data[max - 2]) && data[max - 1] == 0;

        let mut length = 0;
        let mut extra = 0;
        while length < max {
            if double_byte {
                if length > 0 && is_delimiter(data[length - 1]) && data[length] == 0 {
                    // a field terminator right after the pair belongs to this value
                    if data.get(length + 1) == Some(&FIELD_TERMINATOR) {
                        extra += 1;
                    }
                    break;
                }
            } else if is_delimiter(data[length]) {
                break;
            }
            length += 1;
        }

        let consumed = if max == 0 { 0 } else { length + extra + 1 };
        (length, consumed)
    }

    /// Extracts the raw value bytes at the start of `data`, with the bytes consumed
    #[must_use]
    pub fn extract_string_data<'a>(&self, data: &'a [u8]) -> (&'a [u8], usize) {
        let (length, consumed) = self.data_length(data);
        (&data[..length], consumed)
    }

    fn binary_number(&self, data: &[u8]) -> Option<Number> {
        let big_endian = self.big_endian;
        let number = match (self.binary_format, self.width) {
            (BinaryFormat::UInt, 1) => Number::Int(i64::from(decode!(u8, data, big_endian))),
            (BinaryFormat::UInt, 2) => Number::Int(i64::from(decode!(u16, data, big_endian))),
            (BinaryFormat::UInt, 4) => Number::Int(i64::from(decode!(u32, data, big_endian))),
            (BinaryFormat::SInt, 1) => Number::Int(i64::from(decode!(i8, data, big_endian))),
            (BinaryFormat::SInt, 2) => Number::Int(i64::from(decode!(i16, data, big_endian))),
            (BinaryFormat::SInt, 4) => Number::Int(i64::from(decode!(i32, data, big_endian))),
            (BinaryFormat::FloatReal, 4) => {
                Number::Float(f64::from(decode!(f32, data, big_endian)))
            }
            (BinaryFormat::FloatReal, 8) => Number::Float(decode!(f64, data, big_endian)),
            _ => return None,
        };
        Some(number)
    }

    fn extract_number(&self, data: &[u8]) -> Option<(Number, usize)> {
        if self.width > data.len() {
            warn!(
                "Attempt to extract subfield {} with format {} requiring {} bytes, but only {} available",
                self.name,
                self.format,
                self.width,
                data.len()
            );
            return None;
        }
        let Some(number) = self.binary_number(data) else {
            warn!(
                "Binary format {} of width {} in subfield {} cannot be decoded",
                self.binary_format, self.width, self.name
            );
            return None;
        };
        Some((number, self.width))
    }

    /// Decodes an integer value at the start of `data`, with the bytes consumed
    ///
    /// Zero bytes consumed means no value could be extracted.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn extract_int_data(&self, data: &[u8]) -> (i64, usize) {
        if self.binary_format == BinaryFormat::NotBinary {
            let (text, consumed) = self.extract_string_data(data);
            return (scan_int(text, text.len()), consumed);
        }
        match self.extract_number(data) {
            Some((Number::Int(value), consumed)) => (value, consumed),
            Some((Number::Float(value), consumed)) => (value as i64, consumed),
            None => (0, 0),
        }
    }

    /// Decodes a real value at the start of `data`, with the bytes consumed
    ///
    /// Zero bytes consumed means no value could be extracted.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn extract_float_data(&self, data: &[u8]) -> (f64, usize) {
        if self.binary_format == BinaryFormat::NotBinary {
            let (text, consumed) = self.extract_string_data(data);
            return (scan_float(text, text.len()), consumed);
        }
        match self.extract_number(data) {
            Some((Number::Int(value), consumed)) => (value as f64, consumed),
            Some((Number::Float(value), consumed)) => (value, consumed),
            None => (0.0, 0),
        }
    }

    /// Bytes of an empty value
    ///
    /// Variable subfields hold a lone unit terminator. Fixed subfields are filled with
    /// `0` for numbers, blanks for text and NUL bytes for binary data.
    #[must_use]
    pub fn default_value(&self) -> Vec<u8> {
        if self.variable {
            return vec![UNIT_TERMINATOR];
        }
        let fill = if self.binary_format != BinaryFormat::NotBinary {
            0
        } else if matches!(self.subfield_type, SubfieldType::Int | SubfieldType::Float) {
            b'0'
        } else {
            b' '
        };
        vec![fill; self.width]
    }

    /// Encodes raw bytes as a value of this subfield
    ///
    /// Variable values are followed by a unit terminator. Fixed values are padded with
    /// blanks (NUL bytes for binary subfields) or truncated to the subfield width.
    #[must_use]
    pub fn format_string_value(&self, value: &[u8]) -> Vec<u8> {
        if self.variable {
            let mut out = Vec::with_capacity(value.len() + 1);
            out.extend_from_slice(value);
            out.push(UNIT_TERMINATOR);
            return out;
        }
        let fill = if self.binary_format == BinaryFormat::NotBinary {
            b' '
        } else {
            0
        };
        if value.len() > self.width {
            warn!(
                "Value of {} bytes truncated to the {} bytes of subfield {}",
                value.len(),
                self.width,
                self.name
            );
        }
        let mut out = vec![fill; self.width];
        let n = value.len().min(self.width);
        out[..n].copy_from_slice(&value[..n]);
        out
    }

    /// Encodes an integer as a value of this subfield
    ///
    /// # Errors
    ///
    /// This function errors if the value does not fit a fixed textual width, or if the
    /// binary format of the subfield cannot hold integers
    pub fn format_int_value(&self, value: i64) -> Result<Vec<u8>> {
        if self.binary_format == BinaryFormat::NotBinary {
            let text = if self.variable {
                value.to_string()
            } else {
                format!("{value:0width$}", width = self.width)
            };
            return self.finish_text(text);
        }
        self.encode_binary(Number::Int(value))
    }

    /// Encodes a real number as a value of this subfield
    ///
    /// # Errors
    ///
    /// This function errors if the value does not fit a fixed textual width, or if the
    /// binary format of the subfield cannot be written
    pub fn format_float_value(&self, value: f64) -> Result<Vec<u8>> {
        if self.binary_format == BinaryFormat::NotBinary {
            let text = if self.variable {
                value.to_string()
            } else {
                format!("{value:0width$}", width = self.width)
            };
            return self.finish_text(text);
        }
        self.encode_binary(Number::Float(value))
    }

    fn finish_text(&self, text: String) -> Result<Vec<u8>> {
        if self.variable {
            let mut out = text.into_bytes();
            out.push(UNIT_TERMINATOR);
            return Ok(out);
        }
        if text.len() > self.width {
            return Err(Error::ValueTooWide {
                name: self.name.clone(),
                value: text,
                width: self.width,
            });
        }
        Ok(text.into_bytes())
    }

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn encode_binary(&self, number: Number) -> Result<Vec<u8>> {
        let (int, float) = match number {
            Number::Int(value) => (value, value as f64),
            Number::Float(value) => (value as i64, value),
        };
        let big_endian = self.big_endian;
        let out = match (self.binary_format, self.width) {
            (BinaryFormat::UInt, 1) => vec![int as u8],
            (BinaryFormat::UInt, 2) => encode!(int as u16, big_endian),
            (BinaryFormat::UInt, 4) => encode!(int as u32, big_endian),
            (BinaryFormat::SInt, 1) => encode!(int as i8, big_endian),
            (BinaryFormat::SInt, 2) => encode!(int as i16, big_endian),
            (BinaryFormat::SInt, 4) => encode!(int as i32, big_endian),
            (BinaryFormat::FloatReal, 4) => encode!(float as f32, big_endian),
            (BinaryFormat::FloatReal, 8) => encode!(float, big_endian),
            _ => return Err(self.unsupported()),
        };
        Ok(out)
    }
}
