use bon::Builder;
use nom::{
    bytes::complete::take,
    number::complete::u8 as byte,
    sequence::tuple,
    IResult,
};

use crate::{
    error::{Error, Result},
    scan::scan_usize,
    LEADER_SIZE,
};

/// Largest record length accepted from a data record leader
const MAX_RECORD_LENGTH: usize = 100_000_000;
/// Largest field area start accepted from a data record leader
const MAX_FIELD_AREA_START: usize = 100_000;

/// The fixed 24 byte preamble of every ISO 8211 record
///
/// Values are kept as decoded numbers and raw bytes. The builder defaults are the
/// conventional values of a data descriptive record, and are used as-is when creating
/// new files.
///
/// ```"not rust"
/// 0..5    record length
/// 5       interchange level
/// 6       leader identifier (L, D or R)
/// 7       in-line code extension indicator
/// 8       version
/// 9       application indicator
/// 10..12  field control length
/// 12..17  base address of field area
/// 17..20  extended character set indicator
/// 20..24  size of field length, size of field position, reserved, size of field tag
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
#[non_exhaustive]
pub struct Leader {
    /// Total record length in bytes, leader included
    #[builder(default)]
    pub record_length: usize,
    /// Interchange level (`1`, `2` or `3`)
    #[builder(default = b'3')]
    pub interchange_level: u8,
    /// Leader identifier: `L` for the descriptive record, `D` or `R` for data records
    #[builder(default = b'L')]
    pub leader_id: u8,
    /// In-line code extension indicator
    #[builder(default = b'E')]
    pub inline_code_extension: u8,
    /// Version number
    #[builder(default = b'1')]
    pub version: u8,
    /// Application indicator
    #[builder(default = b' ')]
    pub app_indicator: u8,
    /// Length of the field controls preceding each field description
    #[builder(default = 9)]
    pub field_control_length: usize,
    /// Offset of the field area from the start of the record
    #[builder(default)]
    pub field_area_start: usize,
    /// Extended character set indicator
    #[builder(default = *b" ! ")]
    pub extended_charset: [u8; 3],
    /// Number of digits of the length part of a directory entry
    #[builder(default = 3)]
    pub size_field_length: usize,
    /// Number of digits of the position part of a directory entry
    #[builder(default = 4)]
    pub size_field_pos: usize,
    /// Number of characters of the tag part of a directory entry
    #[builder(default = 4)]
    pub size_field_tag: usize,
}

impl Default for Leader {
    fn default() -> Self {
        Self::builder().build()
    }
}

fn size_digit(b: u8) -> usize {
    char::from(b)
        .to_digit(10)
        .and_then(|d| usize::try_from(d).ok())
        .unwrap_or(0)
}

fn leader(input: &[u8]) -> IResult<&[u8], Leader> {
    let (
        input,
        (
            record_length,
            interchange_level,
            leader_id,
            inline_code_extension,
            version,
            app_indicator,
            field_control_length,
            field_area_start,
            extended_charset,
            size_field_length,
            size_field_pos,
            _reserved,
            size_field_tag,
        ),
    ) = tuple((
        take(5usize),
        byte,
        byte,
        byte,
        byte,
        byte,
        take(2usize),
        take(5usize),
        tuple((byte, byte, byte)),
        byte,
        byte,
        byte,
        byte,
    ))(input)?;
    let (c0, c1, c2) = extended_charset;
    Ok((
        input,
        Leader {
            record_length: scan_usize(record_length, 5),
            interchange_level,
            leader_id,
            inline_code_extension,
            version,
            app_indicator,
            field_control_length: scan_usize(field_control_length, 2),
            field_area_start: scan_usize(field_area_start, 5),
            extended_charset: [c0, c1, c2],
            size_field_length: size_digit(size_field_length),
            size_field_pos: size_digit(size_field_pos),
            size_field_tag: size_digit(size_field_tag),
        },
    ))
}

/// Appends `value` zero padded to `digits` decimal digits
pub(crate) fn push_decimal(
    out: &mut Vec<u8>,
    what: &'static str,
    value: usize,
    digits: usize,
) -> Result<()> {
    let text = format!("{value:0digits$}");
    if text.len() > digits {
        return Err(Error::NumberOverflow {
            what,
            value,
            digits,
        });
    }
    out.extend_from_slice(text.as_bytes());
    Ok(())
}

impl Leader {
    /// Decodes a leader from the first 24 bytes of `bytes`, without validating it
    ///
    /// # Errors
    ///
    /// This function errors if fewer than 24 bytes are available
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        leader(bytes)
            .map(|(_, leader)| leader)
            .map_err(|_| Error::ShortLeader { found: bytes.len() })
    }

    /// Width of one directory entry
    #[must_use]
    pub const fn entry_width(&self) -> usize {
        self.size_field_length + self.size_field_pos + self.size_field_tag
    }

    /// Checks the leader of a data descriptive record
    ///
    /// # Errors
    ///
    /// This function errors with [`Error::NotIso8211`] if the raw leader holds
    /// non-printable characters or values that no descriptive record can have
    pub(crate) fn validate_descriptive(&self, raw: &[u8]) -> Result<()> {
        let reason = if raw.len() < LEADER_SIZE {
            Some("leader is short")
        } else if raw[..LEADER_SIZE].iter().any(|b| !(32..=126).contains(b)) {
            Some("leader holds non-printable characters")
        } else if !matches!(self.interchange_level, b'1' | b'2' | b'3') {
            Some("interchange level is not 1, 2 or 3")
        } else if self.leader_id != b'L' {
            Some("leader identifier is not L")
        } else if !matches!(self.version, b'1' | b' ') {
            Some("version is not 1")
        } else if self.record_length < LEADER_SIZE {
            Some("record length is smaller than the leader")
        } else if self.field_control_length == 0 {
            Some("field control length is zero")
        } else if self.field_area_start < LEADER_SIZE {
            Some("field area starts inside the leader")
        } else if self.size_field_length == 0 || self.size_field_pos == 0 || self.size_field_tag == 0 {
            Some("directory entry sizes are zero")
        } else {
            None
        };
        reason.map_or(Ok(()), |reason| Err(Error::NotIso8211 { reason }))
    }

    /// Checks the leader of a data record
    ///
    /// A record length of zero is allowed and selects the streamed record variant.
    ///
    /// # Errors
    ///
    /// This function errors with [`Error::CorruptLeader`] on out-of-range values
    pub(crate) fn validate_data(&self) -> Result<()> {
        let sizes = [self.size_field_length, self.size_field_pos, self.size_field_tag];
        if sizes.iter().any(|s| !(1..=9).contains(s)) {
            return Err(Error::CorruptLeader {
                reason: format!("directory entry sizes {sizes:?} are out of range"),
            });
        }
        if (self.record_length <= LEADER_SIZE || self.record_length > MAX_RECORD_LENGTH)
            && self.record_length != 0
        {
            return Err(Error::CorruptLeader {
                reason: format!("record length {} is out of range", self.record_length),
            });
        }
        if !(LEADER_SIZE..=MAX_FIELD_AREA_START).contains(&self.field_area_start) {
            return Err(Error::CorruptLeader {
                reason: format!("field area start {} is out of range", self.field_area_start),
            });
        }
        Ok(())
    }

    /// Encodes the leader into its 24 byte form
    ///
    /// A field control length of zero is written as blanks, as data records do.
    ///
    /// # Errors
    ///
    /// This function errors if a number does not fit its leader position
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(LEADER_SIZE);
        push_decimal(&mut out, "record length", self.record_length, 5)?;
        out.extend_from_slice(&[
            self.interchange_level,
            self.leader_id,
            self.inline_code_extension,
            self.version,
            self.app_indicator,
        ]);
        if self.field_control_length == 0 {
            out.extend_from_slice(b"  ");
        } else {
            push_decimal(&mut out, "field control length", self.field_control_length, 2)?;
        }
        push_decimal(&mut out, "field area start", self.field_area_start, 5)?;
        out.extend_from_slice(&self.extended_charset);
        push_decimal(&mut out, "size of field length", self.size_field_length, 1)?;
        push_decimal(&mut out, "size of field position", self.size_field_pos, 1)?;
        out.push(b'0');
        push_decimal(&mut out, "size of field tag", self.size_field_tag, 1)?;
        Ok(out)
    }
}
