use crate::schema::format;
use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive]
/// Possible `libiso8211` errors
pub enum Error {
    /// Error returned if reading from or writing to the underlying stream fails
    #[error("i/o error")]
    Io(#[from] std::io::Error),
    /// Error returned if the descriptive record leader fails validation
    #[error("file does not appear to be ISO 8211: {reason}")]
    NotIso8211 {
        /// the leader value that failed validation
        reason: &'static str,
    },
    /// Error returned if a leader ends before its 24 bytes
    #[error("leader is short, expected 24 bytes but found {found}")]
    ShortLeader {
        /// number of bytes available
        found: usize,
    },
    /// Error returned if a data record leader holds out-of-range values
    #[error("record leader appears to be corrupt: {reason}")]
    CorruptLeader {
        /// description of the corrupt value
        reason: String,
    },
    /// Error returned if a record ends before the length declared by its leader
    #[error("record is short, expected {expected} bytes but found {found}")]
    ShortRecord {
        /// number of bytes declared
        expected: usize,
        /// number of bytes read
        found: usize,
    },
    /// Error returned if a directory entry points outside its record
    #[error("not enough bytes to initialize field `{tag}`")]
    InvalidDirectory {
        /// tag of the offending directory entry
        tag: String,
    },
    /// Error returned if a data record uses a tag absent from the descriptive record
    #[error("undefined field `{0}` encountered in data record")]
    UndefinedField(String),
    /// Error returned if a field description is shorter than its field control length
    #[error("not enough bytes to initialize field definition `{tag}`")]
    ShortFieldArea {
        /// tag of the field definition
        tag: String,
    },
    /// Error returned if the format controls of a field cannot be expanded
    #[error("invalid format controls")]
    FormatControls(#[from] format::Error),
    /// Error returned if a field lists more subfields than its format controls describe
    #[error("field `{tag}` has {formats} formats for {subfields} subfields")]
    MissingFormats {
        /// tag of the field definition
        tag: String,
        /// number of expanded format tokens
        formats: usize,
        /// number of subfield names
        subfields: usize,
    },
    /// Error returned if a subfield format token is not supported
    #[error("format `{format}` of subfield `{name}` is not supported")]
    SubfieldFormat {
        /// subfield name
        name: String,
        /// offending format token
        format: String,
    },
    /// Error returned if a record has no field with the given tag
    #[error("field `{0}` not found in record")]
    FieldNotFound(String),
    /// Error returned if a field definition has no subfield with the given name
    #[error("subfield `{name}` not found in field `{tag}`")]
    SubfieldNotFound {
        /// tag of the field definition
        tag: String,
        /// requested subfield name
        name: String,
    },
    /// Error returned if a field repetition is out of range
    #[error("repetition {instance} of field `{tag}` is out of range")]
    InstanceOutOfRange {
        /// tag of the field
        tag: String,
        /// requested repetition
        instance: usize,
    },
    /// Error returned if a value does not fit its fixed-width subfield
    #[error("value `{value}` does not fit in the {width} bytes of subfield `{name}`")]
    ValueTooWide {
        /// subfield name
        name: String,
        /// textual form of the value
        value: String,
        /// subfield width
        width: usize,
    },
    /// Error returned if a length or position does not fit its decimal width
    #[error("{what} {value} does not fit in {digits} digits")]
    NumberOverflow {
        /// which number overflowed
        what: &'static str,
        /// the number
        value: usize,
        /// available digits
        digits: usize,
    },
    /// Error returned if a tag does not match the module tag width
    #[error("tag `{tag}` must be {width} bytes long")]
    InvalidTag {
        /// offending tag
        tag: String,
        /// tag width of the module
        width: usize,
    },
}

/// Result type used throughout `libiso8211`
pub type Result<T, E = Error> = std::result::Result<T, E>;
