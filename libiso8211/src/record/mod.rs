use std::{
    borrow::Cow,
    io::{Read, Seek, SeekFrom},
    sync::Arc,
};

use tracing::{debug, trace};

use crate::{
    error::{Error, Result},
    leader::Leader,
    scan::scan_usize,
    schema::{FieldDefn, FieldDefns},
    FIELD_TERMINATOR, LEADER_SIZE,
};

mod edit;
mod field;

pub use field::Field;

/// Most directory entries accepted in a zero-length record
const MAX_STREAMED_FIELDS: usize = 1000;

/// Position of one field occurrence within the record bytes
#[derive(Debug, Clone)]
struct Slot {
    defn: Arc<FieldDefn>,
    start: usize,
    len: usize,
}

/// One data record: a directory and the bytes of the fields it lists
///
/// Records read from a module share their field definitions with it, so a cloned record
/// stays valid after the module reads on or is dropped.
#[derive(Debug, Clone)]
pub struct Record {
    /// Record bytes after the leader, directory first
    data: Vec<u8>,
    /// Start of the field area within `data`
    field_offset: usize,
    slots: Vec<Slot>,
    reuse_header: bool,
    size_field_length: usize,
    size_field_pos: usize,
    size_field_tag: usize,
}

/// Reads until `buf` is full or the stream ends, returning the number of bytes read
pub(crate) fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

fn ends_with_terminator(data: &[u8]) -> bool {
    matches!(data, [.., FIELD_TERMINATOR] | [.., FIELD_TERMINATOR, _])
}

impl Record {
    /// Reads the next data record, `None` at a clean end of file
    pub(crate) fn read<R: Read + Seek>(reader: &mut R, defns: &FieldDefns) -> Result<Option<Self>> {
        let mut raw = [0u8; LEADER_SIZE];
        let found = read_full(reader, &mut raw)?;
        if found == 0 {
            return Ok(None);
        }
        if found < LEADER_SIZE {
            return Err(Error::ShortLeader { found });
        }
        let leader = Leader::parse(&raw)?;
        leader.validate_data()?;
        trace!("Read data record leader {:?}", String::from_utf8_lossy(&raw));

        let mut record = Self {
            data: Vec::new(),
            field_offset: leader.field_area_start - LEADER_SIZE,
            slots: Vec::new(),
            reuse_header: leader.leader_id == b'R',
            size_field_length: leader.size_field_length,
            size_field_pos: leader.size_field_pos,
            size_field_tag: leader.size_field_tag,
        };
        if leader.record_length == 0 {
            record.read_streamed(reader)?;
        } else {
            record.read_sized(reader, leader.record_length - LEADER_SIZE)?;
        }
        record.parse_directory(defns)?;
        Ok(Some(record))
    }

    fn read_sized(&mut self, reader: &mut impl Read, size: usize) -> Result<()> {
        let mut data = vec![0; size];
        let found = read_full(reader, &mut data)?;
        if found < size {
            return Err(Error::ShortRecord {
                expected: size,
                found,
            });
        }
        while !ends_with_terminator(&data) {
            debug!("Record does not end with a field terminator, reading one more byte");
            let mut byte = [0u8];
            if read_full(reader, &mut byte)? == 0 {
                return Err(Error::ShortRecord {
                    expected: data.len() + 1,
                    found: data.len(),
                });
            }
            data.push(byte[0]);
        }
        self.data = data;
        Ok(())
    }

    /// Reads a record whose leader declares a length of zero
    ///
    /// The directory is read one entry at a time up to its terminator, then each field is
    /// read using the lengths the directory lists.
    fn read_streamed<R: Read + Seek>(&mut self, reader: &mut R) -> Result<()> {
        debug!("Record with zero length, reading directory entries one at a time");
        let width = self.entry_width();
        let mut data = Vec::new();
        let mut entry = vec![0; width];
        let mut lengths = Vec::new();
        loop {
            let found = read_full(reader, &mut entry)?;
            if found < width {
                return Err(Error::ShortRecord {
                    expected: data.len() + width,
                    found: data.len() + found,
                });
            }
            data.extend_from_slice(&entry);
            if entry[0] == FIELD_TERMINATOR {
                break;
            }
            if lengths.len() == MAX_STREAMED_FIELDS {
                return Err(Error::CorruptLeader {
                    reason: format!("more than {MAX_STREAMED_FIELDS} fields in a zero-length record"),
                });
            }
            lengths.push(scan_usize(&entry[self.size_field_tag..], self.size_field_length));
        }

        // only the terminator of the last entry belongs to the directory
        let overshoot = width - 1;
        reader.seek(SeekFrom::Current(-i64::try_from(overshoot).unwrap_or(0)))?;
        data.truncate(data.len() - overshoot);

        for length in lengths {
            let start = data.len();
            data.resize(start + length, 0);
            let found = read_full(reader, &mut data[start..])?;
            if found < length {
                return Err(Error::ShortRecord {
                    expected: start + length,
                    found: start + found,
                });
            }
        }
        self.data = data;
        Ok(())
    }

    /// Overlays the next leader-less record on the field area of this one
    ///
    /// Returns `false` at a clean end of file.
    pub(crate) fn reread(&mut self, reader: &mut impl Read) -> Result<bool> {
        let area = &mut self.data[self.field_offset..];
        let expected = area.len();
        let found = read_full(reader, area)?;
        if found == 0 && expected > 0 {
            return Ok(false);
        }
        if found < expected {
            return Err(Error::ShortRecord { expected, found });
        }
        Ok(true)
    }

    fn parse_directory(&mut self, defns: &FieldDefns) -> Result<()> {
        let size = self.data.len();
        if self.field_offset >= size {
            return Err(Error::CorruptLeader {
                reason: format!(
                    "field area starts at {} in a record of {size} bytes",
                    self.field_offset
                ),
            });
        }

        let width = self.entry_width();
        let mut entries = 0;
        while (entries + 1) * width <= size && self.data[entries * width] != FIELD_TERMINATOR {
            entries += 1;
        }

        let mut slots = Vec::with_capacity(entries);
        for entry in self.data.chunks_exact(width).take(entries) {
            let (tag, rest) = entry.split_at(self.size_field_tag);
            let tag = String::from_utf8_lossy(tag);
            let len = scan_usize(rest, self.size_field_length);
            let pos = scan_usize(&rest[self.size_field_length..], self.size_field_pos);

            let defn = defns
                .find(&tag)
                .ok_or_else(|| Error::UndefinedField(tag.to_string()))?;
            let start = self.field_offset + pos;
            if start > size || size - start < len {
                return Err(Error::InvalidDirectory {
                    tag: tag.into_owned(),
                });
            }
            slots.push(Slot {
                defn: Arc::clone(defn),
                start,
                len,
            });
        }
        trace!("Record directory lists {} fields", slots.len());
        self.slots = slots;
        Ok(())
    }

    const fn entry_width(&self) -> usize {
        self.size_field_length + self.size_field_pos + self.size_field_tag
    }

    /// Whether the following records omit their leader and directory
    #[must_use]
    pub const fn reuses_header(&self) -> bool {
        self.reuse_header
    }

    /// Record bytes following the leader, directory included
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Number of fields in the record
    #[must_use]
    pub fn field_count(&self) -> usize {
        self.slots.len()
    }

    fn view<'a>(&'a self, slot: &'a Slot) -> Field<'a> {
        Field::new(&slot.defn, &self.data[slot.start..slot.start + slot.len])
    }

    /// Field by directory order
    #[must_use]
    pub fn field(&self, index: usize) -> Option<Field<'_>> {
        self.slots.get(index).map(|slot| self.view(slot))
    }

    /// Iterates over the fields in directory order
    pub fn fields(&self) -> impl Iterator<Item = Field<'_>> + '_ {
        self.slots.iter().map(|slot| self.view(slot))
    }

    pub(crate) fn find_field_index(&self, tag: &str, instance: usize) -> Option<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.defn.tag().eq_ignore_ascii_case(tag))
            .nth(instance)
            .map(|(i, _)| i)
    }

    /// The `instance`-th occurrence of the field tagged `tag`
    #[must_use]
    pub fn find_field(&self, tag: &str, instance: usize) -> Option<Field<'_>> {
        self.find_field_index(tag, instance)
            .and_then(|i| self.field(i))
    }

    /// Integer value of a subfield
    ///
    /// `field_instance` selects among fields sharing a tag, `repetition` among the
    /// repetitions of a repeating subfield group. Missing fields, subfields and
    /// repetitions yield `None`.
    #[must_use]
    pub fn int_subfield(
        &self,
        tag: &str,
        field_instance: usize,
        name: &str,
        repetition: usize,
    ) -> Option<i64> {
        self.find_field(tag, field_instance)?
            .int_subfield(name, repetition)
    }

    /// Real value of a subfield, see [`Self::int_subfield`]
    #[must_use]
    pub fn float_subfield(
        &self,
        tag: &str,
        field_instance: usize,
        name: &str,
        repetition: usize,
    ) -> Option<f64> {
        self.find_field(tag, field_instance)?
            .float_subfield(name, repetition)
    }

    /// Text of a subfield, see [`Self::int_subfield`]
    #[must_use]
    pub fn string_subfield(
        &self,
        tag: &str,
        field_instance: usize,
        name: &str,
        repetition: usize,
    ) -> Option<Cow<'_, str>> {
        self.find_field(tag, field_instance)?
            .string_subfield(name, repetition)
    }

    /// Copies the record, binding every field to the like-tagged definition of `defns`
    ///
    /// Returns `None` if `defns` lacks one of the tags.
    #[must_use]
    pub fn clone_on(&self, defns: &FieldDefns) -> Option<Self> {
        let slots = self
            .slots
            .iter()
            .map(|slot| {
                defns.find(slot.defn.tag()).map(|defn| Slot {
                    defn: Arc::clone(defn),
                    ..slot.clone()
                })
            })
            .collect::<Option<Vec<_>>>()?;
        Some(Self {
            slots,
            ..self.clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::schema::codes::{DataStructCode, DataTypeCode};

    fn defns() -> FieldDefns {
        [
            FieldDefn::builder()
                .tag("0001")
                .build()
                .unwrap(),
            FieldDefn::builder()
                .tag("DSID")
                .array_descr("RCNM!RCID!NAME")
                .format_controls("(A(2),I(5),A)")
                .data_struct_code(DataStructCode::Vector)
                .data_type_code(DataTypeCode::Mixed)
                .build()
                .unwrap(),
        ]
        .into_iter()
        .collect()
    }

    fn record_bytes(leader_id: u8, record_length: Option<usize>, tail: &[u8]) -> Vec<u8> {
        // directory: 0001 len 3 pos 0, DSID len 11 pos 3
        let mut body = b"0001003000DSID011003".to_vec();
        body.push(FIELD_TERMINATOR);
        body.extend_from_slice(b"42\x1e");
        body.extend_from_slice(b"DS00007ab\x1f\x1e");
        body.extend_from_slice(tail);
        let length = record_length.unwrap_or(LEADER_SIZE + body.len());
        let mut out = format!("{length:05} {}     {:05}   3304", char::from(leader_id), LEADER_SIZE + 21)
            .into_bytes();
        out.extend_from_slice(&body);
        out
    }

    #[test]
    fn reads_record_fields() {
        let defns = defns();
        let mut cursor = Cursor::new(record_bytes(b'D', None, b""));
        let record = Record::read(&mut cursor, &defns).unwrap().unwrap();
        assert_eq!(record.field_count(), 2);
        assert!(!record.reuses_header());
        assert_eq!(record.field(0).unwrap().data(), b"42\x1e");
        assert_eq!(record.string_subfield("DSID", 0, "RCNM", 0).unwrap(), "DS");
        assert_eq!(record.int_subfield("dsid", 0, "RCID", 0), Some(7));
        assert_eq!(record.string_subfield("DSID", 0, "NAME", 0).unwrap(), "ab");
        assert!(record.find_field("DSID", 1).is_none());
        assert!(record.int_subfield("VRID", 0, "RCID", 0).is_none());
        assert_eq!(
            record.fields().map(|f| f.tag()).collect::<Vec<_>>(),
            ["0001", "DSID"]
        );
        assert!(Record::read(&mut cursor, &defns).unwrap().is_none());
    }

    #[test]
    fn reads_extra_bytes_up_to_field_terminator() {
        let defns = defns();
        let bytes = record_bytes(b'D', Some(LEADER_SIZE + 33), b"");
        let mut cursor = Cursor::new(bytes);
        let record = Record::read(&mut cursor, &defns).unwrap().unwrap();
        assert_eq!(record.data().len(), 35);
    }

    #[test]
    fn short_records_fail() {
        let defns = defns();
        let bytes = record_bytes(b'D', None, b"");
        let mut cursor = Cursor::new(bytes[..30].to_vec());
        assert!(matches!(
            Record::read(&mut cursor, &defns),
            Err(Error::ShortRecord { .. })
        ));
        let mut cursor = Cursor::new(bytes[..10].to_vec());
        assert!(matches!(
            Record::read(&mut cursor, &defns),
            Err(Error::ShortLeader { found: 10 })
        ));
    }

    #[test]
    fn undefined_tag_fails() {
        let defns: FieldDefns = [FieldDefn::builder().tag("0001").build().unwrap()]
            .into_iter()
            .collect();
        let mut cursor = Cursor::new(record_bytes(b'D', None, b""));
        assert!(matches!(
            Record::read(&mut cursor, &defns),
            Err(Error::UndefinedField(tag)) if tag == "DSID"
        ));
    }

    #[test]
    fn zero_length_record_is_streamed() {
        let defns = defns();
        let mut bytes = record_bytes(b'D', Some(0), b"");
        bytes.extend_from_slice(b"trailing");
        let mut cursor = Cursor::new(bytes);
        let record = Record::read(&mut cursor, &defns).unwrap().unwrap();
        assert_eq!(record.field_count(), 2);
        assert_eq!(record.string_subfield("DSID", 0, "NAME", 0).unwrap(), "ab");
        let mut rest = Vec::new();
        cursor.read_to_end(&mut rest).unwrap();
        assert_eq!(rest, b"trailing");
    }

    #[test]
    fn reused_header_overlays_field_area() {
        let defns = defns();
        let mut bytes = record_bytes(b'R', None, b"");
        bytes.extend_from_slice(b"17\x1eDS00009cd\x1f\x1e");
        let mut cursor = Cursor::new(bytes);
        let mut record = Record::read(&mut cursor, &defns).unwrap().unwrap();
        assert!(record.reuses_header());
        assert!(record.reread(&mut cursor).unwrap());
        assert_eq!(record.int_subfield("DSID", 0, "RCID", 0), Some(9));
        assert_eq!(record.string_subfield("DSID", 0, "NAME", 0).unwrap(), "cd");
        assert!(!record.reread(&mut cursor).unwrap());
    }

    #[test]
    fn clone_on_rebinds_definitions() {
        let schema = defns();
        let mut cursor = Cursor::new(record_bytes(b'D', None, b""));
        let record = Record::read(&mut cursor, &schema).unwrap().unwrap();

        let other = defns();
        let copy = record.clone_on(&other).unwrap();
        assert!(std::ptr::eq(
            copy.field(1).unwrap().defn(),
            other.find("DSID").unwrap().as_ref()
        ));
        assert_eq!(copy.data(), record.data());

        let partial: FieldDefns = [FieldDefn::builder().tag("0001").build().unwrap()]
            .into_iter()
            .collect();
        assert!(record.clone_on(&partial).is_none());
    }
}
