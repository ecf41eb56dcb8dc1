//! Record mutation and serialization

use std::{io::Write, ops::Range, sync::Arc};

use tracing::{debug, instrument};

use super::{Field, Record, Slot};
use crate::{
    error::{Error, Result},
    leader::{push_decimal, Leader},
    schema::{FieldDefn, SubfieldDefn},
    FIELD_TERMINATOR, LEADER_SIZE,
};

impl Record {
    /// Creates an empty record for writing
    ///
    /// Directory lengths and positions use 5 digits each and tags `size_field_tag`
    /// characters.
    #[must_use]
    pub const fn new(size_field_tag: usize) -> Self {
        Self {
            data: Vec::new(),
            field_offset: 0,
            slots: Vec::new(),
            reuse_header: false,
            size_field_length: 5,
            size_field_pos: 5,
            size_field_tag,
        }
    }

    fn slot(&self, index: usize) -> Result<&Slot> {
        self.slots
            .get(index)
            .ok_or_else(|| Error::FieldNotFound(format!("#{index}")))
    }

    fn field_view(&self, index: usize) -> Result<Field<'_>> {
        self.field(index)
            .ok_or_else(|| Error::FieldNotFound(format!("#{index}")))
    }

    /// Replaces `range` of the bytes of field `index` and moves the fields stored after it
    fn splice_field(&mut self, index: usize, range: Range<usize>, bytes: &[u8]) {
        let Slot { start, len, .. } = self.slots[index];
        let old = range.len();
        self.data
            .splice(start + range.start..start + range.end, bytes.iter().copied());
        self.slots[index].len = len - old + bytes.len();
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if i != index && (slot.start > start || (slot.start == start && i > index)) {
                slot.start = (slot.start + bytes.len()).saturating_sub(old);
            }
        }
    }

    /// Appends a field to the end of the record, holding one default instance
    ///
    /// Returns the index of the new field.
    ///
    /// # Errors
    ///
    /// See [`Self::create_default_field_instance`]
    pub fn add_field(&mut self, defn: Arc<FieldDefn>) -> Result<usize> {
        let index = self.slots.len();
        self.slots.push(Slot {
            defn,
            start: self.data.len(),
            len: 0,
        });
        self.create_default_field_instance(index, 0)?;
        Ok(index)
    }

    /// Removes field `index` and its bytes from the record
    ///
    /// # Errors
    ///
    /// This function errors if there is no such field
    pub fn delete_field(&mut self, index: usize) -> Result<()> {
        self.resize_field(index, 0)?;
        self.slots.remove(index);
        Ok(())
    }

    /// Grows or shrinks field `index` to `new_len` bytes
    ///
    /// Bytes are added or removed at the end of the field. Added bytes are zero.
    ///
    /// # Errors
    ///
    /// This function errors if there is no such field
    pub fn resize_field(&mut self, index: usize, new_len: usize) -> Result<()> {
        let len = self.slot(index)?.len;
        if new_len > len {
            self.splice_field(index, len..len, &vec![0; new_len - len]);
        } else {
            self.splice_field(index, new_len..len, &[]);
        }
        Ok(())
    }

    /// Replaces repetition `instance` of field `index` with `raw`
    ///
    /// `raw` is appended as a new repetition when `instance` is the repeat count of a
    /// repeating field, or when the field is still empty.
    ///
    /// # Errors
    ///
    /// This function errors if there is no such field or repetition
    pub fn set_field_raw(&mut self, index: usize, instance: usize, raw: &[u8]) -> Result<()> {
        let field = self.field_view(index)?;
        let repeat_count = field.repeat_count();
        let repeating = field.defn().is_repeating();
        let size = field.data_size();
        let out_of_range = || Error::InstanceOutOfRange {
            tag: field.tag().to_owned(),
            instance,
        };

        if instance > repeat_count || (!repeating && instance != 0) {
            return Err(out_of_range());
        }

        if size == 0 || (repeating && instance == repeat_count) {
            let mut bytes = raw.to_vec();
            bytes.push(FIELD_TERMINATOR);
            // the new repetition takes the place of the field terminator
            let range = size.saturating_sub(1)..size;
            self.splice_field(index, range, &bytes);
            return Ok(());
        }

        let range = field.instance_range(instance).ok_or_else(out_of_range)?;
        self.splice_field(index, range, raw);
        Ok(())
    }

    /// Replaces `old_len` bytes at `offset` within repetition `instance` of field `index`
    ///
    /// # Errors
    ///
    /// This function errors if there is no such field or repetition, or if the bytes to
    /// replace extend past the field
    pub fn update_field_raw(
        &mut self,
        index: usize,
        instance: usize,
        offset: usize,
        old_len: usize,
        raw: &[u8],
    ) -> Result<()> {
        let field = self.field_view(index)?;
        let out_of_range = || Error::InstanceOutOfRange {
            tag: field.tag().to_owned(),
            instance,
        };
        let range = field.instance_range(instance).ok_or_else(out_of_range)?;
        let start = range.start + offset;
        if start + old_len > field.data_size() {
            return Err(out_of_range());
        }
        self.splice_field(index, start..start + old_len, raw);
        Ok(())
    }

    /// Sets repetition `instance` of field `index` to the default value of its definition
    ///
    /// # Errors
    ///
    /// See [`Self::set_field_raw`]
    pub fn create_default_field_instance(&mut self, index: usize, instance: usize) -> Result<()> {
        let value = self.slot(index)?.defn.default_value();
        self.set_field_raw(index, instance, &value)
    }

    /// Locates a subfield for writing, adding a default repetition when the field has run
    /// out of data
    fn locate_subfield(
        &mut self,
        tag: &str,
        field_instance: usize,
        name: &str,
        repetition: usize,
    ) -> Result<(usize, SubfieldDefn, usize)> {
        let index = self
            .find_field_index(tag, field_instance)
            .ok_or_else(|| Error::FieldNotFound(tag.to_owned()))?;
        let defn = Arc::clone(&self.slots[index].defn);
        let subfield_index = defn
            .find_subfield_index(name)
            .ok_or_else(|| Error::SubfieldNotFound {
                tag: tag.to_owned(),
                name: name.to_owned(),
            })?;
        let out_of_range = || Error::InstanceOutOfRange {
            tag: tag.to_owned(),
            instance: repetition,
        };

        let field = self.field_view(index)?;
        let offset = field
            .subfield_offset(subfield_index, repetition)
            .ok_or_else(out_of_range)?;
        let remaining = &field.data()[offset..];
        let offset = if remaining == [FIELD_TERMINATOR] {
            debug!("Adding repetition {repetition} to field {tag}");
            self.create_default_field_instance(index, repetition)?;
            self.field_view(index)?
                .subfield_offset(subfield_index, repetition)
                .ok_or_else(out_of_range)?
        } else {
            offset
        };
        Ok((index, defn.subfields()[subfield_index].clone(), offset))
    }

    fn set_subfield(
        &mut self,
        tag: &str,
        field_instance: usize,
        name: &str,
        repetition: usize,
        format: impl FnOnce(&SubfieldDefn) -> Result<Vec<u8>>,
    ) -> Result<()> {
        let (index, subfield, offset) = self.locate_subfield(tag, field_instance, name, repetition)?;
        let value = format(&subfield)?;

        let field = self.field_view(index)?;
        let existing = &field.data()[offset..];
        let (_, mut consumed) = subfield.data_length(existing);
        consumed = consumed.min(existing.len());
        // keep the field terminator of a last value written without a unit terminator
        if subfield.is_variable() && consumed > 0 && existing[consumed - 1] == FIELD_TERMINATOR {
            consumed -= 1;
        }
        self.splice_field(index, offset..offset + consumed, &value);
        Ok(())
    }

    /// Writes text into a subfield, see [`Self::set_int_subfield`]
    ///
    /// # Errors
    ///
    /// See [`Self::set_int_subfield`]
    pub fn set_string_subfield(
        &mut self,
        tag: &str,
        field_instance: usize,
        name: &str,
        repetition: usize,
        value: &str,
    ) -> Result<()> {
        self.set_subfield(tag, field_instance, name, repetition, |subfield| {
            Ok(subfield.format_string_value(value.as_bytes()))
        })
    }

    /// Writes an integer into a subfield
    ///
    /// Addressing follows [`Self::int_subfield`]. Writing one repetition past the last of
    /// a repeating field adds a default repetition first.
    ///
    /// # Errors
    ///
    /// This function errors if the field, subfield or repetition does not exist, or if
    /// the value cannot be encoded in the subfield format
    pub fn set_int_subfield(
        &mut self,
        tag: &str,
        field_instance: usize,
        name: &str,
        repetition: usize,
        value: i64,
    ) -> Result<()> {
        self.set_subfield(tag, field_instance, name, repetition, |subfield| {
            subfield.format_int_value(value)
        })
    }

    /// Writes a real number into a subfield, see [`Self::set_int_subfield`]
    ///
    /// # Errors
    ///
    /// See [`Self::set_int_subfield`]
    pub fn set_float_subfield(
        &mut self,
        tag: &str,
        field_instance: usize,
        name: &str,
        repetition: usize,
        value: f64,
    ) -> Result<()> {
        self.set_subfield(tag, field_instance, name, repetition, |subfield| {
            subfield.format_float_value(value)
        })
    }

    /// Rebuilds the directory in front of the field area from the current fields
    fn reset_directory(&mut self) -> Result<()> {
        let mut directory = Vec::with_capacity(self.slots.len() * self.entry_width() + 1);
        for slot in &self.slots {
            let tag = slot.defn.tag();
            if tag.len() != self.size_field_tag {
                return Err(Error::InvalidTag {
                    tag: tag.to_owned(),
                    width: self.size_field_tag,
                });
            }
            directory.extend_from_slice(tag.as_bytes());
            push_decimal(&mut directory, "field length", slot.len, self.size_field_length)?;
            push_decimal(
                &mut directory,
                "field position",
                slot.start - self.field_offset,
                self.size_field_pos,
            )?;
        }
        directory.push(FIELD_TERMINATOR);

        let old_offset = self.field_offset;
        let new_offset = directory.len();
        self.data.splice(..old_offset, directory);
        self.field_offset = new_offset;
        for slot in &mut self.slots {
            slot.start = slot.start - old_offset + new_offset;
        }
        Ok(())
    }

    /// Writes the record, leader included, after rebuilding its directory
    ///
    /// # Errors
    ///
    /// This function errors if a tag, length or position does not fit the directory, if
    /// the record is too long for its leader, or if writing fails
    #[instrument(level = "trace", skip_all)]
    pub fn write_to(&mut self, writer: &mut impl Write) -> Result<()> {
        self.reset_directory()?;
        let leader = Leader::builder()
            .record_length(self.data.len() + LEADER_SIZE)
            .interchange_level(b' ')
            .leader_id(b'D')
            .inline_code_extension(b' ')
            .version(b' ')
            .field_control_length(0)
            .field_area_start(self.field_offset + LEADER_SIZE)
            .extended_charset(*b"   ")
            .size_field_length(self.size_field_length)
            .size_field_pos(self.size_field_pos)
            .size_field_tag(self.size_field_tag)
            .build();
        writer.write_all(&leader.to_bytes()?)?;
        writer.write_all(&self.data)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::schema::{
        codes::{DataStructCode, DataTypeCode},
        FieldDefns,
    };

    fn defns() -> FieldDefns {
        let mut catd = FieldDefn::builder()
            .tag("CATD")
            .data_struct_code(DataStructCode::Vector)
            .data_type_code(DataTypeCode::Mixed)
            .build()
            .unwrap();
        catd.add_subfield("RCNM", "A(2)").unwrap();
        catd.add_subfield("RCID", "I(10)").unwrap();
        catd.add_subfield("FILE", "A").unwrap();
        catd.add_subfield("SLAT", "R").unwrap();
        [
            FieldDefn::builder().tag("0001").build().unwrap(),
            catd,
            FieldDefn::builder()
                .tag("TIMX")
                .array_descr("*TSI")
                .format_controls("(I(5))")
                .data_struct_code(DataStructCode::Array)
                .build()
                .unwrap(),
            FieldDefn::builder()
                .tag("ATTF")
                .array_descr("*ATTL!ATVL")
                .format_controls("(b12,A)")
                .data_struct_code(DataStructCode::Array)
                .data_type_code(DataTypeCode::Mixed)
                .build()
                .unwrap(),
        ]
        .into_iter()
        .collect()
    }

    fn defn(defns: &FieldDefns, tag: &str) -> Arc<FieldDefn> {
        Arc::clone(defns.find(tag).unwrap())
    }

    #[test]
    fn new_fields_hold_default_instances() {
        let defns = defns();
        let mut record = Record::new(4);
        assert_eq!(record.add_field(defn(&defns, "0001")).unwrap(), 0);
        assert_eq!(record.add_field(defn(&defns, "CATD")).unwrap(), 1);
        assert_eq!(record.field(0).unwrap().data(), b"\x1e");
        assert_eq!(
            record.field(1).unwrap().data(),
            b"  0000000000\x1f\x1f\x1e"
        );
    }

    #[test]
    fn subfields_are_written_and_read_back() {
        let defns = defns();
        let mut record = Record::new(4);
        record.add_field(defn(&defns, "0001")).unwrap();
        record.add_field(defn(&defns, "CATD")).unwrap();
        record.set_field_raw(0, 0, b"1").unwrap();
        record.set_string_subfield("CATD", 0, "RCNM", 0, "CD").unwrap();
        record.set_int_subfield("CATD", 0, "RCID", 0, 12).unwrap();
        record.set_string_subfield("CATD", 0, "FILE", 0, "CATALOG.030").unwrap();
        record.set_float_subfield("CATD", 0, "SLAT", 0, -12.5).unwrap();

        assert_eq!(record.field(0).unwrap().data(), b"1\x1e");
        assert_eq!(
            record.field(1).unwrap().data(),
            b"CD0000000012CATALOG.030\x1f-12.5\x1f\x1e"
        );
        assert_eq!(record.int_subfield("CATD", 0, "RCID", 0), Some(12));
        assert_eq!(record.float_subfield("CATD", 0, "SLAT", 0), Some(-12.5));

        record.set_string_subfield("CATD", 0, "FILE", 0, "A").unwrap();
        assert_eq!(record.string_subfield("CATD", 0, "FILE", 0).unwrap(), "A");
        assert_eq!(record.float_subfield("CATD", 0, "SLAT", 0), Some(-12.5));
        assert!(matches!(
            record.set_int_subfield("CATD", 0, "NOPE", 0, 1),
            Err(Error::SubfieldNotFound { .. })
        ));
        assert!(matches!(
            record.set_int_subfield("VRID", 0, "RCID", 0, 1),
            Err(Error::FieldNotFound(_))
        ));
        assert!(matches!(
            record.set_int_subfield("CATD", 0, "RCID", 0, 12_345_678_901),
            Err(Error::ValueTooWide { .. })
        ));
    }

    #[test]
    fn repeating_groups_grow_one_past_the_end() {
        let defns = defns();
        let mut record = Record::new(4);
        let index = record.add_field(defn(&defns, "TIMX")).unwrap();
        for (i, value) in [7, 8, 9].into_iter().enumerate() {
            record.set_int_subfield("TIMX", 0, "TSI", i, value).unwrap();
        }
        let field = record.field(index).unwrap();
        assert_eq!(field.repeat_count(), 3);
        assert_eq!(field.data(), b"000070000800009\x1e");
        assert!(record.set_int_subfield("TIMX", 0, "TSI", 5, 1).is_err());

        record.set_field_raw(index, 1, b"00042").unwrap();
        assert_eq!(record.int_subfield("TIMX", 0, "TSI", 1), Some(42));
        assert!(record.set_field_raw(index, 4, b"00001").is_err());
    }

    #[test]
    fn binary_and_variable_repetitions() {
        let defns = defns();
        let mut record = Record::new(4);
        record.add_field(defn(&defns, "ATTF")).unwrap();
        record.set_int_subfield("ATTF", 0, "ATTL", 0, 116).unwrap();
        record.set_string_subfield("ATTF", 0, "ATVL", 0, "BUOY").unwrap();
        record.set_int_subfield("ATTF", 0, "ATTL", 1, 300).unwrap();
        record.set_string_subfield("ATTF", 0, "ATVL", 1, "x").unwrap();

        let field = record.field(0).unwrap();
        assert_eq!(field.data(), b"\x74\x00BUOY\x1f\x2c\x01x\x1f\x1e");
        assert_eq!(field.repeat_count(), 2);
        assert_eq!(field.int_subfield("ATTL", 1), Some(300));
        assert_eq!(field.string_subfield("ATVL", 0).unwrap(), "BUOY");
    }

    #[test]
    fn field_edits_move_later_fields() {
        let defns = defns();
        let mut record = Record::new(4);
        record.add_field(defn(&defns, "0001")).unwrap();
        record.add_field(defn(&defns, "TIMX")).unwrap();
        record.set_int_subfield("TIMX", 0, "TSI", 0, 5).unwrap();

        record.set_field_raw(0, 0, b"LONGER").unwrap();
        assert_eq!(record.field(0).unwrap().data(), b"LONGER\x1e");
        assert_eq!(record.int_subfield("TIMX", 0, "TSI", 0), Some(5));

        record.update_field_raw(0, 0, 1, 2, b"").unwrap();
        assert_eq!(record.field(0).unwrap().data(), b"LGER\x1e");
        assert!(record.update_field_raw(0, 0, 3, 5, b"").is_err());

        record.resize_field(0, 2).unwrap();
        assert_eq!(record.field(0).unwrap().data(), b"LG");
        assert_eq!(record.int_subfield("TIMX", 0, "TSI", 0), Some(5));

        record.delete_field(0).unwrap();
        assert_eq!(record.field_count(), 1);
        assert_eq!(record.field(0).unwrap().tag(), "TIMX");
        assert_eq!(record.int_subfield("TIMX", 0, "TSI", 0), Some(5));
        assert!(record.delete_field(3).is_err());
    }

    #[test]
    fn written_record_reads_back() {
        let defns = defns();
        let mut record = Record::new(4);
        record.add_field(defn(&defns, "0001")).unwrap();
        record.add_field(defn(&defns, "CATD")).unwrap();
        record.set_field_raw(0, 0, b"1").unwrap();
        record.set_string_subfield("CATD", 0, "FILE", 0, "A.DAT").unwrap();

        let mut out = Vec::new();
        record.write_to(&mut out).unwrap();
        assert_eq!(&out[..LEADER_SIZE], b"00075 D     00053   5504");
        assert_eq!(&out[LEADER_SIZE..LEADER_SIZE + 19], b"00010000200000CATD0");

        let read = Record::read(&mut Cursor::new(&out), &defns).unwrap().unwrap();
        assert_eq!(read.data(), record.data());
        assert_eq!(read.string_subfield("CATD", 0, "FILE", 0).unwrap(), "A.DAT");

        let mut again = Vec::new();
        record.write_to(&mut again).unwrap();
        assert_eq!(again, out);
    }

    #[test]
    fn invalid_tags_do_not_write() {
        let defns = defns();
        let mut record = Record::new(3);
        record.add_field(defn(&defns, "0001")).unwrap();
        assert!(matches!(
            record.write_to(&mut Vec::new()),
            Err(Error::InvalidTag { width: 3, .. })
        ));
    }
}
