use std::{borrow::Cow, ops::Range};

use crate::{
    schema::{FieldDefn, SubfieldDefn},
    FIELD_TERMINATOR,
};

/// One occurrence of a field within a record
///
/// A `Field` borrows both its definition and the bytes of its record, so it is only valid
/// until the record is changed or the next record is read.
#[derive(Debug, Clone, Copy)]
pub struct Field<'a> {
    defn: &'a FieldDefn,
    data: &'a [u8],
}

impl<'a> Field<'a> {
    pub(crate) const fn new(defn: &'a FieldDefn, data: &'a [u8]) -> Self {
        Self { defn, data }
    }

    /// Tag of the field definition
    #[must_use]
    pub fn tag(&self) -> &'a str {
        self.defn.tag()
    }

    /// Definition of this field
    #[must_use]
    pub const fn defn(&self) -> &'a FieldDefn {
        self.defn
    }

    /// Raw field bytes, field terminator included
    #[must_use]
    pub const fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Number of raw field bytes
    #[must_use]
    pub const fn data_size(&self) -> usize {
        self.data.len()
    }

    fn rest(&self, offset: usize) -> &'a [u8] {
        self.data.get(offset..).unwrap_or(&[])
    }

    /// Offset of subfield `index` in repetition `instance` of the subfield group
    ///
    /// Fixed width groups are addressed directly. Variable groups are walked subfield by
    /// subfield from the start of the field, and the walk gives up once it reaches the end
    /// of the data.
    pub(crate) fn subfield_offset(&self, index: usize, instance: usize) -> Option<usize> {
        let subfields = self.defn.subfields();
        if index >= subfields.len() {
            return None;
        }

        let fixed_width = self.defn.fixed_width();
        let (mut offset, groups) = if fixed_width > 0 && instance > 0 {
            let offset = fixed_width.checked_mul(instance)?;
            if offset >= self.data.len() {
                return None;
            }
            (offset, 0)
        } else {
            (0, instance)
        };

        for group in 0..=groups {
            for (i, subfield) in subfields.iter().enumerate() {
                if offset >= self.data.len() {
                    return None;
                }
                if group == groups && i == index {
                    return Some(offset);
                }
                let (_, consumed) = subfield.data_length(self.rest(offset));
                offset += consumed;
            }
        }
        None
    }

    /// Raw bytes starting at `subfield` in repetition `instance` of the subfield group
    ///
    /// The returned slice runs to the end of the field, so its length is the most the
    /// value may use. Repetitions at or past [`Self::repeat_count`] are absent.
    #[must_use]
    pub fn subfield_data(&self, subfield: &SubfieldDefn, instance: usize) -> Option<&'a [u8]> {
        if instance >= self.repeat_count() {
            return None;
        }
        let index = self
            .defn
            .subfields()
            .iter()
            .position(|s| std::ptr::eq(s, subfield))
            .or_else(|| self.defn.find_subfield_index(subfield.name()))?;
        self.subfield_offset(index, instance).map(|offset| self.rest(offset))
    }

    /// Number of repetitions of the subfield group
    ///
    /// A trailing partial group is not counted.
    #[must_use]
    pub fn repeat_count(&self) -> usize {
        if !self.defn.is_repeating() {
            return 1;
        }
        let fixed_width = self.defn.fixed_width();
        if fixed_width > 0 {
            return self.data.len() / fixed_width;
        }
        if self.defn.subfield_count() == 0 {
            return 1;
        }

        let size = self.data.len();
        let mut offset = 0;
        let mut count = 1;
        loop {
            let group_start = offset;
            for subfield in self.defn.subfields() {
                let remaining = size.saturating_sub(offset);
                let consumed = if subfield.width() > remaining {
                    subfield.width()
                } else {
                    subfield.data_length(self.rest(offset)).1
                };
                offset += consumed;
                if offset > size {
                    return count - 1;
                }
            }
            if offset == group_start {
                return count - 1;
            }
            if offset + 2 > size {
                return count;
            }
            count += 1;
        }
    }

    /// Byte range of repetition `instance` within the field
    ///
    /// The range covers the unit terminators of the group but not the field terminator.
    pub(crate) fn instance_range(&self, instance: usize) -> Option<Range<usize>> {
        if instance >= self.repeat_count() {
            return None;
        }
        let size = self.data.len();
        if self.defn.subfield_count() == 0 {
            return Some(0..Self::strip_terminator(self.data, 0, size));
        }
        let start = self.subfield_offset(0, instance)?;
        let last_index = self.defn.subfield_count() - 1;
        let last = self.subfield_offset(last_index, instance)?;
        let (_, consumed) = self.defn.subfields()[last_index].data_length(self.rest(last));
        let end = (last + consumed).min(size);
        Some(start..Self::strip_terminator(self.data, start, end))
    }

    fn strip_terminator(data: &[u8], start: usize, end: usize) -> usize {
        if end > start && end == data.len() && data[end - 1] == FIELD_TERMINATOR {
            end - 1
        } else {
            end
        }
    }

    /// Raw bytes of repetition `instance`, see [`Self::repeat_count`]
    #[must_use]
    pub fn instance_data(&self, instance: usize) -> Option<&'a [u8]> {
        self.instance_range(instance).map(|range| &self.data[range])
    }

    /// Integer value of subfield `name` in repetition `repetition`
    #[must_use]
    pub fn int_subfield(&self, name: &str, repetition: usize) -> Option<i64> {
        let subfield = self.defn.find_subfield(name)?;
        let (value, consumed) = subfield.extract_int_data(self.subfield_data(subfield, repetition)?);
        (consumed > 0).then_some(value)
    }

    /// Real value of subfield `name` in repetition `repetition`
    #[must_use]
    pub fn float_subfield(&self, name: &str, repetition: usize) -> Option<f64> {
        let subfield = self.defn.find_subfield(name)?;
        let (value, consumed) =
            subfield.extract_float_data(self.subfield_data(subfield, repetition)?);
        (consumed > 0).then_some(value)
    }

    /// Text of subfield `name` in repetition `repetition`, decoded lossily
    #[must_use]
    pub fn string_subfield(&self, name: &str, repetition: usize) -> Option<Cow<'a, str>> {
        let subfield = self.defn.find_subfield(name)?;
        let (value, _) = subfield.extract_string_data(self.subfield_data(subfield, repetition)?);
        Some(String::from_utf8_lossy(value))
    }
}
