use bon::bon;
use tracing::{error, warn};

use super::{
    codes::{DataStructCode, DataTypeCode},
    format::subfield_formats,
    subfield::SubfieldDefn,
};
use crate::{
    error::{Error, Result},
    scan::fetch_variable,
    FIELD_TERMINATOR, UNIT_TERMINATOR,
};

/// Definition of one tagged field, as described by the data descriptive record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDefn {
    tag: String,
    name: String,
    array_descr: String,
    format_controls: String,
    data_struct_code: DataStructCode,
    data_type_code: DataTypeCode,
    repeating: bool,
    fixed_width: usize,
    subfields: Vec<SubfieldDefn>,
}

#[bon]
impl FieldDefn {
    /// Creates a field definition for writing
    ///
    /// Subfields are built from `array_descr` and `format_controls` when both are given,
    /// otherwise they can be added one at a time with [`Self::add_subfield`].
    ///
    /// # Errors
    ///
    /// This function errors if the format controls cannot be applied to the subfields
    #[builder]
    pub fn new(
        #[builder(into)] tag: String,
        #[builder(into, default)] name: String,
        #[builder(into, default)] array_descr: String,
        #[builder(into, default)] format_controls: String,
        #[builder(default)] data_struct_code: DataStructCode,
        #[builder(default)] data_type_code: DataTypeCode,
    ) -> Result<Self> {
        let mut defn = Self {
            tag,
            name,
            array_descr,
            format_controls,
            data_struct_code,
            data_type_code,
            repeating: false,
            fixed_width: 0,
            subfields: Vec::new(),
        };
        defn.repeating = defn.array_descr.starts_with('*');
        if !defn.array_descr.is_empty() && !defn.format_controls.is_empty() {
            defn.build_subfields();
            defn.apply_formats()?;
        }
        Ok(defn)
    }
}

impl FieldDefn {
    /// Parses a field description from the field area of a data descriptive record
    ///
    /// `area` holds the structure code, the type code, the remaining field controls up to
    /// `field_control_length`, then the unit terminated name and array descriptor and the
    /// field terminated format controls. Unknown structure or type codes are reported and
    /// replaced by their defaults.
    ///
    /// # Errors
    ///
    /// This function errors if `area` is shorter than the field controls, or if the
    /// format controls cannot be applied to the subfields
    pub fn initialize(tag: &str, field_control_length: usize, area: &[u8]) -> Result<Self> {
        if area.len() < field_control_length.max(2) {
            return Err(Error::ShortFieldArea {
                tag: tag.to_owned(),
            });
        }

        let data_struct_code = DataStructCode::from_code(area[0]).unwrap_or_else(|| {
            error!(
                "Unrecognized data_struct_code value {} in field {tag}, defaulting to elementary",
                char::from(area[0])
            );
            DataStructCode::Elementary
        });
        let data_type_code = DataTypeCode::from_code(area[1]).unwrap_or_else(|| {
            error!(
                "Unrecognized data_type_code value {} in field {tag}, defaulting to char_string",
                char::from(area[1])
            );
            DataTypeCode::CharString
        });

        let mut offset = field_control_length;
        let mut next = || {
            let rest = &area[offset..];
            let (value, consumed) =
                fetch_variable(rest, rest.len(), UNIT_TERMINATOR, FIELD_TERMINATOR);
            offset += consumed;
            value
        };
        let name = next();
        let array_descr = next();
        let format_controls = next();

        let mut defn = Self {
            tag: tag.to_owned(),
            name,
            array_descr,
            format_controls,
            data_struct_code,
            data_type_code,
            repeating: false,
            fixed_width: 0,
            subfields: Vec::new(),
        };
        if data_struct_code != DataStructCode::Elementary {
            defn.build_subfields();
            defn.apply_formats()?;
        }
        Ok(defn)
    }

    /// Creates one unformatted subfield per name of the array descriptor
    ///
    /// A leading `*` marks the subfield group as repeating.
    pub fn build_subfields(&mut self) {
        let names = match self.array_descr.strip_prefix('*') {
            Some(names) => {
                self.repeating = true;
                names
            }
            None => self.array_descr.as_str(),
        };
        self.subfields = names
            .split('!')
            .filter(|name| !name.is_empty())
            .map(|name| {
                let mut subfield = SubfieldDefn::default();
                subfield.set_name(name);
                subfield
            })
            .collect();
    }

    /// Expands the format controls and assigns one format to each subfield, in order
    ///
    /// Extra formats are ignored with a warning.
    ///
    /// # Errors
    ///
    /// This function errors if the format controls are malformed, if there are fewer
    /// formats than subfields, or if a format is not supported
    pub fn apply_formats(&mut self) -> Result<()> {
        let formats = subfield_formats(&self.format_controls).map_err(|e| {
            error!("Format controls for field {} are invalid: {e}", self.tag);
            e
        })?;

        for (i, format) in formats.iter().enumerate() {
            let Some(subfield) = self.subfields.get_mut(i) else {
                warn!(
                    "Got more formats than subfields for field {}, ignoring the extra {}",
                    self.tag,
                    formats.len() - i
                );
                break;
            };
            subfield.set_format(format.trim_start_matches(|c: char| c.is_ascii_digit()))?;
        }

        if formats.len() < self.subfields.len() {
            return Err(Error::MissingFormats {
                tag: self.tag.clone(),
                formats: formats.len(),
                subfields: self.subfields.len(),
            });
        }

        self.update_fixed_width();
        Ok(())
    }

    fn update_fixed_width(&mut self) {
        self.fixed_width = if self.subfields.iter().any(SubfieldDefn::is_variable) {
            0
        } else {
            self.subfields.iter().map(SubfieldDefn::width).sum()
        };
    }

    /// Appends a subfield, extending both the array descriptor and the format controls
    ///
    /// # Errors
    ///
    /// This function errors if `format` is not a supported subfield format
    pub fn add_subfield(&mut self, name: &str, format: &str) -> Result<()> {
        let subfield = SubfieldDefn::new(name, format)?;

        let mut controls = self
            .format_controls
            .strip_suffix(')')
            .filter(|c| c.starts_with('('))
            .unwrap_or("(")
            .to_owned();
        if controls.len() > 1 {
            controls.push(',');
        }
        controls.push_str(format);
        controls.push(')');
        self.format_controls = controls;

        if !self.array_descr.is_empty() && self.array_descr != "*" {
            self.array_descr.push('!');
        }
        self.array_descr.push_str(name);

        self.subfields.push(subfield);
        self.update_fixed_width();
        Ok(())
    }

    /// Marks the subfield group as repeating
    pub fn set_repeating(&mut self, repeating: bool) {
        self.repeating = repeating;
    }

    /// Field tag
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Descriptive name of the field
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw array descriptor, e.g. `*YCOO!XCOO`
    #[must_use]
    pub fn array_descr(&self) -> &str {
        &self.array_descr
    }

    /// Raw format controls, e.g. `(2b24)`
    #[must_use]
    pub fn format_controls(&self) -> &str {
        &self.format_controls
    }

    /// Structure class
    #[must_use]
    pub const fn data_struct_code(&self) -> DataStructCode {
        self.data_struct_code
    }

    /// Data type class
    #[must_use]
    pub const fn data_type_code(&self) -> DataTypeCode {
        self.data_type_code
    }

    /// Whether the subfield group may occur several times in one field
    #[must_use]
    pub const fn is_repeating(&self) -> bool {
        self.repeating
    }

    /// Width of one subfield group, 0 if any subfield is variable
    #[must_use]
    pub const fn fixed_width(&self) -> usize {
        self.fixed_width
    }

    /// Number of subfields in one group
    #[must_use]
    pub fn subfield_count(&self) -> usize {
        self.subfields.len()
    }

    /// Subfield definition by position
    #[must_use]
    pub fn subfield(&self, index: usize) -> Option<&SubfieldDefn> {
        self.subfields.get(index)
    }

    /// All subfield definitions, in order
    #[must_use]
    pub fn subfields(&self) -> &[SubfieldDefn] {
        &self.subfields
    }

    /// Subfield definition by name, ignoring ASCII case
    #[must_use]
    pub fn find_subfield(&self, name: &str) -> Option<&SubfieldDefn> {
        self.find_subfield_index(name).map(|i| &self.subfields[i])
    }

    pub(crate) fn find_subfield_index(&self, name: &str) -> Option<usize> {
        self.subfields
            .iter()
            .position(|s| s.name().eq_ignore_ascii_case(name))
    }

    /// Bytes of one subfield group holding default values
    #[must_use]
    pub fn default_value(&self) -> Vec<u8> {
        self.subfields
            .iter()
            .flat_map(SubfieldDefn::default_value)
            .collect()
    }

    /// Encodes this definition as a field of a data descriptive record
    ///
    /// The field controls are the structure and type codes followed by `00;&`, padded
    /// with blanks (or cut) to `field_control_length`.
    #[must_use]
    pub fn generate_ddr_entry(&self, field_control_length: usize) -> Vec<u8> {
        let mut out = vec![
            self.data_struct_code.code(),
            self.data_type_code.code(),
            b'0',
            b'0',
            b';',
            b'&',
        ];
        out.resize(field_control_length, b' ');
        out.extend_from_slice(self.name.as_bytes());
        if !self.array_descr.is_empty() {
            out.push(UNIT_TERMINATOR);
            out.extend_from_slice(self.array_descr.as_bytes());
        }
        if !self.format_controls.is_empty() {
            out.push(UNIT_TERMINATOR);
            out.extend_from_slice(self.format_controls.as_bytes());
        }
        out.push(FIELD_TERMINATOR);
        out
    }
}
