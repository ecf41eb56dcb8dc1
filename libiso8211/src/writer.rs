use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use tracing::{debug, instrument};

use crate::{
    error::{Error, Result},
    leader::{push_decimal, Leader},
    record::Record,
    schema::{FieldDefn, FieldDefns},
    FIELD_TERMINATOR, LEADER_SIZE,
};

/// Writes an ISO 8211 file: a data descriptive record followed by data records
///
/// ```no_run
/// use libiso8211::{schema::FieldDefn, DdfWriter, Leader};
///
/// # fn main() -> libiso8211::Result<()> {
/// let defns = vec![FieldDefn::builder().tag("0001").name("RECORD_ID").build()?];
/// let mut writer = DdfWriter::create("out.ddf", Leader::default(), defns)?;
/// let mut record = writer.new_record();
/// let id = writer.field_defns().find("0001").cloned().unwrap();
/// let index = record.add_field(id)?;
/// record.set_field_raw(index, 0, b"1")?;
/// writer.write_record(&mut record)?;
/// writer.finish()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct DdfWriter<W: Write> {
    writer: W,
    leader: Leader,
    defns: FieldDefns,
}

impl DdfWriter<BufWriter<File>> {
    /// Creates the file at `path` and writes its data descriptive record
    ///
    /// # Errors
    ///
    /// See [`DdfWriter::new`]
    pub fn create(
        path: impl AsRef<Path>,
        leader: Leader,
        defns: Vec<FieldDefn>,
    ) -> Result<Self> {
        Self::new(BufWriter::new(File::create(path)?), leader, defns)
    }
}

impl<W: Write> DdfWriter<W> {
    /// Writes the data descriptive record for `defns` to `writer`
    ///
    /// The record length, field area start and directory are computed. The other leader
    /// values are written as given.
    ///
    /// # Errors
    ///
    /// This function errors if a tag does not match the leader tag width, if a length or
    /// position does not fit the leader directory widths, or if writing fails
    #[instrument(level = "debug", skip_all, fields(fields = defns.len()))]
    pub fn new(mut writer: W, mut leader: Leader, defns: Vec<FieldDefn>) -> Result<Self> {
        let mut directory = Vec::new();
        let mut area = Vec::new();
        for defn in &defns {
            if defn.tag().len() != leader.size_field_tag {
                return Err(Error::InvalidTag {
                    tag: defn.tag().to_owned(),
                    width: leader.size_field_tag,
                });
            }
            let entry = defn.generate_ddr_entry(leader.field_control_length);
            directory.extend_from_slice(defn.tag().as_bytes());
            push_decimal(
                &mut directory,
                "field length",
                entry.len(),
                leader.size_field_length,
            )?;
            push_decimal(
                &mut directory,
                "field position",
                area.len(),
                leader.size_field_pos,
            )?;
            area.extend_from_slice(&entry);
        }
        directory.push(FIELD_TERMINATOR);

        leader.field_area_start = LEADER_SIZE + directory.len();
        leader.record_length = leader.field_area_start + area.len();
        debug!(
            "Writing data descriptive record of {} bytes",
            leader.record_length
        );
        writer.write_all(&leader.to_bytes()?)?;
        writer.write_all(&directory)?;
        writer.write_all(&area)?;

        Ok(Self {
            writer,
            leader,
            defns: defns.into_iter().collect(),
        })
    }

    /// Leader of the data descriptive record as written
    #[must_use]
    pub const fn leader(&self) -> &Leader {
        &self.leader
    }

    /// Field definitions, shared with the records created by [`Self::new_record`]
    #[must_use]
    pub const fn field_defns(&self) -> &FieldDefns {
        &self.defns
    }

    /// Field definition by tag
    #[must_use]
    pub fn find_field_defn(&self, tag: &str) -> Option<&FieldDefn> {
        self.defns.find(tag).map(AsRef::as_ref)
    }

    /// Creates an empty data record using the tag width of this file
    #[must_use]
    pub const fn new_record(&self) -> Record {
        Record::new(self.leader.size_field_tag)
    }

    /// Appends a data record
    ///
    /// # Errors
    ///
    /// See [`Record::write_to`]
    pub fn write_record(&mut self, record: &mut Record) -> Result<()> {
        record.write_to(&mut self.writer)
    }

    /// Flushes and returns the underlying writer
    ///
    /// # Errors
    ///
    /// This function errors if flushing fails
    pub fn finish(mut self) -> Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}
