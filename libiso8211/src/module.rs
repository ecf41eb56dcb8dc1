use std::{
    fs::File,
    io::{BufReader, Read, Seek, SeekFrom},
    path::Path,
};

use tracing::{debug, error, info, instrument};

use crate::{
    error::{Error, Result},
    leader::Leader,
    record::{read_full, Record},
    scan::scan_usize,
    schema::{FieldDefn, FieldDefns},
    FIELD_TERMINATOR, LEADER_SIZE,
};

/// An open ISO 8211 file: its data descriptive record and a cursor over its data records
///
/// The data descriptive record is decoded when the module is opened. Data records are then
/// read one at a time with [`DdfModule::read_record`], which reuses a single buffer, or
/// collected with [`DdfModule::records`].
#[derive(Debug)]
pub struct DdfModule<R: Read + Seek = BufReader<File>> {
    reader: R,
    leader: Leader,
    defns: FieldDefns,
    first_record_offset: u64,
    record: Option<Record>,
}

impl DdfModule {
    /// Opens the file at `path`, logging any failure
    ///
    /// # Errors
    ///
    /// This function errors if the file cannot be read or is not a valid ISO 8211 file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_inner(path.as_ref(), false)
    }

    /// Opens the file at `path` without logging failures, for probing unknown files
    ///
    /// # Errors
    ///
    /// See [`Self::open`]
    pub fn open_quietly(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_inner(path.as_ref(), true)
    }

    fn open_inner(path: &Path, quiet: bool) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            if !quiet {
                error!("Unable to open {}: {e}", path.display());
            }
            Error::from(e)
        })?;
        Self::from_reader_inner(BufReader::new(file), quiet)
    }
}

impl<R: Read + Seek> DdfModule<R> {
    /// Decodes the data descriptive record at the current position of `reader`, logging
    /// any failure
    ///
    /// # Errors
    ///
    /// This function errors if the leader, the directory or one of the field definitions
    /// is invalid, or if reading fails
    pub fn from_reader(reader: R) -> Result<Self> {
        Self::from_reader_inner(reader, false)
    }

    /// Same as [`Self::from_reader`], without logging failures
    ///
    /// # Errors
    ///
    /// See [`Self::from_reader`]
    pub fn from_reader_quietly(reader: R) -> Result<Self> {
        Self::from_reader_inner(reader, true)
    }

    fn from_reader_inner(reader: R, quiet: bool) -> Result<Self> {
        Self::read_ddr(reader).map_err(|e| {
            if !quiet {
                error!("Failed to read data descriptive record: {e}");
            }
            e
        })
    }

    #[instrument(level = "debug", skip_all)]
    fn read_ddr(mut reader: R) -> Result<Self> {
        let mut raw = [0u8; LEADER_SIZE];
        let found = read_full(&mut reader, &mut raw)?;
        if found < LEADER_SIZE {
            return Err(Error::ShortLeader { found });
        }
        let leader = Leader::parse(&raw)?;
        leader.validate_descriptive(&raw)?;
        debug!("Data descriptive record leader {leader:?}");

        let size = leader.record_length - LEADER_SIZE;
        let mut data = vec![0; size];
        let found = read_full(&mut reader, &mut data)?;
        if found < size {
            return Err(Error::ShortRecord {
                expected: size,
                found,
            });
        }

        let width = leader.entry_width();
        let area_offset = leader.field_area_start - LEADER_SIZE;
        let mut defns = FieldDefns::new();
        for entry in data.chunks_exact(width) {
            if entry[0] == FIELD_TERMINATOR {
                break;
            }
            let (tag, rest) = entry.split_at(leader.size_field_tag);
            let tag = String::from_utf8_lossy(tag);
            let len = scan_usize(rest, leader.size_field_length);
            let pos = scan_usize(&rest[leader.size_field_length..], leader.size_field_pos);

            let start = area_offset + pos;
            let area = data
                .get(start..start + len)
                .ok_or_else(|| Error::InvalidDirectory {
                    tag: tag.to_string(),
                })?;
            defns.push(FieldDefn::initialize(
                &tag,
                leader.field_control_length,
                area,
            )?);
        }

        let first_record_offset = reader.stream_position()?;
        info!(
            "Read {} field definitions, data records start at {first_record_offset}",
            defns.len()
        );
        Ok(Self {
            reader,
            leader,
            defns,
            first_record_offset,
            record: None,
        })
    }

    /// Reads the next data record
    ///
    /// The record is owned by the module and replaced by the next call. Returns `None` at
    /// a clean end of file. After an error, reading may continue with the next call.
    ///
    /// # Errors
    ///
    /// This function errors if the record is truncated, its leader is corrupt, or it uses
    /// a tag that the module does not define
    pub fn read_record(&mut self) -> Result<Option<&Record>> {
        let result = match self.record.take() {
            Some(mut record) if record.reuses_header() => record
                .reread(&mut self.reader)
                .map(|more| more.then_some(record)),
            _ => Record::read(&mut self.reader, &self.defns),
        };
        match result {
            Ok(record) => {
                self.record = record;
                Ok(self.record.as_ref())
            }
            Err(e) => {
                debug!("Failed to read data record: {e}");
                Err(e)
            }
        }
    }

    /// Iterates over the remaining data records as owned copies
    pub fn records(&mut self) -> Records<'_, R> {
        Records { module: self }
    }

    /// Moves the read cursor to `offset`, or to the first data record
    ///
    /// # Errors
    ///
    /// This function errors if seeking fails
    pub fn rewind(&mut self, offset: Option<u64>) -> Result<()> {
        let offset = offset.unwrap_or(self.first_record_offset);
        self.reader.seek(SeekFrom::Start(offset))?;
        self.record = None;
        Ok(())
    }

    /// Current read offset, suitable for [`Self::rewind`]
    ///
    /// # Errors
    ///
    /// This function errors if the position cannot be queried
    pub fn position(&mut self) -> Result<u64> {
        Ok(self.reader.stream_position()?)
    }

    /// Offset of the first data record
    #[must_use]
    pub const fn first_record_offset(&self) -> u64 {
        self.first_record_offset
    }

    /// Leader of the data descriptive record
    #[must_use]
    pub const fn leader(&self) -> &Leader {
        &self.leader
    }

    /// Field definitions, in declaration order
    #[must_use]
    pub const fn field_defns(&self) -> &FieldDefns {
        &self.defns
    }

    /// Field definition by tag
    #[must_use]
    pub fn find_field_defn(&self, tag: &str) -> Option<&FieldDefn> {
        self.defns.find(tag).map(AsRef::as_ref)
    }

    /// Field definition by declaration order
    #[must_use]
    pub fn field_defn(&self, index: usize) -> Option<&FieldDefn> {
        self.defns.get(index).map(AsRef::as_ref)
    }

    /// Number of field definitions
    #[must_use]
    pub fn field_defn_count(&self) -> usize {
        self.defns.len()
    }

    /// Returns the underlying reader
    pub fn into_inner(self) -> R {
        self.reader
    }
}

/// Iterator over the data records of a [`DdfModule`], see [`DdfModule::records`]
///
/// Iteration stops at the end of the file. An error is yielded once and iteration
/// continues from wherever the failed read left the stream.
#[derive(Debug)]
pub struct Records<'m, R: Read + Seek> {
    module: &'m mut DdfModule<R>,
}

impl<R: Read + Seek> Iterator for Records<'_, R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.module.read_record().map(|r| r.cloned()).transpose()
    }
}
