//! # libiso8211
//!
//!
//! This library reads and writes files in the ISO/IEC 8211 interchange format, the
//! self-describing record container used by ADRG, ASRP, USRP, S-57 and SDTS datasets.
//!
//! An ISO 8211 file (a *module*) starts with a data descriptive record (DDR) that declares every
//! field used by the file: its tag, its structure and type, and the names and formats of its
//! subfields. The data records (DR) that follow hold the values, and are decoded against those
//! declarations.
//!
//! It aims to provide a minimal, low-level API to build upon. Dataset-level semantics (what an
//! `SPR` or `CATD` field means) are left to the users of this crate.
//!
//! ### Layout
//!
//! Every record starts with a 24 byte [`Leader`], followed by a directory of
//! `tag + length + position` entries and a field area. Variable width subfields end with a unit
//! terminator ([`UNIT_TERMINATOR`]) and fields end with a field terminator
//! ([`FIELD_TERMINATOR`]).
//!
//! Format controls such as `(A(2),3(I(1),2R),b24)` are expanded by [`schema::format`] into one
//! format per subfield. The supported formats are:
//! - `A`, `C` and `S`: character data
//! - `I`: integers written as text
//! - `R`: reals written as text
//! - `b1n`..`b4n` and `B1n`..`B4n`: binary integers and reals of `n` bytes, little and big endian
//! - `B(n)`: bit strings of `n` bits
//!
//! Each may be followed by a width in brackets. Subfields without a width are variable.
//!
//! ### Usage
//!
//! #### Reading a file
//!
//! ```no_run
//! use libiso8211::DdfModule;
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut module = DdfModule::open("TRANSH01.THF")?;
//!     for defn in module.field_defns() {
//!         println!("{}: {}", defn.tag(), defn.name());
//!     }
//!     while let Some(record) = module.read_record()? {
//!         if let Some(file) = record.string_subfield("CATD", 0, "FILE", 0) {
//!             println!("{file}");
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Lookups that miss (an absent field, subfield or repetition) return `None`, since files of
//! different products and revisions routinely omit optional fields. Structural problems are
//! reported as an [`Error`].
//!
//! #### Writing a file
//!
//! ```rust
//! use libiso8211::{
//!     schema::{
//!         codes::{DataStructCode, DataTypeCode},
//!         FieldDefn,
//!     },
//!     DdfModule, DdfWriter, Leader,
//! };
//! use std::io::Cursor;
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut catd = FieldDefn::builder()
//!         .tag("CATD")
//!         .name("Catalog Directory Field")
//!         .data_struct_code(DataStructCode::Vector)
//!         .data_type_code(DataTypeCode::Mixed)
//!         .build()?;
//!     catd.add_subfield("RCNM", "A(2)")?;
//!     catd.add_subfield("RCID", "I(10)")?;
//!     catd.add_subfield("FILE", "A")?;
//!
//!     let mut writer = DdfWriter::new(Vec::new(), Leader::default(), vec![catd])?;
//!     let mut record = writer.new_record();
//!     record.add_field(writer.field_defns().find("CATD").cloned().unwrap())?;
//!     record.set_string_subfield("CATD", 0, "RCNM", 0, "CD")?;
//!     record.set_int_subfield("CATD", 0, "RCID", 0, 1)?;
//!     record.set_string_subfield("CATD", 0, "FILE", 0, "CATALOG.030")?;
//!     writer.write_record(&mut record)?;
//!
//!     let mut module = DdfModule::from_reader(Cursor::new(writer.finish()?))?;
//!     let record = module.read_record()?.unwrap();
//!     assert_eq!(record.int_subfield("CATD", 0, "RCID", 0), Some(1));
//!     Ok(())
//! }
//! ```
//!
//! #### Unstable API
//!
//! This crate is still very much a work-in-progress. Expect breaking changes between minor
//! releases until`v1.0`. [`Leader`] carries the `#[non_exhaustive]` attribute and implements the
//! builder pattern, as does [`schema::FieldDefn`]. Use the builders where possible.
//!
//!

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    missing_docs
)]

mod error;
mod leader;
mod module;
/// Data records and field instances
pub mod record;
pub mod scan;
pub mod schema;
mod writer;

pub use error::{Error, Result};
pub use leader::Leader;
pub use module::{DdfModule, Records};
pub use record::{Field, Record};
pub use writer::DdfWriter;

/// Terminates variable width subfields
pub const UNIT_TERMINATOR: u8 = 0x1f;
/// Terminates fields and directories
pub const FIELD_TERMINATOR: u8 = 0x1e;
/// Size of the leader that starts every record
pub const LEADER_SIZE: usize = 24;
