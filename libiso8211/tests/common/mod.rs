#![allow(dead_code)]

use std::{fs::File, io::Write, path::Path};

use libiso8211::{FIELD_TERMINATOR, UNIT_TERMINATOR};

/// Number of tile rows of the GIN record of [`adrg_gen`]
pub const NFL: usize = 3;
/// Number of tile columns of the GIN record of [`adrg_gen`]
pub const NFC: usize = 2;

/// A field declaration of a data descriptive record
pub struct FieldDecl {
    pub tag: &'static str,
    pub struct_code: u8,
    pub type_code: u8,
    pub name: &'static str,
    pub descr: &'static str,
    pub formats: &'static str,
}

const fn decl(
    tag: &'static str,
    struct_code: u8,
    type_code: u8,
    name: &'static str,
    descr: &'static str,
    formats: &'static str,
) -> FieldDecl {
    FieldDecl {
        tag,
        struct_code,
        type_code,
        name,
        descr,
        formats,
    }
}

/// Field declarations of an ADRG general information file
pub const GEN_FIELDS: [FieldDecl; 8] = [
    decl("000", b' ', b' ', "GENERAL_INFORMATION_FILE", "", ""),
    decl("001", b'1', b'0', "RECORD_ID_FIELD", "RTY!RID", "(A(3),A(2))"),
    decl(
        "DRF",
        b'1',
        b'1',
        "DATA_SET_DESCRIPTION_FIELD",
        "NSH!NSV!NOZ!NOS",
        "(4I(2))",
    ),
    decl("DSI", b'1', b'0', "DATA_SET_ID_FIELD", "PRT!NAM", "(A(4),A(8))"),
    decl(
        "GEN",
        b'1',
        b'6',
        "GENERAL_INFORMATION_FIELD",
        "STR!LOD!LAD!UNIloa!ARV!BRV",
        "(I(1),2R(6),I(3),2I(8))",
    ),
    decl(
        "SPR",
        b'1',
        b'6',
        "DATA_SET_PARAMETERS_FIELD",
        "NUL!NUS!NLL!NLS!NFL!NFC!PNC!PNL!COD!ROD!POR!PCB!PVB!BAD!TIF",
        "(4I(6),2I(3),2I(6),5I(1),A(12),A(1))",
    ),
    decl(
        "BDF",
        b'2',
        b'6',
        "BAND_ID_FIELD",
        "*BID!WS1!WS2",
        "(A(5),I(5),I(5))",
    ),
    decl("TIM", b'2', b'1', "TILE_INDEX_MAP_FIELD", "*TSI", "(I(5))"),
];

/// Encodes one field declaration: codes, field controls, name, descriptor and formats
fn field_decl(decl: &FieldDecl) -> Vec<u8> {
    let mut out = vec![decl.struct_code, decl.type_code];
    out.extend_from_slice(if decl.struct_code == b' ' {
        b"    "
    } else {
        b"00;&"
    });
    out.extend_from_slice(decl.name.as_bytes());
    if !decl.descr.is_empty() {
        out.push(UNIT_TERMINATOR);
        out.extend_from_slice(decl.descr.as_bytes());
        out.push(UNIT_TERMINATOR);
        out.extend_from_slice(decl.formats.as_bytes());
    }
    out.push(FIELD_TERMINATOR);
    out
}

/// Directory with 3 character tags, 3 digit lengths and 4 digit positions
fn directory(fields: &[(&str, Vec<u8>)]) -> (Vec<u8>, Vec<u8>) {
    let mut dir = Vec::new();
    let mut area = Vec::new();
    for (tag, bytes) in fields {
        dir.extend_from_slice(format!("{tag}{:03}{:04}", bytes.len(), area.len()).as_bytes());
        area.extend_from_slice(bytes);
    }
    dir.push(FIELD_TERMINATOR);
    (dir, area)
}

/// Data descriptive record for `decls`, laid out as ADRG producers write it
pub fn ddr(decls: &[FieldDecl]) -> Vec<u8> {
    let fields = decls
        .iter()
        .map(|d| (d.tag, field_decl(d)))
        .collect::<Vec<_>>();
    let (dir, area) = directory(&fields);
    let fas = 24 + dir.len();
    let mut out = format!("{:05}2L   06{fas:05}   3403", fas + area.len()).into_bytes();
    out.extend_from_slice(&dir);
    out.extend_from_slice(&area);
    out
}

/// Data record holding `fields`, each given with its field terminator
pub fn data_record(leader_id: char, fields: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let (dir, area) = directory(fields);
    let fas = 24 + dir.len();
    let mut out =
        format!("{:05} {leader_id}     {fas:05}   3403", fas + area.len()).into_bytes();
    out.extend_from_slice(&dir);
    out.extend_from_slice(&area);
    out
}

/// Space padded text of `width` bytes
pub fn text(value: &str, width: usize) -> String {
    format!("{value:<width$}")
}

/// Zero padded integer of `width` digits
pub fn int(value: i64, width: usize) -> String {
    format!("{value:0width$}")
}

/// Concatenates `parts` and appends a field terminator
pub fn field(parts: &[&str]) -> Vec<u8> {
    let mut out = parts.concat().into_bytes();
    out.push(FIELD_TERMINATOR);
    out
}

fn gen_field(lod: &str, lad: &str) -> Vec<u8> {
    field(&[
        "3",
        &text(lod, 6),
        &text(lad, 6),
        &int(100, 3),
        &int(12_345_678, 8),
        &int(6_480_000, 8),
    ])
}

fn spr_field() -> Vec<u8> {
    field(&[
        &int(0, 6),
        &int(127, 6),
        &int(0, 6),
        &int(127, 6),
        &int(NFL as i64, 3),
        &int(NFC as i64, 3),
        &int(128, 6),
        &int(128, 6),
        "0",
        "1",
        "2",
        "0",
        "0",
        &text("TRANSH01.IMG", 12),
        "N",
    ])
}

/// Records of an ADRG general information file: a data set summary, an overview and one
/// general information record with `NFL * NFC` tiles
pub fn adrg_records() -> Vec<Vec<u8>> {
    let mut tim = (1..=NFL * NFC)
        .map(|i| int(i as i64, 5))
        .collect::<String>()
        .into_bytes();
    tim.push(FIELD_TERMINATOR);

    vec![
        data_record(
            'D',
            &[("001", field(&["DSS", "01"])), ("DRF", field(&["01", "01", "01", "01"]))],
        ),
        data_record(
            'D',
            &[
                ("001", field(&["OVV", "01"])),
                ("DSI", field(&["ABCD", &text("OVERVIEW", 8)])),
                ("GEN", gen_field("-0.25", "45.5")),
            ],
        ),
        data_record(
            'D',
            &[
                ("001", field(&["GIN", "01"])),
                ("DSI", field(&["ABCD", "01000001"])),
                ("GEN", gen_field("-1.5", "44.125")),
                ("SPR", spr_field()),
                (
                    "BDF",
                    field(&[
                        &text("Red", 5),
                        &int(0, 5),
                        &int(0, 5),
                        &text("Green", 5),
                        &int(0, 5),
                        &int(0, 5),
                        &text("Blue", 5),
                        &int(0, 5),
                        &int(0, 5),
                    ]),
                ),
                ("TIM", tim),
            ],
        ),
    ]
}

/// A complete ADRG general information file
pub fn adrg_gen() -> Vec<u8> {
    let mut out = ddr(&GEN_FIELDS);
    for record in adrg_records() {
        out.extend_from_slice(&record);
    }
    out
}

/// Writes `bytes` to `path`
pub fn write_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    File::create(path)?.write_all(bytes)
}
