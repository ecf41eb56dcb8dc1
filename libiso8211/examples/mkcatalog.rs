/// Demonstrates how to write an S-57 style exchange set catalog with a [`DdfWriter`]
///
use libiso8211::{
    schema::{
        codes::{DataStructCode, DataTypeCode},
        FieldDefn,
    },
    DdfWriter, Leader,
};

const FILES: [(&str, &str); 3] = [
    ("CATALOG.031", "ASC"),
    ("US5MD11M.000", "BIN"),
    ("README.TXT", "TXT"),
];

fn main() -> anyhow::Result<()> {
    let record_id = FieldDefn::builder()
        .tag("0001")
        .name("ISO/IEC 8211 Record Identifier")
        .build()?;
    let catd = FieldDefn::builder()
        .tag("CATD")
        .name("Catalogue Directory field")
        .array_descr("RCNM!RCID!FILE!LFIL!VOLM!IMPL!SLAT!WLON!NLAT!ELON!CRCS!COMT")
        .format_controls("(A(2),I(10),3A,A(3),4R,2A)")
        .data_struct_code(DataStructCode::Vector)
        .data_type_code(DataTypeCode::Mixed)
        .build()?;

    let mut writer = DdfWriter::create("CATALOG.031", Leader::default(), vec![record_id, catd])?;
    let record_id = writer.field_defns().find("0001").cloned();
    let catd = writer.field_defns().find("CATD").cloned();
    let (Some(record_id), Some(catd)) = (record_id, catd) else {
        anyhow::bail!("field definitions were not registered");
    };

    for (id, (file, implementation)) in (1..).zip(FILES) {
        let mut record = writer.new_record();
        let index = record.add_field(record_id.clone())?;
        record.set_field_raw(index, 0, id.to_string().as_bytes())?;
        record.add_field(catd.clone())?;
        record.set_string_subfield("CATD", 0, "RCNM", 0, "CD")?;
        record.set_int_subfield("CATD", 0, "RCID", 0, id)?;
        record.set_string_subfield("CATD", 0, "FILE", 0, file)?;
        record.set_string_subfield("CATD", 0, "VOLM", 0, "V01X01")?;
        record.set_string_subfield("CATD", 0, "IMPL", 0, implementation)?;
        if implementation == "BIN" {
            record.set_float_subfield("CATD", 0, "SLAT", 0, 38.875)?;
            record.set_float_subfield("CATD", 0, "WLON", 0, -76.5)?;
            record.set_float_subfield("CATD", 0, "NLAT", 0, 39.375)?;
            record.set_float_subfield("CATD", 0, "ELON", 0, -76.0)?;
        }
        writer.write_record(&mut record)?;
    }
    writer.finish()?;
    Ok(())
}
