use std::path::Path;

use anyhow::{Context, Result};
use libiso8211::{
    schema::{codes::SubfieldType, FieldDefn, SubfieldDefn},
    DdfModule, Field, Leader,
};
use tracing::{debug, info, instrument};

fn print_leader(leader: &Leader) {
    println!("Data descriptive record");
    println!("  record length:         {}", leader.record_length);
    println!("  interchange level:     {}", char::from(leader.interchange_level));
    println!("  leader identifier:     {}", char::from(leader.leader_id));
    println!("  code extension:        {}", char::from(leader.inline_code_extension));
    println!("  version:               {}", char::from(leader.version));
    println!("  field control length:  {}", leader.field_control_length);
    println!("  field area start:      {}", leader.field_area_start);
    println!(
        "  extended character set: {:?}",
        String::from_utf8_lossy(&leader.extended_charset)
    );
    println!(
        "  entry map:             length {} position {} tag {}",
        leader.size_field_length, leader.size_field_pos, leader.size_field_tag
    );
}

fn print_field_defn(defn: &FieldDefn) {
    println!();
    println!("Field {}: {}", defn.tag(), defn.name());
    println!(
        "  structure {} type {}{}",
        defn.data_struct_code(),
        defn.data_type_code(),
        if defn.is_repeating() { ", repeating" } else { "" }
    );
    if !defn.array_descr().is_empty() {
        println!("  array descriptor: {}", defn.array_descr());
    }
    if !defn.format_controls().is_empty() {
        println!("  format controls:  {}", defn.format_controls());
    }
    for subfield in defn.subfields() {
        let width = if subfield.is_variable() {
            "variable".to_owned()
        } else {
            format!("{} bytes", subfield.width())
        };
        println!(
            "    {:<8} {:<8} {:<14} {width}",
            subfield.name(),
            subfield.format(),
            subfield.subfield_type()
        );
    }
}

fn open(path: &Path) -> Result<DdfModule> {
    let module =
        DdfModule::open(path).with_context(|| format!("Unable to open {}", path.display()))?;
    debug!("Read {} field definitions", module.field_defn_count());
    Ok(module)
}

fn print_schema(module: &DdfModule) {
    print_leader(module.leader());
    for defn in module.field_defns() {
        print_field_defn(defn);
    }
}

/// Prints the leader and field definitions of the file at `path`
///
/// # Errors
///
/// This function errors if the file cannot be opened as an ISO 8211 file
#[instrument]
pub fn schema(path: &Path) -> Result<()> {
    print_schema(&open(path)?);
    Ok(())
}

fn subfield_value(field: &Field<'_>, subfield: &SubfieldDefn, repetition: usize) -> String {
    let Some(data) = field.subfield_data(subfield, repetition) else {
        return "<missing>".to_owned();
    };
    match subfield.subfield_type() {
        SubfieldType::Int => {
            let (value, consumed) = subfield.extract_int_data(data);
            if consumed > 0 {
                value.to_string()
            } else {
                "<undecodable>".to_owned()
            }
        }
        SubfieldType::Float => {
            let (value, consumed) = subfield.extract_float_data(data);
            if consumed > 0 {
                value.to_string()
            } else {
                "<undecodable>".to_owned()
            }
        }
        SubfieldType::String => {
            let (value, _) = subfield.extract_string_data(data);
            format!("{:?}", String::from_utf8_lossy(value))
        }
        SubfieldType::BinaryString => {
            let (value, _) = subfield.extract_string_data(data);
            value.iter().map(|b| format!("{b:02X}")).collect()
        }
    }
}

fn print_field(field: &Field<'_>) {
    let repeat_count = field.repeat_count();
    println!(
        "  {} ({} bytes, {repeat_count} repetitions)",
        field.tag(),
        field.data_size()
    );
    if field.defn().subfield_count() == 0 {
        println!(
            "    {:?}",
            String::from_utf8_lossy(field.instance_data(0).unwrap_or_default())
        );
        return;
    }
    for repetition in 0..repeat_count {
        if repeat_count > 1 {
            println!("    [{repetition}]");
        }
        for subfield in field.defn().subfields() {
            println!(
                "      {} = {}",
                subfield.name(),
                subfield_value(field, subfield, repetition)
            );
        }
    }
}

/// Prints the schema of the file at `path` followed by its data records
///
/// At most `limit` records are printed when a limit is given. Returns the number of
/// records printed.
///
/// # Errors
///
/// This function errors if the file cannot be opened or a record cannot be read
#[instrument]
pub fn dump(path: &Path, limit: Option<usize>) -> Result<usize> {
    let mut module = open(path)?;
    print_schema(&module);

    let mut count = 0;
    while limit.map_or(true, |limit| count < limit) {
        let Some(record) = module
            .read_record()
            .with_context(|| format!("Failed to read record {count}"))?
        else {
            break;
        };
        println!();
        println!("Record {count} ({} bytes)", record.data().len());
        for field in record.fields() {
            print_field(&field);
        }
        count += 1;
    }
    info!("Printed {count} records from {}", path.display());
    Ok(count)
}
