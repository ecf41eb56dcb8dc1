/// Demonstrates how to list the data records of an ISO 8211 file with a [`DdfModule`]
///
use libiso8211::DdfModule;

fn main() -> anyhow::Result<()> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "CATALOG.031".to_owned());
    let mut module = DdfModule::open(path)?;

    while let Some(record) = module.read_record()? {
        for field in record.fields() {
            print!("{} ", field.tag());
            for repetition in 0..field.repeat_count() {
                for subfield in field.defn().subfields() {
                    if let Some(value) = field.string_subfield(subfield.name(), repetition) {
                        print!("{}={} ", subfield.name(), value.trim_end());
                    }
                }
            }
        }
        println!();
    }
    Ok(())
}
