use anyhow::Result;
use filerouter::{ProviderRecord, ProviderRegistry};

use super::format;

/// Print the provider types compiled into this binary.
pub fn run(registry: &ProviderRegistry, id: Option<&str>) -> Result<()> {
    match id {
        Some(id) => format::print_record(&registry.record(id)?),
        None => {
            let records: Vec<ProviderRecord> = registry.catalog();
            format::print_record_table(&records);
        }
    }
    Ok(())
}
