use filerouter::{FieldDescriptor, ProviderRecord, ValidationResult};

const MAX_ID_WIDTH: usize = 40;
const LINE_BUDGET: usize = 100;

/// One row per record: id, version, name and supported features.
pub fn print_record_table(records: &[ProviderRecord]) {
    if records.is_empty() {
        println!("No providers found.");
        return;
    }

    let id_width = records
        .iter()
        .map(|r| r.id.chars().count())
        .max()
        .unwrap_or(0)
        .min(MAX_ID_WIDTH);

    for record in records {
        let id = truncate(&record.id, id_width);
        let version = record.version.to_string();
        let rest = format!("{}  [{}]", record.name, record.features);
        let rest = truncate(&rest, LINE_BUDGET.saturating_sub(id_width + version.len() + 4));

        println!("{id:<id_width$}  {version}  {rest}");
    }

    println!("\n{} providers", records.len());
}

pub fn print_record(record: &ProviderRecord) {
    println!("ID:          {}", record.id);
    println!("Name:        {}", record.name);
    println!("Version:     {}", record.version);
    println!("Features:    {}", features_label(record));

    if record.parameters.is_empty() {
        println!("Parameters:  none");
        return;
    }

    println!("Parameters:");
    for field in record.parameters.fields() {
        println!("  {}", field_line(field));
    }
}

pub fn print_validation(result: &ValidationResult) {
    if result.is_valid() {
        println!("Configuration is valid.");
        return;
    }

    for (field, message) in result.iter() {
        println!("  {field}: {message}");
    }
}

fn features_label(record: &ProviderRecord) -> String {
    if record.features.is_empty() {
        "none".to_owned()
    } else {
        record.features.to_string()
    }
}

fn field_line(field: &FieldDescriptor) -> String {
    let mut line = format!("{} ({})", field.name, field.field_type);

    if field.display_name.is_some() {
        line.push_str(&format!(" \"{}\"", field.label()));
    }
    if field.required {
        line.push_str(" required");
    }
    if let Some(default) = &field.default {
        line.push_str(&format!(" default={default}"));
    }

    line
}

pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_owned()
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{truncated}…")
    }
}

#[cfg(test)]
mod tests {
    use filerouter::FieldType;

    use super::*;

    #[test]
    fn truncate_short_string_unchanged() {
        assert_eq!(truncate("archive", 10), "archive");
    }

    #[test]
    fn truncate_long_string_adds_ellipsis() {
        assert_eq!(truncate("filerouter.repository.s3", 11), "filerouter…");
    }

    #[test]
    fn field_line_lists_type_and_flags() {
        let field = FieldDescriptor::new("bucket").display_name("Bucket");
        assert_eq!(field_line(&field), "bucket (string) \"Bucket\" required");

        let field = FieldDescriptor::new("public")
            .of_type(FieldType::Boolean)
            .optional()
            .with_default(false);
        assert_eq!(field_line(&field), "public (boolean) default=false");
    }
}
