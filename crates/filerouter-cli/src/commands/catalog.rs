use anyhow::{Result, bail};
use filerouter::{ConfigurationSpec, ConfigurationValue, ProviderRecord};
use filerouter_remote::{Criteria, PagingParams, RepositoryProviderResource};
use futures::TryStreamExt;
use serde_json::Value;

use super::format;

pub async fn list(
    resource: &RepositoryProviderResource,
    filters: &[(String, String)],
    per_page: u32,
    limit: Option<usize>,
) -> Result<()> {
    let criteria = filters
        .iter()
        .fold(Criteria::new(), |c, (key, raw)| c.with(key.as_str(), criterion(raw)));

    let mut stream = resource.find(&criteria, PagingParams::per_page(per_page));
    let mut records = Vec::new();

    while limit.is_none_or(|max| records.len() < max) {
        let Some(handle) = stream.try_next().await? else {
            break;
        };
        let record = handle.ensure_loaded().await?;
        records.push(ProviderRecord::clone(&record));
    }

    format::print_record_table(&records);
    Ok(())
}

pub async fn show(resource: &RepositoryProviderResource, id: &str) -> Result<()> {
    let record = resource.get(id).ensure_loaded().await?;
    format::print_record(&record);
    Ok(())
}

pub async fn validate(
    resource: &RepositoryProviderResource,
    id: &str,
    assignments: &[(String, String)],
) -> Result<()> {
    let handle = resource.get(id);
    let record = handle.ensure_loaded().await?;
    let config = coerce(&record.parameters, assignments)?;

    let result = handle.validate_configuration(&config).await?;
    format::print_validation(&result);

    if !result.is_valid() {
        bail!("configuration for `{id}` has {} error(s)", result.len());
    }
    Ok(())
}

pub async fn form(resource: &RepositoryProviderResource, id: &str) -> Result<()> {
    let document = resource.get(id).get_form().await?;
    println!("{}", serde_json::to_string_pretty(&document)?);
    Ok(())
}

/// Interpret a `--where` value as JSON when it parses, as a string otherwise.
fn criterion(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_owned()))
}

/// Build a configuration from `KEY=VALUE` pairs, typing each value by the
/// field it names. Unknown keys are passed on as strings.
fn coerce(
    spec: &ConfigurationSpec,
    assignments: &[(String, String)],
) -> Result<ConfigurationValue> {
    let mut config = ConfigurationValue::new();

    for (key, raw) in assignments {
        let value = match spec.field(key) {
            Some(field) => match field.field_type.parse_value(raw) {
                Some(value) => value,
                None => bail!("`{key}` expects a {} value, got `{raw}`", field.field_type),
            },
            None => Value::String(raw.clone()),
        };
        config.insert(key.as_str(), value);
    }

    Ok(config)
}
