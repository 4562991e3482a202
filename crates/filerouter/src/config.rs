use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ProviderError;

/// Message recorded for a required field that was not supplied.
pub const REQUIRED_FIELD_MISSING: &str = "required field missing";

/// Value domain of a configuration field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    String,
    Boolean,
    Integer,
    Number,
}

impl FieldType {
    /// Returns true if `value` belongs to this type's domain.
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Boolean => value.is_boolean(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
        }
    }

    /// Parse a raw textual value (e.g. from a command line) into this type.
    pub fn parse_value(self, raw: &str) -> Option<Value> {
        match self {
            Self::String => Some(Value::String(raw.to_owned())),
            Self::Boolean => raw.parse::<bool>().ok().map(Value::Bool),
            Self::Integer => raw.parse::<i64>().ok().map(Value::from),
            Self::Number => raw
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number),
        }
    }

    fn json_schema_type(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Number => "number",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.json_schema_type())
    }
}

fn default_true() -> bool {
    true
}

/// Describes one configuration parameter collected by a provider's setup form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Key of the item in the configuration value.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
    #[serde(default = "default_true")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl FieldDescriptor {
    /// A required string field with no default.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            field_type: FieldType::String,
            required: true,
            default: None,
        }
    }

    pub fn display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn of_type(mut self, field_type: FieldType) -> Self {
        self.field_type = field_type;
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Label shown in forms; falls back to the field name.
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}

/// Ordered set of field descriptors published by a provider type.
///
/// Field names are unique; construction and deserialization both reject
/// duplicates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<FieldDescriptor>", into = "Vec<FieldDescriptor>")]
pub struct ConfigurationSpec {
    fields: Vec<FieldDescriptor>,
}

impl ConfigurationSpec {
    pub fn new(fields: Vec<FieldDescriptor>) -> Result<Self, ProviderError> {
        let mut seen = HashSet::new();
        for field in &fields {
            if !seen.insert(field.name.as_str()) {
                return Err(ProviderError::DuplicateField(field.name.clone()));
            }
        }
        Ok(Self { fields })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Structural validation: required fields present, present fields typed.
    ///
    /// A required field counts as missing when it is absent, null, or an
    /// empty string, unless the descriptor carries a default. Keys that the
    /// spec does not declare are ignored.
    pub fn validate(&self, config: &ConfigurationValue) -> ValidationResult {
        let mut result = ValidationResult::new();

        for field in &self.fields {
            match config.get(&field.name) {
                None | Some(Value::Null) => {
                    if field.required && field.default.is_none() {
                        result.add(&field.name, REQUIRED_FIELD_MISSING);
                    }
                }
                Some(value) if !field.field_type.accepts(value) => {
                    result.add(&field.name, format!("expected {}", field.field_type));
                }
                Some(Value::String(s)) if s.is_empty() && field.required => {
                    result.add(&field.name, REQUIRED_FIELD_MISSING);
                }
                Some(_) => {}
            }
        }

        result
    }

    /// Fill absent (or null) fields that declare a default.
    pub fn apply_defaults(&self, config: &mut ConfigurationValue) {
        for field in &self.fields {
            let Some(default) = &field.default else {
                continue;
            };
            if matches!(config.get(&field.name), None | Some(Value::Null)) {
                config.insert(field.name.clone(), default.clone());
            }
        }
    }

    /// Render a JSON-Schema style form description for this spec.
    pub fn form_document(&self, title: &str) -> FormDocument {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for field in &self.fields {
            let mut property = Map::new();
            property.insert("title".into(), Value::from(field.label()));
            property.insert(
                "type".into(),
                Value::from(field.field_type.json_schema_type()),
            );
            if let Some(default) = &field.default {
                property.insert("default".into(), default.clone());
            }
            properties.insert(field.name.clone(), Value::Object(property));

            if field.required {
                required.push(Value::from(field.name.as_str()));
            }
        }

        FormDocument(serde_json::json!({
            "title": title,
            "type": "object",
            "required": required,
            "properties": properties,
        }))
    }
}

impl TryFrom<Vec<FieldDescriptor>> for ConfigurationSpec {
    type Error = ProviderError;

    fn try_from(fields: Vec<FieldDescriptor>) -> Result<Self, Self::Error> {
        Self::new(fields)
    }
}

impl From<ConfigurationSpec> for Vec<FieldDescriptor> {
    fn from(spec: ConfigurationSpec) -> Self {
        spec.fields
    }
}

/// Configuration values supplied by a caller, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigurationValue(Map<String, Value>);

impl ConfigurationValue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.0.get(name).and_then(Value::as_bool)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl From<Map<String, Value>> for ConfigurationValue {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Per-field validation errors. Empty means the configuration is valid.
///
/// A field holds at most one message; the first message recorded for a
/// field wins and later ones are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationResult(BTreeMap<String, String>);

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Record an error for `field` unless it already has one.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_insert_with(|| message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    /// Union with `other`, keeping existing messages on conflict.
    pub fn merge(&mut self, other: ValidationResult) {
        for (field, message) in other.0 {
            self.add(field, message);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Convert into a `Result`, failing with `ValidationFailed` when not empty.
    pub fn into_result(self) -> Result<(), ProviderError> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(ProviderError::ValidationFailed(self))
        }
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.iter().map(|(k, v)| format!("{k}: {v}")).collect();
        f.write_str(&parts.join("; "))
    }
}

/// Declarative UI-form description for a provider type. Opaque to this crate
/// beyond rendering it from a [`ConfigurationSpec`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormDocument(pub Value);

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn s3_spec() -> ConfigurationSpec {
        ConfigurationSpec::new(vec![
            FieldDescriptor::new("bucket").display_name("Bucket"),
            FieldDescriptor::new("region").optional(),
            FieldDescriptor::new("public")
                .of_type(FieldType::Boolean)
                .with_default(false),
            FieldDescriptor::new("retries")
                .of_type(FieldType::Integer)
                .optional(),
        ])
        .unwrap()
    }

    #[test]
    fn missing_required_field_is_reported() {
        let result = s3_spec().validate(&ConfigurationValue::new());
        assert_eq!(result.len(), 1);
        assert_eq!(result.get("bucket"), Some(REQUIRED_FIELD_MISSING));
    }

    #[test]
    fn empty_required_string_counts_as_missing() {
        let config = ConfigurationValue::new().with("bucket", "");
        let result = s3_spec().validate(&config);
        assert_eq!(result.get("bucket"), Some(REQUIRED_FIELD_MISSING));
    }

    #[test]
    fn null_counts_as_missing() {
        let config = ConfigurationValue::new().with("bucket", Value::Null);
        assert!(!s3_spec().validate(&config).is_valid());
    }

    #[test]
    fn type_mismatch_is_reported() {
        let config = ConfigurationValue::new()
            .with("bucket", "reports")
            .with("public", "yes")
            .with("retries", 1.5);
        let result = s3_spec().validate(&config);
        assert_eq!(result.get("public"), Some("expected boolean"));
        assert_eq!(result.get("retries"), Some("expected integer"));
        assert!(result.get("bucket").is_none());
    }

    #[test]
    fn valid_configuration_has_no_errors() {
        let config = ConfigurationValue::new()
            .with("bucket", "reports")
            .with("retries", 3)
            .with("unrelated", "ignored");
        assert!(s3_spec().validate(&config).is_valid());
    }

    #[test]
    fn duplicate_field_names_are_rejected() {
        let result = ConfigurationSpec::new(vec![
            FieldDescriptor::new("host"),
            FieldDescriptor::new("host").optional(),
        ]);
        assert!(matches!(result, Err(ProviderError::DuplicateField(name)) if name == "host"));

        let parsed: Result<ConfigurationSpec, _> =
            serde_json::from_str(r#"[{"name": "a"}, {"name": "a"}]"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn descriptor_defaults_when_deserialized() {
        let spec: ConfigurationSpec = serde_json::from_str(r#"[{"name": "host"}]"#).unwrap();
        let field = spec.field("host").unwrap();
        assert_eq!(field.field_type, FieldType::String);
        assert!(field.required);
        assert_eq!(field.label(), "host");
        assert!(field.default.is_none());
    }

    #[test]
    fn apply_defaults_fills_only_absent_fields() {
        let spec = s3_spec();
        let mut config = ConfigurationValue::new().with("bucket", "reports");
        spec.apply_defaults(&mut config);
        assert_eq!(config.get_bool("public"), Some(false));

        let mut config = ConfigurationValue::new().with("public", true);
        spec.apply_defaults(&mut config);
        assert_eq!(config.get_bool("public"), Some(true));
    }

    #[test]
    fn first_message_for_a_field_wins() {
        let mut result = ValidationResult::new();
        result.add("bucket", REQUIRED_FIELD_MISSING);

        let mut semantic = ValidationResult::new();
        semantic.add("bucket", "bucket name invalid");
        semantic.add("region", "unknown region");
        result.merge(semantic);

        assert_eq!(result.get("bucket"), Some(REQUIRED_FIELD_MISSING));
        assert_eq!(result.get("region"), Some("unknown region"));
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn form_document_lists_properties_and_required() {
        let form = s3_spec().form_document("S3");
        assert_eq!(form.0["title"], json!("S3"));
        assert_eq!(form.0["required"], json!(["bucket", "public"]));
        assert_eq!(form.0["properties"]["bucket"]["title"], json!("Bucket"));
        assert_eq!(form.0["properties"]["public"]["type"], json!("boolean"));
        assert_eq!(form.0["properties"]["public"]["default"], json!(false));
    }

    #[test]
    fn parse_value_follows_field_type() {
        assert_eq!(FieldType::Boolean.parse_value("true"), Some(json!(true)));
        assert_eq!(FieldType::Integer.parse_value("42"), Some(json!(42)));
        assert_eq!(FieldType::Integer.parse_value("x"), None);
        assert_eq!(FieldType::String.parse_value("42"), Some(json!("42")));
    }
}
