use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::{ConfigurationSpec, FormDocument};
use crate::feature::FeatureSet;
use crate::record::ProviderRecord;

/// Implementation version of a provider type, serialized as `[major, minor]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "(u32, u32)", into = "(u32, u32)")]
pub struct ProviderVersion {
    pub major: u32,
    pub minor: u32,
}

impl ProviderVersion {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl From<(u32, u32)> for ProviderVersion {
    fn from((major, minor): (u32, u32)) -> Self {
        Self { major, minor }
    }
}

impl From<ProviderVersion> for (u32, u32) {
    fn from(v: ProviderVersion) -> Self {
        (v.major, v.minor)
    }
}

impl fmt::Display for ProviderVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Identifies which implementation produced a provider instance or record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderIdentity {
    /// Stable routing key linking stored instances to a registered type.
    /// Changes whenever a new implementation is incompatible with older
    /// stored configurations.
    pub provider_type_id: String,
    pub provider_version: ProviderVersion,
    /// Short, descriptive name shown in the user interface.
    pub display_name: String,
}

/// Static metadata a provider type supplies once, at registration time.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderDescriptor {
    pub identity: ProviderIdentity,
    pub features: FeatureSet,
    pub configuration_spec: ConfigurationSpec,
}

impl ProviderDescriptor {
    pub fn new(
        provider_type_id: impl Into<String>,
        provider_version: ProviderVersion,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            identity: ProviderIdentity {
                provider_type_id: provider_type_id.into(),
                provider_version,
                display_name: display_name.into(),
            },
            features: FeatureSet::new(),
            configuration_spec: ConfigurationSpec::empty(),
        }
    }

    pub fn with_features(mut self, features: impl Into<FeatureSet>) -> Self {
        self.features = features.into();
        self
    }

    pub fn with_configuration_spec(mut self, spec: ConfigurationSpec) -> Self {
        self.configuration_spec = spec;
        self
    }

    pub fn type_id(&self) -> &str {
        &self.identity.provider_type_id
    }

    /// Project this descriptor into the record shape served by the catalog.
    pub fn to_record(&self) -> ProviderRecord {
        ProviderRecord {
            id: self.identity.provider_type_id.clone(),
            name: self.identity.display_name.clone(),
            version: self.identity.provider_version,
            features: self.features.clone(),
            parameters: self.configuration_spec.clone(),
        }
    }

    pub fn form_document(&self) -> FormDocument {
        self.configuration_spec.form_document(&self.identity.display_name)
    }
}
