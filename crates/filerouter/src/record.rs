use serde::{Deserialize, Serialize};

use crate::config::ConfigurationSpec;
use crate::descriptor::ProviderVersion;
use crate::feature::{FeatureFlag, FeatureSet};

/// Catalog representation of one provider type, as served by the remote.
///
/// Records are immutable snapshots; the server is the only writer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderRecord {
    pub id: String,
    pub name: String,
    pub version: ProviderVersion,
    #[serde(default)]
    pub features: FeatureSet,
    #[serde(default)]
    pub parameters: ConfigurationSpec,
}

impl ProviderRecord {
    pub fn provider_type_id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> ProviderVersion {
        self.version
    }

    pub fn features(&self) -> &FeatureSet {
        &self.features
    }

    pub fn parameters(&self) -> &ConfigurationSpec {
        &self.parameters
    }

    pub fn supports(&self, flag: FeatureFlag) -> bool {
        self.features.contains(flag)
    }
}
