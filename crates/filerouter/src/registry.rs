use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::{ConfigurationValue, FormDocument, ValidationResult};
use crate::descriptor::ProviderDescriptor;
use crate::error::ProviderError;
use crate::provider::{self, ProviderContext, ProviderType, RepositoryProvider};
use crate::record::ProviderRecord;

/// A configured provider instance as persisted by an application: which
/// type to build, under what name, and with which configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredProvider {
    pub name: String,
    #[serde(rename = "type")]
    pub provider_type: String,
    #[serde(default)]
    pub config: ConfigurationValue,
}

/// Collects provider types before the registry is frozen.
#[derive(Default)]
pub struct ProviderRegistryBuilder {
    types: BTreeMap<String, Arc<dyn ProviderType>>,
}

impl ProviderRegistryBuilder {
    pub fn register<T>(self, provider_type: T) -> Result<Self, ProviderError>
    where
        T: ProviderType + 'static,
    {
        self.register_arc(Arc::new(provider_type))
    }

    pub fn register_arc(
        mut self,
        provider_type: Arc<dyn ProviderType>,
    ) -> Result<Self, ProviderError> {
        let type_id = provider_type.descriptor().type_id().to_owned();
        if self.types.contains_key(&type_id) {
            return Err(ProviderError::DuplicateProviderType(type_id));
        }
        self.types.insert(type_id, provider_type);
        Ok(self)
    }

    pub fn build(self) -> ProviderRegistry {
        ProviderRegistry { types: self.types }
    }
}

/// Table of known provider types, keyed by provider type id.
///
/// Built once at startup and not mutated afterwards; share it behind an `Arc`.
pub struct ProviderRegistry {
    types: BTreeMap<String, Arc<dyn ProviderType>>,
}

impl ProviderRegistry {
    pub fn builder() -> ProviderRegistryBuilder {
        ProviderRegistryBuilder::default()
    }

    pub fn provider_type(&self, type_id: &str) -> Result<&Arc<dyn ProviderType>, ProviderError> {
        self.types
            .get(type_id)
            .ok_or_else(|| ProviderError::UnknownProviderType(type_id.to_owned()))
    }

    /// Descriptors of all registered types, ordered by type id.
    pub fn descriptors(&self) -> impl Iterator<Item = &ProviderDescriptor> {
        self.types.values().map(|t| t.descriptor())
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Catalog records for every registered type.
    pub fn catalog(&self) -> Vec<ProviderRecord> {
        self.descriptors().map(ProviderDescriptor::to_record).collect()
    }

    pub fn record(&self, type_id: &str) -> Result<ProviderRecord, ProviderError> {
        self.types
            .get(type_id)
            .map(|t| t.descriptor().to_record())
            .ok_or_else(|| ProviderError::RecordNotFound(type_id.to_owned()))
    }

    pub fn form(&self, type_id: &str) -> Result<FormDocument, ProviderError> {
        self.types
            .get(type_id)
            .map(|t| t.descriptor().form_document())
            .ok_or_else(|| ProviderError::RecordNotFound(type_id.to_owned()))
    }

    /// Run both validation phases for `config` against the named type.
    /// Defaults are applied before validating.
    pub async fn validate(
        &self,
        type_id: &str,
        config: &ConfigurationValue,
    ) -> Result<ValidationResult, ProviderError> {
        let provider_type = self.provider_type(type_id)?;
        let config = with_defaults(provider_type.descriptor(), config);
        Ok(provider::validate(provider_type.as_ref(), &config).await)
    }

    /// Build a live provider for a stored instance.
    ///
    /// Fails with `UnknownProviderType` if the type is not registered and
    /// with `ValidationFailed` if the stored configuration does not validate.
    pub async fn instantiate(
        &self,
        stored: &StoredProvider,
    ) -> Result<Box<dyn RepositoryProvider>, ProviderError> {
        let provider_type = self.provider_type(&stored.provider_type)?;
        let descriptor = provider_type.descriptor();
        let config = with_defaults(descriptor, &stored.config);

        let errors = provider::validate(provider_type.as_ref(), &config).await;
        if !errors.is_valid() {
            tracing::warn!(
                name = %stored.name,
                provider = %descriptor.type_id(),
                errors = %errors,
                "stored configuration failed validation"
            );
            return Err(ProviderError::ValidationFailed(errors));
        }

        let span = tracing::info_span!(
            "repository",
            name = %stored.name,
            provider = %descriptor.type_id(),
            version = %descriptor.identity.provider_version,
        );
        tracing::debug!(parent: &span, "instantiating provider");

        provider_type.instantiate(ProviderContext {
            instance_name: stored.name.clone(),
            span,
            config,
        })
    }
}

fn with_defaults(
    descriptor: &ProviderDescriptor,
    config: &ConfigurationValue,
) -> ConfigurationValue {
    let mut config = config.clone();
    descriptor.configuration_spec.apply_defaults(&mut config);
    config
}
