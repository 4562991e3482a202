use std::sync::LazyLock;

use crate::descriptor::{ProviderDescriptor, ProviderVersion};
use crate::error::ProviderError;
use crate::provider::{ProviderContext, ProviderType, RepositoryProvider};

pub const BASE_PROVIDER_TYPE_ID: &str = "filerouter.repository.base";

static DESCRIPTOR: LazyLock<ProviderDescriptor> = LazyLock::new(|| {
    ProviderDescriptor::new(BASE_PROVIDER_TYPE_ID, ProviderVersion::new(0, 1), "Base Provider")
});

/// Provider with no features and no configuration.
///
/// Every file operation fails with `Unsupported`. Stands in for instances
/// whose real type is not available yet, e.g. while a registry is being set up.
#[derive(Debug, Clone)]
pub struct UnconfiguredProvider {
    name: String,
}

impl UnconfiguredProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl RepositoryProvider for UnconfiguredProvider {
    fn instance_name(&self) -> &str {
        &self.name
    }

    fn descriptor(&self) -> &ProviderDescriptor {
        &DESCRIPTOR
    }
}

/// Provider type that builds [`UnconfiguredProvider`]s.
#[derive(Debug, Default)]
pub struct UnconfiguredProviderType;

impl ProviderType for UnconfiguredProviderType {
    fn descriptor(&self) -> &ProviderDescriptor {
        &DESCRIPTOR
    }

    fn instantiate(
        &self,
        context: ProviderContext,
    ) -> Result<Box<dyn RepositoryProvider>, ProviderError> {
        Ok(Box::new(UnconfiguredProvider::new(context.instance_name)))
    }
}
