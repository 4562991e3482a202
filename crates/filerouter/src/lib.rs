pub mod base;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod feature;
pub mod provider;
pub mod record;
pub mod registry;

pub use base::{BASE_PROVIDER_TYPE_ID, UnconfiguredProvider, UnconfiguredProviderType};
pub use config::{
    ConfigurationSpec, ConfigurationValue, FieldDescriptor, FieldType, FormDocument,
    REQUIRED_FIELD_MISSING, ValidationResult,
};
pub use descriptor::{ProviderDescriptor, ProviderIdentity, ProviderVersion};
pub use error::{ErrorKind, Operation, ProviderError};
pub use feature::{FeatureFlag, FeatureSet};
pub use provider::{
    DataSource, FileEntry, FileHandle, FileListing, ProviderContext, ProviderType,
    RepositoryProvider, TransmissionResult, ensure_supported, validate,
};
pub use record::ProviderRecord;
pub use registry::{ProviderRegistry, ProviderRegistryBuilder, StoredProvider};

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
