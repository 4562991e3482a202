use std::sync::{Arc, PoisonError, RwLock};

use filerouter::{ConfigurationValue, FormDocument, ProviderError, ProviderRecord, ValidationResult};

use crate::resource::RepositoryProviderResource;

/// Read-only, lazily loaded view of one provider record in the remote catalog.
///
/// Attributes are read from a [`ProviderRecord`] snapshot obtained through
/// [`Self::ensure_loaded`] or [`Self::reload`]. The cached snapshot is
/// replaced as a whole, and only after a fetch has completed, so a cancelled
/// fetch leaves it untouched.
#[derive(Debug)]
pub struct RemoteRepositoryProvider {
    id: String,
    resource: RepositoryProviderResource,
    cached: RwLock<Option<Arc<ProviderRecord>>>,
}

impl RemoteRepositoryProvider {
    pub(crate) fn unhydrated(resource: RepositoryProviderResource, id: String) -> Self {
        Self {
            id,
            resource,
            cached: RwLock::new(None),
        }
    }

    pub(crate) fn hydrated(resource: RepositoryProviderResource, record: ProviderRecord) -> Self {
        Self {
            id: record.id.clone(),
            resource,
            cached: RwLock::new(Some(Arc::new(record))),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The cached record, if one has been loaded.
    pub fn cached(&self) -> Option<Arc<ProviderRecord>> {
        self.cached
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.cached().is_some()
    }

    /// Fetch the record again and replace the cached snapshot.
    pub async fn reload(&self) -> Result<Arc<ProviderRecord>, ProviderError> {
        let record = Arc::new(self.resource.get_record(&self.id).await?);
        *self.cached.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&record));
        Ok(record)
    }

    /// The cached snapshot, loading it first if necessary.
    pub async fn ensure_loaded(&self) -> Result<Arc<ProviderRecord>, ProviderError> {
        match self.cached() {
            Some(record) => Ok(record),
            None => self.reload().await,
        }
    }

    pub async fn save(&self) -> Result<(), ProviderError> {
        Err(ProviderError::ReadOnly("save"))
    }

    pub async fn delete(&self) -> Result<(), ProviderError> {
        Err(ProviderError::ReadOnly("delete"))
    }

    /// Pass `configuration` to the remote implementation for validation.
    pub async fn validate_configuration(
        &self,
        configuration: &ConfigurationValue,
    ) -> Result<ValidationResult, ProviderError> {
        self.resource
            .validate_configuration(&self.id, configuration)
            .await
    }

    pub async fn get_form(&self) -> Result<FormDocument, ProviderError> {
        self.resource.get_form(&self.id).await
    }
}
