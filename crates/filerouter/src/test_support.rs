use std::collections::BTreeMap;
use std::io::{Cursor, Read};
use std::sync::{LazyLock, Mutex, PoisonError};

use futures::stream;

use crate::config::{
    ConfigurationSpec, ConfigurationValue, FieldDescriptor, FieldType, ValidationResult,
};
use crate::descriptor::{ProviderDescriptor, ProviderVersion};
use crate::error::ProviderError;
use crate::feature::{FeatureFlag, FeatureSet};
use crate::provider::{
    DataSource, FileEntry, FileHandle, FileListing, ProviderContext, ProviderType,
    RepositoryProvider, TransmissionResult,
};

pub const IN_MEMORY_PROVIDER_TYPE_ID: &str = "filerouter.repository.memory";

static DESCRIPTOR: LazyLock<ProviderDescriptor> = LazyLock::new(|| {
    ProviderDescriptor::new(IN_MEMORY_PROVIDER_TYPE_ID, ProviderVersion::new(1, 0), "In-Memory")
        .with_features(FeatureFlag::all())
        .with_configuration_spec(
            ConfigurationSpec::new(vec![
                FieldDescriptor::new("label").display_name("Label"),
                FieldDescriptor::new("namespace").optional(),
                FieldDescriptor::new("allow_overwrite")
                    .display_name("Allow overwriting")
                    .of_type(FieldType::Boolean)
                    .optional()
                    .with_default(false),
            ])
            .expect("in-memory configuration spec has unique field names"),
        )
});

/// In-memory repository for testing. Files live in a map keyed by filespec.
pub struct InMemoryProvider {
    name: String,
    descriptor: ProviderDescriptor,
    allow_overwrite: bool,
    files: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            descriptor: DESCRIPTOR.clone(),
            allow_overwrite: false,
            files: Mutex::new(BTreeMap::new()),
        }
    }

    /// Restrict the declared features.
    pub fn with_features(mut self, features: impl Into<FeatureSet>) -> Self {
        self.descriptor.features = features.into();
        self
    }

    pub fn with_overwrite(mut self, allow_overwrite: bool) -> Self {
        self.allow_overwrite = allow_overwrite;
        self
    }

    pub fn add(&self, filespec: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.files().insert(filespec.into(), content.into());
    }

    pub fn contents(&self, filespec: &str) -> Option<Vec<u8>> {
        self.files().get(filespec).cloned()
    }

    fn files(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Vec<u8>>> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait::async_trait]
impl RepositoryProvider for InMemoryProvider {
    fn instance_name(&self) -> &str {
        &self.name
    }

    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    async fn request(&self, filespec: &str) -> Result<FileHandle, ProviderError> {
        let content = self
            .contents(filespec)
            .ok_or_else(|| ProviderError::file_not_found(self, filespec))?;
        let size = content.len() as u64;
        Ok(FileHandle::new(filespec, Some(size), Box::new(Cursor::new(content))))
    }

    async fn submit(
        &self,
        filespec: &str,
        mut data: DataSource,
    ) -> Result<TransmissionResult, ProviderError> {
        if !self.allow_overwrite && self.files().contains_key(filespec) {
            return Err(ProviderError::file_exists(self, filespec));
        }

        let mut content = Vec::new();
        data.read_to_end(&mut content)?;
        let bytes_written = content.len() as u64;

        let mut files = self.files();
        if !self.allow_overwrite && files.contains_key(filespec) {
            return Err(ProviderError::file_exists(self, filespec));
        }
        let overwritten = files.insert(filespec.to_owned(), content).is_some();

        Ok(TransmissionResult {
            filespec: filespec.to_owned(),
            bytes_written,
            overwritten,
        })
    }

    async fn list(&self) -> Result<FileListing, ProviderError> {
        let entries: Vec<Result<FileEntry, ProviderError>> = self
            .files()
            .iter()
            .map(|(filespec, content)| {
                Ok(FileEntry {
                    filespec: filespec.clone(),
                    size: Some(content.len() as u64),
                })
            })
            .collect();
        Ok(Box::pin(stream::iter(entries)))
    }
}

/// Provider type building [`InMemoryProvider`]s.
#[derive(Debug, Default)]
pub struct InMemoryProviderType;

impl InMemoryProviderType {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl ProviderType for InMemoryProviderType {
    fn descriptor(&self) -> &ProviderDescriptor {
        &DESCRIPTOR
    }

    async fn validate_configuration(&self, config: &ConfigurationValue) -> ValidationResult {
        let mut result = ValidationResult::new();
        if config.get_str("namespace").is_some_and(|ns| ns.contains('/')) {
            result.add("namespace", "namespace must not contain '/'");
        }
        result
    }

    fn instantiate(
        &self,
        context: ProviderContext,
    ) -> Result<Box<dyn RepositoryProvider>, ProviderError> {
        let allow_overwrite = context.config.get_bool("allow_overwrite").unwrap_or(false);
        Ok(Box::new(
            InMemoryProvider::new(context.instance_name).with_overwrite(allow_overwrite),
        ))
    }
}
