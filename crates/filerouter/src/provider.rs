use std::fmt;
use std::io::Read;
use std::sync::Arc;

use futures::stream::BoxStream;

use crate::config::{ConfigurationValue, ValidationResult};
use crate::descriptor::ProviderDescriptor;
use crate::error::{Operation, ProviderError};
use crate::feature::{FeatureFlag, FeatureSet};

/// Readable byte stream handed to [`RepositoryProvider::submit`].
pub type DataSource = Box<dyn Read + Send>;

/// Lazy, finite listing of a repository. Call `list()` again to restart.
pub type FileListing = BoxStream<'static, Result<FileEntry, ProviderError>>;

/// A located file, ready to be read.
pub struct FileHandle {
    pub filespec: String,
    pub size: Option<u64>,
    reader: DataSource,
}

impl FileHandle {
    pub fn new(filespec: impl Into<String>, size: Option<u64>, reader: DataSource) -> Self {
        Self {
            filespec: filespec.into(),
            size,
            reader,
        }
    }

    pub fn into_reader(self) -> DataSource {
        self.reader
    }

    /// Read the whole file into memory.
    pub fn read_to_end(mut self) -> Result<Vec<u8>, ProviderError> {
        let mut buf = Vec::with_capacity(self.size.unwrap_or(0) as usize);
        self.reader.read_to_end(&mut buf)?;
        Ok(buf)
    }
}

impl fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileHandle")
            .field("filespec", &self.filespec)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

/// One entry produced by [`RepositoryProvider::list`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub filespec: String,
    pub size: Option<u64>,
}

/// Outcome of a successful [`RepositoryProvider::submit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransmissionResult {
    pub filespec: String,
    pub bytes_written: u64,
    /// True if an existing file was replaced.
    pub overwritten: bool,
}

/// Everything a provider type needs to build an instance.
///
/// Building an instance must not perform I/O; that happens only in the
/// file operations.
#[derive(Debug, Clone)]
pub struct ProviderContext {
    /// Name of this configured instance, distinct from the provider's display name.
    pub instance_name: String,
    /// Span that instance operations should log under.
    pub span: tracing::Span,
    pub config: ConfigurationValue,
}

/// A configured repository backend.
///
/// Which operations are meaningful is declared by [`Self::features`]; callers
/// check it (see [`ensure_supported`]) before invoking an operation. The
/// default implementations fail with [`ProviderError::Unsupported`].
#[async_trait::async_trait]
pub trait RepositoryProvider: Send + Sync {
    /// Name of this instance.
    fn instance_name(&self) -> &str;

    /// Static metadata of the provider type that built this instance.
    fn descriptor(&self) -> &ProviderDescriptor;

    fn features(&self) -> &FeatureSet {
        &self.descriptor().features
    }

    fn supports(&self, flag: FeatureFlag) -> bool {
        self.features().contains(flag)
    }

    /// Locate a file by provider-specific specification (e.g. a path or URI).
    async fn request(&self, _filespec: &str) -> Result<FileHandle, ProviderError> {
        Err(ProviderError::unsupported(self, Operation::Request))
    }

    /// Write `data` to `filespec`.
    async fn submit(
        &self,
        _filespec: &str,
        _data: DataSource,
    ) -> Result<TransmissionResult, ProviderError> {
        Err(ProviderError::unsupported(self, Operation::Submit))
    }

    /// List the contents of the repository.
    async fn list(&self) -> Result<FileListing, ProviderError> {
        Err(ProviderError::unsupported(self, Operation::List))
    }
}

#[async_trait::async_trait]
impl<T: RepositoryProvider + ?Sized> RepositoryProvider for Arc<T> {
    fn instance_name(&self) -> &str {
        (**self).instance_name()
    }

    fn descriptor(&self) -> &ProviderDescriptor {
        (**self).descriptor()
    }

    fn features(&self) -> &FeatureSet {
        (**self).features()
    }

    async fn request(&self, filespec: &str) -> Result<FileHandle, ProviderError> {
        (**self).request(filespec).await
    }

    async fn submit(
        &self,
        filespec: &str,
        data: DataSource,
    ) -> Result<TransmissionResult, ProviderError> {
        (**self).submit(filespec, data).await
    }

    async fn list(&self) -> Result<FileListing, ProviderError> {
        (**self).list().await
    }
}

/// A kind of repository backend, registered once in the
/// [`ProviderRegistry`](crate::registry::ProviderRegistry).
#[async_trait::async_trait]
pub trait ProviderType: Send + Sync {
    fn descriptor(&self) -> &ProviderDescriptor;

    /// Semantic validation of a configuration (e.g. "host unreachable").
    ///
    /// Structural checks against the configuration spec have already been
    /// made by [`validate`]; implementations only add domain errors.
    async fn validate_configuration(&self, _config: &ConfigurationValue) -> ValidationResult {
        ValidationResult::new()
    }

    fn instantiate(
        &self,
        context: ProviderContext,
    ) -> Result<Box<dyn RepositoryProvider>, ProviderError>;
}

/// Validate `config` against a provider type: structural checks from its
/// configuration spec, then its semantic checks. Structural errors win when
/// both phases report the same field.
pub async fn validate(
    provider_type: &dyn ProviderType,
    config: &ConfigurationValue,
) -> ValidationResult {
    let mut result = provider_type
        .descriptor()
        .configuration_spec
        .validate(config);
    result.merge(provider_type.validate_configuration(config).await);
    result
}

/// Fail with [`ProviderError::Unsupported`] unless `provider` declares the
/// feature `operation` needs.
pub fn ensure_supported<P>(provider: &P, operation: Operation) -> Result<(), ProviderError>
where
    P: RepositoryProvider + ?Sized,
{
    if provider.supports(operation.feature()) {
        Ok(())
    } else {
        Err(ProviderError::unsupported(provider, operation))
    }
}
