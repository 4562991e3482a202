use std::io::{self, ErrorKind};
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use filerouter::{
    ConfigurationSpec, ConfigurationValue, DataSource, FeatureFlag, FieldDescriptor, FieldType,
    FileHandle, FileListing, ProviderContext, ProviderDescriptor, ProviderError, ProviderType,
    ProviderVersion, REQUIRED_FIELD_MISSING, RepositoryProvider, TransmissionResult,
    ValidationResult,
};
use tempfile::NamedTempFile;
use tokio::fs;
use tokio::task;

use crate::walk::DirWalk;

pub const LOCAL_PROVIDER_TYPE_ID: &str = "filerouter.repository.local";

static DESCRIPTOR: LazyLock<ProviderDescriptor> = LazyLock::new(|| {
    ProviderDescriptor::new(LOCAL_PROVIDER_TYPE_ID, ProviderVersion::new(1, 0), "Local Directory")
        .with_features([FeatureFlag::List, FeatureFlag::Retrieve, FeatureFlag::Submit])
        .with_configuration_spec(
            ConfigurationSpec::new(vec![
                FieldDescriptor::new("root").display_name("Root directory"),
                FieldDescriptor::new("allow_overwrite")
                    .display_name("Allow overwriting")
                    .of_type(FieldType::Boolean)
                    .optional()
                    .with_default(false),
            ])
            .expect("local directory configuration spec has unique field names"),
        )
});

/// Repository backed by a directory on the local filesystem.
///
/// Filespecs are `/`-separated paths relative to the configured root.
/// Absolute paths and `..` components are rejected, and so is any filespec
/// that a symbolic link resolves to a location outside the root. Listings
/// skip symbolic links entirely.
///
/// Submitted data is staged in a temporary file next to the target and moved
/// into place only once it has been written completely.
pub struct LocalDirectoryProvider {
    name: String,
    root: PathBuf,
    allow_overwrite: bool,
    span: tracing::Span,
}

impl LocalDirectoryProvider {
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
            allow_overwrite: false,
            span: tracing::Span::none(),
        }
    }

    pub fn with_overwrite(mut self, allow_overwrite: bool) -> Self {
        self.allow_overwrite = allow_overwrite;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, filespec: &str) -> Result<PathBuf, ProviderError> {
        if filespec.is_empty() {
            return Err(ProviderError::invalid_filespec(filespec, "filespec is empty"));
        }

        let relative = Path::new(filespec);
        for component in relative.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                Component::ParentDir => {
                    return Err(ProviderError::invalid_filespec(
                        filespec,
                        "must not contain '..'",
                    ));
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(ProviderError::invalid_filespec(filespec, "must be relative"));
                }
            }
        }

        Ok(self.root.join(relative))
    }

    /// Fail unless `path`, or its nearest existing ancestor, resolves to a
    /// location inside the root once symbolic links are followed.
    async fn confine(&self, filespec: &str, path: &Path) -> Result<(), ProviderError> {
        let root = fs::canonicalize(&self.root).await?;

        for candidate in path.ancestors() {
            match fs::canonicalize(candidate).await {
                Ok(resolved) if resolved.starts_with(&root) => return Ok(()),
                Ok(_) => break,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(ProviderError::invalid_filespec(
            filespec,
            "resolves outside the repository root",
        ))
    }
}

/// Copy `data` into a temporary file in `dir`, then move it to `path`.
///
/// Returns the byte count and whether an existing file was replaced. Without
/// `allow_overwrite` the final move refuses to replace anything, failing with
/// `AlreadyExists`.
fn write_staged(
    dir: &Path,
    path: &Path,
    mut data: DataSource,
    allow_overwrite: bool,
) -> io::Result<(u64, bool)> {
    let mut staged = NamedTempFile::new_in(dir)?;
    let bytes_written = io::copy(&mut data, &mut staged)?;
    staged.as_file().sync_all()?;

    if allow_overwrite {
        let existed = path.is_file();
        staged.persist(path).map_err(|e| e.error)?;
        Ok((bytes_written, existed))
    } else {
        staged.persist_noclobber(path).map_err(|e| e.error)?;
        Ok((bytes_written, false))
    }
}

#[async_trait::async_trait]
impl RepositoryProvider for LocalDirectoryProvider {
    fn instance_name(&self) -> &str {
        &self.name
    }

    fn descriptor(&self) -> &ProviderDescriptor {
        &DESCRIPTOR
    }

    async fn request(&self, filespec: &str) -> Result<FileHandle, ProviderError> {
        let path = self.resolve(filespec)?;
        self.confine(filespec, &path).await?;
        tracing::debug!(parent: &self.span, filespec, "request");

        let file = match fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ProviderError::file_not_found(self, filespec));
            }
            Err(e) => return Err(e.into()),
        };

        let metadata = file.metadata().await?;
        if !metadata.is_file() {
            return Err(ProviderError::file_not_found(self, filespec));
        }

        let reader = file.into_std().await;
        Ok(FileHandle::new(filespec, Some(metadata.len()), Box::new(reader)))
    }

    async fn submit(
        &self,
        filespec: &str,
        data: DataSource,
    ) -> Result<TransmissionResult, ProviderError> {
        let path = self.resolve(filespec)?;
        self.confine(filespec, &path).await?;
        tracing::debug!(parent: &self.span, filespec, "submit");

        if !self.allow_overwrite && fs::try_exists(&path).await? {
            return Err(ProviderError::file_exists(self, filespec));
        }

        let dir = path.parent().map_or_else(|| self.root.clone(), Path::to_path_buf);
        fs::create_dir_all(&dir).await?;

        let allow_overwrite = self.allow_overwrite;
        let written = task::spawn_blocking(move || write_staged(&dir, &path, data, allow_overwrite))
            .await
            .map_err(|e| ProviderError::Io(io::Error::other(e)))?;

        let (bytes_written, overwritten) = match written {
            Ok(result) => result,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(ProviderError::file_exists(self, filespec));
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!(parent: &self.span, filespec, bytes_written, overwritten, "file submitted");

        Ok(TransmissionResult {
            filespec: filespec.to_owned(),
            bytes_written,
            overwritten,
        })
    }

    async fn list(&self) -> Result<FileListing, ProviderError> {
        tracing::debug!(parent: &self.span, root = %self.root.display(), "list");
        let walk = DirWalk::open(self.root.clone()).await?;
        Ok(walk.into_listing())
    }
}

/// Provider type building [`LocalDirectoryProvider`]s.
#[derive(Debug, Default)]
pub struct LocalDirectoryProviderType;

impl LocalDirectoryProviderType {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl ProviderType for LocalDirectoryProviderType {
    fn descriptor(&self) -> &ProviderDescriptor {
        &DESCRIPTOR
    }

    async fn validate_configuration(&self, config: &ConfigurationValue) -> ValidationResult {
        let mut result = ValidationResult::new();

        if let Some(root) = config.get_str("root").filter(|r| !r.is_empty()) {
            match fs::metadata(root).await {
                Ok(m) if m.is_dir() => {}
                Ok(_) => result.add("root", "not a directory"),
                Err(_) => result.add("root", "directory does not exist"),
            }
        }

        result
    }

    fn instantiate(
        &self,
        context: ProviderContext,
    ) -> Result<Box<dyn RepositoryProvider>, ProviderError> {
        let Some(root) = context.config.get_str("root") else {
            let mut errors = ValidationResult::new();
            errors.add("root", REQUIRED_FIELD_MISSING);
            return Err(ProviderError::ValidationFailed(errors));
        };

        let provider = LocalDirectoryProvider {
            name: context.instance_name,
            root: PathBuf::from(root),
            allow_overwrite: context.config.get_bool("allow_overwrite").unwrap_or(false),
            span: context.span,
        };

        Ok(Box::new(provider))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io::{Cursor, Read};

    use filerouter::ErrorKind as ProviderErrorKind;

    use super::*;

    /// Yields a few bytes, then fails.
    struct BrokenSource {
        sent: bool,
    }

    impl Read for BrokenSource {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.sent {
                return Err(io::Error::other("source broke"));
            }
            self.sent = true;
            let n = buf.len().min(4);
            buf[..n].copy_from_slice(&b"part"[..n]);
            Ok(n)
        }
    }

    fn file_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn rejects_escaping_filespecs() {
        let dir = tempfile::tempdir().unwrap();
        let provider = LocalDirectoryProvider::new("local", dir.path());

        for filespec in ["../outside.txt", "a/../../b", "/etc/passwd", ""] {
            let err = provider.request(filespec).await.unwrap_err();
            assert!(
                matches!(err, ProviderError::InvalidFilespec { .. }),
                "{filespec:?} should be rejected, got {err}"
            );
        }
    }

    #[tokio::test]
    async fn directories_are_not_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        let provider = LocalDirectoryProvider::new("local", dir.path());

        let err = provider.request("sub").await.unwrap_err();
        assert_eq!(err.kind(), ProviderErrorKind::NotFound);
    }

    #[tokio::test]
    async fn submit_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let provider = LocalDirectoryProvider::new("local", dir.path());

        let result = provider
            .submit("2024/q1/report.csv", Box::new(Cursor::new(b"a,b".to_vec())))
            .await
            .unwrap();

        assert_eq!(result.bytes_written, 3);
        assert!(!result.overwritten);
        assert_eq!(
            fs::read_to_string(dir.path().join("2024/q1/report.csv")).unwrap(),
            "a,b"
        );
    }

    #[tokio::test]
    async fn failed_overwrite_keeps_existing_content() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("report.csv"), "original").unwrap();
        let provider = LocalDirectoryProvider::new("local", dir.path()).with_overwrite(true);

        let err = provider
            .submit("report.csv", Box::new(BrokenSource { sent: false }))
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::Io(_)));
        assert_eq!(
            fs::read_to_string(dir.path().join("report.csv")).unwrap(),
            "original"
        );
        assert_eq!(file_names(dir.path()), vec!["report.csv"]);
    }

    #[tokio::test]
    async fn failed_submit_leaves_no_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let provider = LocalDirectoryProvider::new("local", dir.path());

        let result = provider
            .submit("new.csv", Box::new(BrokenSource { sent: false }))
            .await;

        assert!(result.is_err());
        assert!(file_names(dir.path()).is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlinks_out_of_root_are_rejected() {
        let outside = tempfile::tempdir().unwrap();
        fs::write(outside.path().join("secret.txt"), "s").unwrap();

        let dir = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("link")).unwrap();
        std::os::unix::fs::symlink(
            outside.path().join("secret.txt"),
            dir.path().join("alias.txt"),
        )
        .unwrap();
        let provider = LocalDirectoryProvider::new("local", dir.path()).with_overwrite(true);

        for filespec in ["link/secret.txt", "alias.txt"] {
            let err = provider.request(filespec).await.unwrap_err();
            assert!(
                matches!(err, ProviderError::InvalidFilespec { .. }),
                "{filespec:?} should be rejected, got {err}"
            );
        }

        let err = provider
            .submit("link/new/dropped.txt", Box::new(Cursor::new(b"x".to_vec())))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidFilespec { .. }));
        assert_eq!(file_names(outside.path()), vec!["secret.txt"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlinks_inside_root_are_followed() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("data")).unwrap();
        fs::write(dir.path().join("data/a.txt"), "a").unwrap();
        std::os::unix::fs::symlink(dir.path().join("data"), dir.path().join("current")).unwrap();
        let provider = LocalDirectoryProvider::new("local", dir.path());

        let handle = provider.request("current/a.txt").await.unwrap();
        assert_eq!(handle.read_to_end().unwrap(), b"a");
    }

    #[tokio::test]
    async fn semantic_validation_checks_root() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("file.txt");
        fs::write(&file, "x").unwrap();
        let provider_type = LocalDirectoryProviderType::new();

        let ok = ConfigurationValue::new().with("root", dir.path().to_string_lossy().into_owned());
        assert!(provider_type.validate_configuration(&ok).await.is_valid());

        let missing = ConfigurationValue::new()
            .with("root", dir.path().join("nope").to_string_lossy().into_owned());
        let result = provider_type.validate_configuration(&missing).await;
        assert_eq!(result.get("root"), Some("directory does not exist"));

        let not_dir = ConfigurationValue::new().with("root", file.to_string_lossy().into_owned());
        let result = provider_type.validate_configuration(&not_dir).await;
        assert_eq!(result.get("root"), Some("not a directory"));
    }
}
