use std::fmt;

use crate::config::ValidationResult;
use crate::feature::FeatureFlag;
use crate::provider::RepositoryProvider;

/// A file operation offered by a repository provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Request,
    Submit,
    List,
}

impl Operation {
    /// The feature flag a provider must declare to offer this operation.
    pub fn feature(self) -> FeatureFlag {
        match self {
            Self::Request => FeatureFlag::Retrieve,
            Self::Submit => FeatureFlag::Submit,
            Self::List => FeatureFlag::List,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request => write!(f, "request"),
            Self::Submit => write!(f, "submit"),
            Self::List => write!(f, "list"),
        }
    }
}

/// Coarse classification of a [`ProviderError`].
///
/// UI layers use this to decide how to present a failure: `RemoteUnavailable`
/// is worth retrying, `NotFound` is not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    UnsupportedOperation,
    ValidationFailed,
    ReadOnlyViolation,
    RemoteUnavailable,
    Invalid,
    Internal,
}

/// Errors raised by providers, the registry, and the remote catalog gateway.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("{provider} {repository} does not have the requested file ({filespec})")]
    FileNotFound {
        provider: String,
        repository: String,
        filespec: String,
    },

    #[error("{provider} {repository} already has file {filespec} and does not permit overwriting")]
    FileExists {
        provider: String,
        repository: String,
        filespec: String,
    },

    #[error("provider record not found: {0}")]
    RecordNotFound(String),

    #[error("invalid filespec {filespec:?}: {reason}")]
    InvalidFilespec { filespec: String, reason: String },

    #[error("{provider} does not support {operation}")]
    Unsupported {
        provider: String,
        operation: Operation,
    },

    #[error("configuration is invalid: {0}")]
    ValidationFailed(ValidationResult),

    #[error("providers may not be modified ({0})")]
    ReadOnly(&'static str),

    #[error("remote unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("unknown provider type: {0}")]
    UnknownProviderType(String),

    #[error("provider type registered twice: {0}")]
    DuplicateProviderType(String),

    #[error("configuration field declared twice: {0}")]
    DuplicateField(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProviderError {
    pub fn file_not_found<P>(repository: &P, filespec: impl Into<String>) -> Self
    where
        P: RepositoryProvider + ?Sized,
    {
        Self::FileNotFound {
            provider: repository.descriptor().identity.display_name.clone(),
            repository: repository.instance_name().to_owned(),
            filespec: filespec.into(),
        }
    }

    pub fn file_exists<P>(repository: &P, filespec: impl Into<String>) -> Self
    where
        P: RepositoryProvider + ?Sized,
    {
        Self::FileExists {
            provider: repository.descriptor().identity.display_name.clone(),
            repository: repository.instance_name().to_owned(),
            filespec: filespec.into(),
        }
    }

    pub fn unsupported<P>(repository: &P, operation: Operation) -> Self
    where
        P: RepositoryProvider + ?Sized,
    {
        Self::Unsupported {
            provider: repository.descriptor().identity.display_name.clone(),
            operation,
        }
    }

    pub fn invalid_filespec(filespec: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidFilespec {
            filespec: filespec.into(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::FileNotFound { .. } | Self::RecordNotFound(_) => ErrorKind::NotFound,
            Self::FileExists { .. } => ErrorKind::AlreadyExists,
            Self::Unsupported { .. } => ErrorKind::UnsupportedOperation,
            Self::ValidationFailed(_) => ErrorKind::ValidationFailed,
            Self::ReadOnly(_) => ErrorKind::ReadOnlyViolation,
            Self::RemoteUnavailable(_) => ErrorKind::RemoteUnavailable,
            Self::InvalidFilespec { .. }
            | Self::UnknownProviderType(_)
            | Self::DuplicateProviderType(_)
            | Self::DuplicateField(_) => ErrorKind::Invalid,
            Self::Parse(_) | Self::Io(_) => ErrorKind::Internal,
        }
    }

    /// Returns true if repeating the call may succeed without any change on
    /// the caller's side.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::RemoteUnavailable
    }
}
