pub mod directory;
mod walk;

pub use directory::{LOCAL_PROVIDER_TYPE_ID, LocalDirectoryProvider, LocalDirectoryProviderType};
