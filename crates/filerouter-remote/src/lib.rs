pub mod criteria;
pub mod handle;
pub mod resource;

pub use criteria::{Criteria, PagingParams};
pub use handle::RemoteRepositoryProvider;
pub use resource::{RESOURCE_PATH, RepositoryProviderResource, ResourceConfig};
