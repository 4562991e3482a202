use std::path::{Component, Path, PathBuf};

use filerouter::{FileEntry, FileListing, ProviderError};
use futures::stream::{self, StreamExt};
use tokio::fs::{self, ReadDir};

/// Depth-first walk over the regular files below a root directory.
///
/// Directories are opened only as the walk reaches them. Symbolic links are
/// not followed, so the walk never leaves the root.
pub(crate) struct DirWalk {
    root: PathBuf,
    stack: Vec<ReadDir>,
}

impl DirWalk {
    /// Open the root directory. A missing root fails here rather than on the
    /// first poll.
    pub(crate) async fn open(root: PathBuf) -> Result<Self, ProviderError> {
        let top = fs::read_dir(&root).await?;
        Ok(Self {
            root,
            stack: vec![top],
        })
    }

    pub(crate) fn into_listing(self) -> FileListing {
        stream::try_unfold(self, |mut walk| async move {
            let entry = walk.next_file().await?;
            Ok(entry.map(|entry| (entry, walk)))
        })
        .boxed()
    }

    async fn next_file(&mut self) -> Result<Option<FileEntry>, ProviderError> {
        while let Some(dir) = self.stack.last_mut() {
            let Some(entry) = dir.next_entry().await? else {
                self.stack.pop();
                continue;
            };

            let file_type = entry.file_type().await?;
            let path = entry.path();

            if file_type.is_dir() {
                self.stack.push(fs::read_dir(&path).await?);
                continue;
            }

            if !file_type.is_file() {
                continue;
            }

            let size = entry.metadata().await.ok().map(|m| m.len());
            return Ok(Some(FileEntry {
                filespec: to_filespec(&self.root, &path),
                size,
            }));
        }

        Ok(None)
    }
}

/// `/`-separated path of `path` relative to `root`.
fn to_filespec(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
