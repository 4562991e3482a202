use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use filerouter::{
    FileEntry, Operation, ProviderRegistry, RepositoryProvider, StoredProvider, ensure_supported,
};
use futures::TryStreamExt;

use super::format;

/// Print the repositories from the config file and their provider types.
pub fn list(repositories: &[StoredProvider], registry: &ProviderRegistry) {
    if repositories.is_empty() {
        println!("No repositories configured.");
        return;
    }

    let name_width = repositories
        .iter()
        .map(|r| r.name.chars().count())
        .max()
        .unwrap_or(0);

    for repo in repositories {
        let kind = match registry.provider_type(&repo.provider_type) {
            Ok(provider_type) => provider_type.descriptor().identity.display_name.clone(),
            Err(_) => format!("{} (unknown type)", repo.provider_type),
        };
        println!("{:<width$}  {kind}", repo.name, width = name_width);
    }
}

async fn open(
    registry: &ProviderRegistry,
    stored: &StoredProvider,
) -> Result<Box<dyn RepositoryProvider>> {
    registry
        .instantiate(stored)
        .await
        .with_context(|| format!("could not open repository `{}`", stored.name))
}

pub async fn ls(registry: &ProviderRegistry, stored: &StoredProvider) -> Result<()> {
    let provider = open(registry, stored).await?;
    ensure_supported(provider.as_ref(), Operation::List)?;

    let mut entries: Vec<FileEntry> = provider.list().await?.try_collect().await?;
    entries.sort_by(|a, b| a.filespec.cmp(&b.filespec));

    for entry in &entries {
        let size = entry.size.map(|s| s.to_string()).unwrap_or_else(|| "-".into());
        println!("{size:>10}  {}", format::truncate(&entry.filespec, 100));
    }
    println!("\n{} files", entries.len());

    Ok(())
}

/// Copy `filespec` to `output`, or to stdout when no output path is given.
pub async fn get(
    registry: &ProviderRegistry,
    stored: &StoredProvider,
    filespec: &str,
    output: Option<&Path>,
) -> Result<()> {
    let provider = open(registry, stored).await?;
    ensure_supported(provider.as_ref(), Operation::Request)?;

    let handle = provider.request(filespec).await?;
    let mut reader = handle.into_reader();

    match output {
        Some(path) => {
            let mut file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            let n = io::copy(&mut reader, &mut file)?;
            eprintln!("Wrote {n} bytes to {}", path.display());
        }
        None => {
            let mut stdout = io::stdout().lock();
            io::copy(&mut reader, &mut stdout)?;
            stdout.flush()?;
        }
    }

    Ok(())
}

pub async fn put(
    registry: &ProviderRegistry,
    stored: &StoredProvider,
    filespec: &str,
    source: &Path,
) -> Result<()> {
    let provider = open(registry, stored).await?;
    ensure_supported(provider.as_ref(), Operation::Submit)?;

    let file =
        File::open(source).with_context(|| format!("failed to open {}", source.display()))?;
    let result = provider.submit(filespec, Box::new(file)).await?;

    let verb = if result.overwritten { "Replaced" } else { "Stored" };
    println!(
        "{verb} {}:{} ({} bytes)",
        stored.name, result.filespec, result.bytes_written
    );

    Ok(())
}
