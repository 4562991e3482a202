use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use filerouter::StoredProvider;
use filerouter_remote::ResourceConfig;
use serde::{Deserialize, Serialize};

pub const CATALOG_URL_ENV: &str = "FILEROUTER_CATALOG_URL";
pub const TOKEN_ENV: &str = "FILEROUTER_TOKEN";

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// Base URL of the remote provider catalog.
    #[serde(default)]
    pub catalog_url: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    /// Configured repository instances.
    #[serde(default)]
    pub repositories: Vec<StoredProvider>,
}

impl AppConfig {
    /// Override file settings with values from the environment.
    pub fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(CATALOG_URL_ENV).filter(|v| !v.is_empty()) {
            self.catalog_url = Some(url);
        }
        if let Some(token) = lookup(TOKEN_ENV).filter(|v| !v.is_empty()) {
            self.token = Some(token);
        }
        self
    }

    pub fn resource_config(&self) -> Result<ResourceConfig> {
        let Some(base_url) = self.catalog_url.clone() else {
            bail!("no catalog URL configured; set `catalog_url` or {CATALOG_URL_ENV}");
        };

        Ok(ResourceConfig {
            base_url,
            token: self.token.clone(),
        })
    }

    pub fn repository(&self, name: &str) -> Result<&StoredProvider> {
        self.repositories
            .iter()
            .find(|r| r.name == name)
            .with_context(|| format!("no repository named `{name}` is configured"))
    }
}

/// Config file path: `~/.config/filerouter/filerouter.toml`
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("filerouter").join("filerouter.toml"))
}

/// Parse the config file at `path`. A missing file yields the defaults.
pub fn load_from(path: &Path) -> Result<AppConfig> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(AppConfig::default()),
        Err(e) => {
            return Err(e).with_context(|| format!("failed to read config at {}", path.display()));
        }
    };

    toml::from_str(&contents)
        .with_context(|| format!("failed to parse config at {}", path.display()))
}

/// Load the user's config file, then apply environment overrides.
pub fn load_config() -> Result<AppConfig> {
    let config = match config_path() {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading config");
            load_from(&path)?
        }
        None => AppConfig::default(),
    };

    Ok(config.with_env(|key| std::env::var(key).ok()))
}
