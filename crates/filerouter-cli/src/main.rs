mod commands;
mod config;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use filerouter::{ProviderRegistry, UnconfiguredProviderType};
use filerouter_local::LocalDirectoryProviderType;
use filerouter_remote::{PagingParams, RepositoryProviderResource};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "filerouter")]
#[command(about = "Browse repository providers and move files through configured repositories")]
struct Cli {
    /// Catalog base URL, overriding the config file and environment
    #[arg(long, global = true)]
    catalog_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Query the remote provider catalog
    Catalog {
        #[command(subcommand)]
        command: CatalogCommand,
    },
    /// List provider types built into this binary
    Types {
        /// Show one type in detail
        id: Option<String>,
    },
    /// Work with configured repositories
    Repo {
        #[command(subcommand)]
        command: RepoCommand,
    },
}

#[derive(Subcommand)]
enum CatalogCommand {
    /// List providers, optionally filtered
    List {
        /// Filter on a record attribute
        #[arg(long = "where", value_name = "KEY=VALUE", value_parser = parse_assignment)]
        filters: Vec<(String, String)>,
        #[arg(long, default_value_t = PagingParams::DEFAULT_PER_PAGE)]
        per_page: u32,
        /// Stop after this many providers
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show one provider record
    Show { id: String },
    /// Ask the catalog to validate a configuration
    Validate {
        id: String,
        /// Configuration value, typed by the provider's parameters
        #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_assignment)]
        values: Vec<(String, String)>,
    },
    /// Print the provider's configuration form
    Form { id: String },
}

#[derive(Subcommand)]
enum RepoCommand {
    /// List configured repositories
    List,
    /// List the files in a repository
    Ls { name: String },
    /// Fetch a file from a repository
    Get {
        name: String,
        filespec: String,
        /// Write to this path instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Submit a local file to a repository
    Put {
        name: String,
        filespec: String,
        source: PathBuf,
    },
}

fn parse_assignment(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_owned(), value.to_owned())),
        _ => Err(format!("expected KEY=VALUE, got `{s}`")),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn build_registry() -> Result<ProviderRegistry> {
    Ok(ProviderRegistry::builder()
        .register(UnconfiguredProviderType)?
        .register(LocalDirectoryProviderType::new())?
        .build())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let mut app_config = config::load_config()?;
    if let Some(url) = cli.catalog_url {
        app_config.catalog_url = Some(url);
    }

    match cli.command {
        Command::Catalog { command } => {
            let resource = RepositoryProviderResource::new(app_config.resource_config()?);
            match command {
                CatalogCommand::List {
                    filters,
                    per_page,
                    limit,
                } => commands::catalog::list(&resource, &filters, per_page, limit).await,
                CatalogCommand::Show { id } => commands::catalog::show(&resource, &id).await,
                CatalogCommand::Validate { id, values } => {
                    commands::catalog::validate(&resource, &id, &values).await
                }
                CatalogCommand::Form { id } => commands::catalog::form(&resource, &id).await,
            }
        }
        Command::Types { id } => commands::types::run(&build_registry()?, id.as_deref()),
        Command::Repo { command } => {
            let registry = build_registry()?;
            match command {
                RepoCommand::List => {
                    commands::repo::list(&app_config.repositories, &registry);
                    Ok(())
                }
                RepoCommand::Ls { name } => {
                    commands::repo::ls(&registry, app_config.repository(&name)?).await
                }
                RepoCommand::Get {
                    name,
                    filespec,
                    output,
                } => {
                    let stored = app_config.repository(&name)?;
                    commands::repo::get(&registry, stored, &filespec, output.as_deref()).await
                }
                RepoCommand::Put {
                    name,
                    filespec,
                    source,
                } => {
                    let stored = app_config.repository(&name)?;
                    commands::repo::put(&registry, stored, &filespec, &source).await
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn assignments_split_on_first_equals() {
        assert_eq!(
            parse_assignment("query=a=b").unwrap(),
            ("query".to_owned(), "a=b".to_owned())
        );
        assert_eq!(
            parse_assignment("bucket=").unwrap(),
            ("bucket".to_owned(), String::new())
        );
        assert!(parse_assignment("=x").is_err());
        assert!(parse_assignment("novalue").is_err());
    }

    #[test]
    fn builtin_types_are_registered() {
        let registry = build_registry().unwrap();
        assert_eq!(registry.len(), 2);
        assert!(registry.provider_type(filerouter::BASE_PROVIDER_TYPE_ID).is_ok());
        assert!(
            registry
                .provider_type(filerouter_local::LOCAL_PROVIDER_TYPE_ID)
                .is_ok()
        );
    }

    #[test]
    fn catalog_validate_collects_assignments() {
        let cli = Cli::parse_from([
            "filerouter",
            "catalog",
            "validate",
            "s3",
            "--set",
            "bucket=logs",
            "--set",
            "public=true",
        ]);

        match cli.command {
            Command::Catalog {
                command: CatalogCommand::Validate { id, values },
            } => {
                assert_eq!(id, "s3");
                assert_eq!(values.len(), 2);
                assert_eq!(values[1], ("public".to_owned(), "true".to_owned()));
            }
            _ => panic!("expected catalog validate"),
        }
    }
}
