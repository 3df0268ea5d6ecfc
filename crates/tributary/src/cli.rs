//! Command-line interface.

use clap::{Parser, Subcommand};
use snafu::prelude::*;
use std::sync::Arc;
use tracing::info;

use crate::catalog::AtlanClient;
use crate::classify;
use crate::config::Config;
use crate::error::{CatalogSnafu, IntegrationError, NoConfigPathsSnafu};
use crate::pipeline::{RunContext, RunOptions, run_integrations};
use tributary_core::cache::{CacheStatus, QueryCache};
use tributary_core::config::ConfigArgs;
use tributary_core::matcher::{MatchStrategy, TableMatcher, TableSide};
use tributary_core::metrics::{MetricsController, init_global};
use tributary_core::storage::StorageProvider;

/// Register object storage in the catalog and link it to the tables around it.
#[derive(Parser, Debug)]
#[command(name = "tributary", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub config: ConfigArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run integrations against the catalog.
    Run {
        /// Only run this integration.
        #[arg(short, long)]
        integration: Option<String>,

        /// Query the catalog even when the cache is fresh.
        #[arg(long)]
        force_refresh: bool,
    },

    /// List the storage objects each integration would register.
    List {
        #[arg(short, long)]
        integration: Option<String>,
    },

    /// Inspect or clear the asset caches.
    Cache {
        #[command(subcommand)]
        action: CacheCommand,
    },

    /// Print which keys a table name matches. Needs no configuration.
    Match {
        /// Which side of the bucket the table lives on.
        #[arg(long, value_enum, default_value_t = TableSide::Relational)]
        side: TableSide,

        #[arg(long, value_enum, default_value_t = MatchStrategy::Substring)]
        strategy: MatchStrategy,

        #[arg(long)]
        table: String,

        /// Object keys to test.
        keys: Vec<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// Show age and validity of each peer cache.
    Status {
        #[arg(short, long)]
        integration: Option<String>,
    },
    /// Delete peer cache files.
    Clear {
        #[arg(short, long)]
        integration: Option<String>,
    },
}

impl Cli {
    /// Execute the parsed command.
    pub async fn execute(self) -> Result<(), IntegrationError> {
        match self.command {
            Command::Match {
                side,
                strategy,
                table,
                keys,
            } => {
                print_matches(&table, side, strategy, &keys);
                Ok(())
            }
            Command::Run {
                integration,
                force_refresh,
            } => {
                let config = load_config(&self.config)?;
                run(&config, integration.as_deref(), RunOptions { force_refresh }).await
            }
            Command::List { integration } => {
                let config = load_config(&self.config)?;
                list(&config, integration.as_deref()).await
            }
            Command::Cache { action } => {
                let config = load_config(&self.config)?;
                match action {
                    CacheCommand::Status { integration } => {
                        cache_status(&config, integration.as_deref())
                    }
                    CacheCommand::Clear { integration } => {
                        cache_clear(&config, integration.as_deref())
                    }
                }
            }
        }
    }
}

fn load_config(args: &ConfigArgs) -> Result<Config, IntegrationError> {
    let paths = args.config_paths();
    ensure!(!paths.is_empty(), NoConfigPathsSnafu);

    info!("Loading config from {} source(s)", paths.len());
    Ok(Config::from_paths(&paths)?)
}

async fn run(
    config: &Config,
    integration: Option<&str>,
    options: RunOptions,
) -> Result<(), IntegrationError> {
    let selected = config.select(integration)?;

    if config.metrics.textfile.is_some() {
        init_global()?;
    }

    let token = config.catalog.api_token()?;
    let client = AtlanClient::new(&config.catalog, &token).context(CatalogSnafu)?;
    let ctx = RunContext::new(Arc::new(client), config);

    info!(
        "Starting {} integration(s) against {}",
        selected.len(),
        config.catalog.base_url
    );

    let result = run_integrations(&ctx, &selected, &options).await;

    if let Some(path) = &config.metrics.textfile {
        MetricsController::get()?.write_textfile(path)?;
    }

    for report in result? {
        println!("{report}");
    }
    Ok(())
}

async fn list(config: &Config, integration: Option<&str>) -> Result<(), IntegrationError> {
    for (key, integration) in config.select(integration)? {
        let bucket = &integration.bucket;
        let storage = StorageProvider::for_url_with_options(&bucket.url, bucket.storage_options())?;
        let objects = storage.list_objects(None).await?;

        println!("{key}: {} ({} object(s))", storage.canonical_url(), objects.len());
        for object in objects.iter().filter(|o| !o.key.ends_with('/')) {
            let classification = if integration.classify {
                classify::describe(&classify::classify(&object.key))
            } else {
                String::new()
            };
            println!(
                "  {}{}\t{}\t{}\t{classification}",
                bucket.prefix,
                object.key,
                object.size,
                object.last_modified.to_rfc3339(),
            );
        }
    }
    Ok(())
}

fn cache_status(config: &Config, integration: Option<&str>) -> Result<(), IntegrationError> {
    let cache = QueryCache::from_config(&config.cache);

    for (key, integration) in config.select(integration)? {
        let ttl = config.cache_ttl(integration);
        for peer in integration.peers() {
            let name = peer.cache_name();
            let status = match cache.status(&name, ttl) {
                CacheStatus::Absent => "absent".to_string(),
                CacheStatus::Invalid { reason } => format!("invalid ({reason})"),
                CacheStatus::Valid { age, items } => {
                    format!("valid, {items} item(s), {}m old", age.num_minutes())
                }
                CacheStatus::Stale { age, items } => {
                    format!("stale, {items} item(s), {}m old", age.num_minutes())
                }
            };
            println!("{key}/{}: {name} {status}", peer.connection);
        }
    }
    Ok(())
}

fn cache_clear(config: &Config, integration: Option<&str>) -> Result<(), IntegrationError> {
    let cache = QueryCache::from_config(&config.cache);

    for (_, integration) in config.select(integration)? {
        for peer in integration.peers() {
            let name = peer.cache_name();
            if cache.clear(&name)? {
                println!("removed {}", cache.path_for(&name)?.display());
            }
        }
    }
    Ok(())
}

fn print_matches(table: &str, side: TableSide, strategy: MatchStrategy, keys: &[String]) {
    let matcher = TableMatcher::new(table, side, strategy);
    println!("variants: {}", matcher.variants().join(", "));
    for key in matcher.filter(keys) {
        println!("{key}");
    }
}
